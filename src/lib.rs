//! # xsnoop
//!
//! Generates bpftrace probes for every kernel function (kfunc) that takes an argument of a
//! given type.
//!
//! The input is the signature listing printed by `bpftrace -lv`; the output is one probe
//! block per matching kfunc that captures the argument and evaluates a user filter on it.
//!
//! Stages:
//! 1. [`listing`]: line sources and line classification
//! 2. [`collecting`]: builds the table of matching kfuncs
//! 3. [`rendering`]: turns the table into bpftrace snippets
//!
//! [`snoop`] runs the stages end to end and [`config`] holds the tunable defaults.

pub mod collecting;
pub mod config;
pub mod listing;
pub mod rendering;
pub mod snoop;

pub use collecting::{collect_targets, SignatureCollector, TargetEntry, TargetTable, TypeCriteria};
pub use snoop::{Emit, SnoopError, SnoopOptions, SnoopSummary, Snooper};
