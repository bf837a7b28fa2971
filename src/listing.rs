//! Listing input
//!
//! Everything about the `bpftrace -lv` signature listing before collection: where the
//! lines come from ([`source`]) and what each line means ([`line_classification`]).

pub mod line_classification;
pub mod source;

pub use line_classification::{
    classify_line, Argument, ArgumentClass, LineKind, ProbeHeader, KFUNC_PREFIX,
};
pub use source::{ListingError, ListingLines, ListingProcess, ListingSource};
