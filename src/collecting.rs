//! Signature collection
//!
//! Walks a classified listing in order and builds the [`TargetTable`]: every kfunc that
//! takes an argument whose declared type is exactly the target type, and no argument of
//! the excluded type.
//!
//! Per-block state is a small state machine reset by every kfunc header:
//!
//!     Open         arguments are collected and checked
//!     Excluded     an excluded-type argument was seen, later arguments are skipped
//!     NotSignature a non-argument line showed up, nothing more until the next header
//!
//! Entries are inserted the moment a target-type argument is seen and removed again if
//! an excluded-type argument follows in the same block.

use crate::listing::line_classification::{classify_line, Argument, ArgumentClass, LineKind};
use serde::Serialize;
use std::collections::HashMap;

/// Type criteria a function must satisfy to land in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCriteria {
    pub target_type: String,
    pub excluded_type: Option<String>,
}

impl TypeCriteria {
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            excluded_type: None,
        }
    }

    pub fn excluding(mut self, excluded_type: impl Into<String>) -> Self {
        self.excluded_type = Some(excluded_type.into());
        self
    }

    fn is_target(&self, arg: &Argument) -> bool {
        arg.type_text == self.target_type
    }

    fn is_excluded(&self, arg: &Argument) -> bool {
        self.excluded_type.as_deref() == Some(arg.type_text.as_str())
    }
}

/// Name and class of one collected argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSummary {
    pub name: String,
    pub class: ArgumentClass,
}

/// A function that passed the type criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEntry {
    pub function: String,
    /// Arguments of the function up to and including the matched one.
    pub arguments: Vec<ArgumentSummary>,
    /// Name of the argument whose type equals the target type.
    pub matched_argument: String,
}

#[derive(Debug, Clone)]
struct Slot {
    order: u64,
    entry: TargetEntry,
}

/// Function name -> entry, iterated in insertion order.
///
/// Overwriting a key keeps its position; a key removed and inserted again moves to the end.
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    slots: HashMap<String, Slot>,
    next_order: u64,
}

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: TargetEntry) {
        match self.slots.get_mut(&entry.function) {
            Some(slot) => slot.entry = entry,
            None => {
                let order = self.next_order;
                self.next_order += 1;
                self.slots.insert(entry.function.clone(), Slot { order, entry });
            }
        }
    }

    pub fn remove(&mut self, function: &str) -> Option<TargetEntry> {
        self.slots.remove(function).map(|slot| slot.entry)
    }

    pub fn get(&self, function: &str) -> Option<&TargetEntry> {
        self.slots.get(function).map(|slot| &slot.entry)
    }

    pub fn contains(&self, function: &str) -> bool {
        self.slots.contains_key(function)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<&TargetEntry> {
        let mut slots: Vec<&Slot> = self.slots.values().collect();
        slots.sort_by_key(|slot| slot.order);
        slots.into_iter().map(|slot| &slot.entry).collect()
    }

    /// Function names in insertion order.
    pub fn functions(&self) -> Vec<&str> {
        self.entries()
            .into_iter()
            .map(|entry| entry.function.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    Open,
    Excluded,
    NotSignature,
}

/// The signature block currently being read.
#[derive(Debug)]
struct Signature {
    function: String,
    arguments: Vec<ArgumentSummary>,
}

/// Incremental collector; feed it lines with [`observe`](Self::observe).
#[derive(Debug)]
pub struct SignatureCollector<'a> {
    criteria: &'a TypeCriteria,
    current: Option<Signature>,
    state: BlockState,
    table: TargetTable,
    lines_seen: u64,
}

impl<'a> SignatureCollector<'a> {
    pub fn new(criteria: &'a TypeCriteria) -> Self {
        Self {
            criteria,
            current: None,
            // Argument lines before the first header belong to no kfunc.
            state: BlockState::NotSignature,
            table: TargetTable::new(),
            lines_seen: 0,
        }
    }

    /// Process one raw listing line.
    pub fn observe(&mut self, line: &str) {
        self.lines_seen += 1;

        match classify_line(line) {
            LineKind::FunctionHeader(header) => {
                tracing::trace!(
                    module = header.module.as_deref().unwrap_or("-"),
                    function = header.function.as_deref().unwrap_or(header.probe.as_str()),
                    "kfunc block"
                );
                self.state = BlockState::Open;
                self.current = Some(Signature {
                    function: header.probe,
                    arguments: Vec::new(),
                });
            }
            LineKind::ArgumentDeclaration(arg) if self.state == BlockState::Open => {
                self.observe_argument(arg);
            }
            _ => {
                if self.state == BlockState::Open {
                    self.state = BlockState::NotSignature;
                }
            }
        }
    }

    fn observe_argument(&mut self, arg: Argument) {
        let Some(signature) = self.current.as_mut() else {
            return;
        };

        signature.arguments.push(ArgumentSummary {
            name: arg.name.clone(),
            class: arg.class,
        });

        if self.criteria.is_target(&arg) {
            self.table.insert(TargetEntry {
                function: signature.function.clone(),
                arguments: signature.arguments.clone(),
                matched_argument: arg.name.clone(),
            });
        }

        if self.criteria.is_excluded(&arg) {
            if self.table.remove(&signature.function).is_some() {
                tracing::trace!(function = %signature.function, "dropped on excluded type");
            }
            self.state = BlockState::Excluded;
        }
    }

    /// Consume the collector and return the final table.
    pub fn finish(self) -> TargetTable {
        tracing::debug!(
            lines = self.lines_seen,
            functions = self.table.len(),
            "listing collected"
        );
        self.table
    }
}

/// Run a whole line sequence through a fresh collector.
pub fn collect_targets<I, S>(criteria: &TypeCriteria, lines: I) -> TargetTable
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut collector = SignatureCollector::new(criteria);
    for line in lines {
        collector.observe(line.as_ref());
    }
    collector.finish()
}
