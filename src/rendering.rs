//! Snippet rendering
//!
//! Turns a [`TargetTable`] into bpftrace probe blocks. Each block binds the matched
//! argument to a script variable and guards a `printf` with the user's filter:
//!
//!     kfunc:vmlinux:dev_set_mtu
//!     {
//!         $X = args->dev;
//!         if ($X->name == "eth0") {
//!             printf("kfunc:vmlinux:dev_set_mtu() \n");
//!         }
//!     }
//!
//! The filter is not parsed. Every occurrence of the placeholder is replaced verbatim,
//! including occurrences inside string literals or longer identifiers.

use crate::collecting::{TargetEntry, TargetTable};
use crate::config::SnippetConfig;
use std::io::{self, Write};

/// Replace every occurrence of `placeholder` in `filter` with `variable`.
pub fn substitute_placeholder(filter: &str, placeholder: &str, variable: &str) -> String {
    if placeholder.is_empty() {
        return filter.to_string();
    }
    filter.replace(placeholder, variable)
}

/// Render one probe block. The leading blank line separates consecutive blocks.
pub fn render_snippet(function: &str, variable: &str, argument: &str, condition: &str) -> String {
    format!(
        "\n{function}\n{{\n    {variable} = args->{argument};\n    if ({condition}) {{\n        printf(\"{function}() \\n\");\n    }}\n}}\n"
    )
}

/// Writes one snippet per table entry, skipping return-value entries.
#[derive(Debug, Clone)]
pub struct SnippetRenderer<'a> {
    settings: &'a SnippetConfig,
    condition: String,
}

impl<'a> SnippetRenderer<'a> {
    pub fn new(settings: &'a SnippetConfig, filter: &str) -> Self {
        let condition =
            substitute_placeholder(filter, &settings.placeholder, &settings.variable);
        Self {
            settings,
            condition,
        }
    }

    /// The filter after placeholder substitution.
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Whether an entry produces a snippet. Return values can't be read from `args`.
    pub fn is_renderable(&self, entry: &TargetEntry) -> bool {
        entry.matched_argument != self.settings.return_value_name
    }

    pub fn render_entry(&self, entry: &TargetEntry) -> String {
        render_snippet(
            &entry.function,
            &self.settings.variable,
            &entry.matched_argument,
            &self.condition,
        )
    }

    /// Write all renderable entries in table order. Returns the number written.
    pub fn write_table<W: Write>(&self, table: &TargetTable, out: &mut W) -> io::Result<usize> {
        let mut written = 0;
        for entry in table.entries() {
            if !self.is_renderable(entry) {
                tracing::trace!(function = %entry.function, "skipping return value match");
                continue;
            }
            out.write_all(self.render_entry(entry).as_bytes())?;
            written += 1;
        }
        Ok(written)
    }
}
