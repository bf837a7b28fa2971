//! Snoop pipeline
//!
//! Glues the stages together: listing lines -> [`SignatureCollector`] -> [`TargetTable`]
//! -> [`SnippetRenderer`]. The line source is any iterator of strings, so the same
//! pipeline runs against `bpftrace -lv`, a saved listing, or a test vector.
//!
//! [`SignatureCollector`]: crate::collecting::SignatureCollector

use crate::collecting::{collect_targets, TargetTable, TypeCriteria};
use crate::config::XsnoopConfig;
use crate::listing::ListingError;
use crate::rendering::SnippetRenderer;
use std::io::{self, Write};
use thiserror::Error;

/// Errors surfaced by a snoop run.
#[derive(Debug, Error)]
pub enum SnoopError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("failed to serialize target table: {0}")]
    Json(#[from] serde_json::Error),
}

/// One `<expression>:<format>` item of the output-format option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputField {
    pub expression: String,
    pub format: Option<String>,
}

impl OutputField {
    /// Parse `X->name:%s,X->ifindex:%d`. Never fails: empty items are dropped and an
    /// item without a colon has no format.
    pub fn parse_list(fields: &str) -> Vec<OutputField> {
        fields.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| match item.rsplit_once(':') {
                Some((expression, format)) => OutputField {
                    expression: expression.to_string(),
                    format: Some(format.to_string()),
                },
                None => OutputField {
                    expression: item.to_string(),
                    format: None,
                },
            })
            .collect()
    }
}

/// User-facing options of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnoopOptions {
    pub criteria: TypeCriteria,
    pub filter: String,
    /// Accepted and parsed, but not used when generating snippets.
    pub output_fields: Vec<OutputField>,
}

impl SnoopOptions {
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            criteria: TypeCriteria::new(target_type),
            filter: "true".to_string(),
            output_fields: Vec::new(),
        }
    }

    pub fn excluding(mut self, excluded_type: impl Into<String>) -> Self {
        self.criteria = self.criteria.excluding(excluded_type);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_output(mut self, fields: &str) -> Self {
        self.output_fields = OutputField::parse_list(fields);
        self
    }
}

/// What a run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emit {
    #[default]
    Snippets,
    TableJson,
}

impl Emit {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "snippets" => Some(Emit::Snippets),
            "table-json" => Some(Emit::TableJson),
            _ => None,
        }
    }

    pub fn names() -> &'static [&'static str] {
        &["snippets", "table-json"]
    }
}

/// Counts reported after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnoopSummary {
    pub functions: usize,
    pub snippets: usize,
}

/// Runs the collect and render stages with one set of options.
#[derive(Debug, Clone)]
pub struct Snooper {
    options: SnoopOptions,
    config: XsnoopConfig,
}

impl Snooper {
    pub fn new(options: SnoopOptions, config: XsnoopConfig) -> Self {
        if !options.output_fields.is_empty() {
            tracing::debug!(fields = ?options.output_fields, "output fields are not used in snippets");
        }
        Self { options, config }
    }

    pub fn options(&self) -> &SnoopOptions {
        &self.options
    }

    pub fn config(&self) -> &XsnoopConfig {
        &self.config
    }

    /// Consume the whole line sequence and return the final table.
    pub fn collect<I, S>(&self, lines: I) -> TargetTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        collect_targets(&self.options.criteria, lines)
    }

    /// Write one snippet per renderable entry. Returns how many were written.
    pub fn render<W: Write>(&self, table: &TargetTable, out: &mut W) -> io::Result<usize> {
        SnippetRenderer::new(&self.config.snippet, &self.options.filter).write_table(table, out)
    }

    /// Collect `lines`, then write either the snippets or the table as JSON.
    pub fn run<I, S, W>(&self, lines: I, out: &mut W, emit: Emit) -> Result<SnoopSummary, SnoopError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        W: Write,
    {
        let table = self.collect(lines);
        tracing::info!(
            target_type = %self.options.criteria.target_type,
            functions = table.len(),
            "collected matching kfuncs"
        );

        let snippets = match emit {
            Emit::Snippets => self.render(&table, out)?,
            Emit::TableJson => {
                serde_json::to_writer_pretty(&mut *out, &table.entries())?;
                writeln!(out)?;
                0
            }
        };
        out.flush()?;

        Ok(SnoopSummary {
            functions: table.len(),
            snippets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_defaults;

    #[test]
    fn test_output_fields_parse() {
        assert_eq!(
            OutputField::parse_list("X->name:%s, X->ifindex:%d"),
            vec![
                OutputField {
                    expression: "X->name".to_string(),
                    format: Some("%s".to_string()),
                },
                OutputField {
                    expression: "X->ifindex".to_string(),
                    format: Some("%d".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_output_fields_are_lenient() {
        assert!(OutputField::parse_list("").is_empty());
        assert_eq!(
            OutputField::parse_list("X->mtu,,"),
            vec![OutputField {
                expression: "X->mtu".to_string(),
                format: None,
            }]
        );
    }

    #[test]
    fn test_emit_names() {
        for name in Emit::names() {
            assert!(Emit::from_name(name).is_some());
        }
        assert_eq!(Emit::from_name("yaml"), None);
    }

    #[test]
    fn test_run_reports_counts() {
        let options = SnoopOptions::new("struct net_device *").with_output("X->name:%s");
        let snooper = Snooper::new(options, load_defaults().unwrap());
        let lines = [
            "kfunc:vmlinux:dev_open",
            "    struct net_device * dev",
            "kfunc:vmlinux:alloc_netdev_mqs",
            "    struct net_device * retval",
        ];

        let mut out = Vec::new();
        let summary = snooper.run(lines, &mut out, Emit::Snippets).unwrap();
        assert_eq!(
            summary,
            SnoopSummary {
                functions: 2,
                snippets: 1,
            }
        );
    }

    #[test]
    fn test_run_table_json() {
        let snooper = Snooper::new(SnoopOptions::new("struct net_device *"), load_defaults().unwrap());
        let lines = [
            "kfunc:vmlinux:dev_open",
            "    struct net_device * dev",
            "    int flags",
        ];

        let mut out = Vec::new();
        snooper.run(lines, &mut out, Emit::TableJson).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {
                    "function": "kfunc:vmlinux:dev_open",
                    "arguments": [{ "name": "dev", "class": "pointer" }],
                    "matched_argument": "dev"
                }
            ])
        );
    }
}
