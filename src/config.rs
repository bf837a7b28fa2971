//! Configuration loader for xsnoop.
//!
//! `defaults/xsnoop.default.toml` is embedded into the binary so the documented defaults
//! and the runtime behavior stay in sync. A user file and CLI overrides are layered on
//! top via [`Loader`] before deserializing into [`XsnoopConfig`].

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/xsnoop.default.toml");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct XsnoopConfig {
    pub listing: ListingConfig,
    pub snippet: SnippetConfig,
}

/// How to obtain the kfunc signature listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListingConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            command: "bpftrace".to_string(),
            args: vec!["-lv".to_string()],
        }
    }
}

/// Knobs for the generated bpftrace snippets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnippetConfig {
    /// Token in the user filter standing for the captured argument.
    pub placeholder: String,
    /// bpftrace variable the argument is bound to inside each snippet.
    pub variable: String,
    /// Argument name under which the listing reports a function's return value.
    pub return_value_name: String,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            placeholder: "X".to_string(),
            variable: "$X".to_string(),
            return_value_name: "retval".to_string(),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (used for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<XsnoopConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<XsnoopConfig, ConfigError> {
    Loader::new().build()
}
