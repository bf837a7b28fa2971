//! Listing sources
//!
//! The collector only needs an ordered stream of lines. This module produces that stream
//! from the listing command (a child process), a file, or stdin. All sources are lazy:
//! lines are pulled one at a time and never buffered as a whole.

use crate::config::ListingConfig;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use thiserror::Error;

/// Errors raised while opening a listing source.
///
/// Problems after the source is open (read errors, the child dying) only end the stream.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("failed to launch listing command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("listing command `{0}` has no stdout pipe")]
    MissingStdout(String),
    #[error("failed to open listing file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Lazy line iterator over any buffered reader.
///
/// Yields lines without their terminator. A read error is logged and ends the stream.
pub struct ListingLines<R> {
    lines: io::Lines<R>,
    origin: String,
    finished: bool,
}

impl<R: BufRead> ListingLines<R> {
    pub fn new(reader: R, origin: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            origin: origin.into(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for ListingLines<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }
        match self.lines.next() {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                tracing::warn!(origin = %self.origin, error = %e, "stopped reading listing");
                self.finished = true;
                None
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

/// The listing command running as a child process, read through its stdout.
pub struct ListingProcess {
    child: Child,
    lines: ListingLines<BufReader<ChildStdout>>,
    command: String,
    reaped: bool,
}

impl ListingProcess {
    /// Launch `command args...` with stdout piped.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, ListingError> {
        tracing::debug!(command, ?args, "launching listing command");
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ListingError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ListingError::MissingStdout(command.to_string()));
            }
        };

        Ok(Self {
            child,
            lines: ListingLines::new(BufReader::new(stdout), command),
            command: command.to_string(),
            reaped: false,
        })
    }

    fn reap(&mut self) {
        if self.reaped {
            return;
        }
        self.reaped = true;
        match self.child.wait() {
            Ok(status) if status.success() => {
                tracing::debug!(command = %self.command, "listing command finished");
            }
            Ok(status) => {
                tracing::warn!(command = %self.command, %status, "listing command exited abnormally");
            }
            Err(e) => {
                tracing::warn!(command = %self.command, error = %e, "failed to wait for listing command");
            }
        }
    }
}

impl Iterator for ListingProcess {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let line = self.lines.next();
        if line.is_none() {
            self.reap();
        }
        line
    }
}

impl Drop for ListingProcess {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Where the listing comes from.
pub enum ListingSource {
    Process(ListingProcess),
    File(ListingLines<BufReader<File>>),
    Stdin(ListingLines<io::StdinLock<'static>>),
}

impl ListingSource {
    /// Open a source: no path runs the configured command, `-` reads stdin, anything
    /// else is a file holding a saved listing.
    pub fn open(config: &ListingConfig, path: Option<&Path>) -> Result<Self, ListingError> {
        match path {
            None => ListingProcess::spawn(&config.command, &config.args).map(ListingSource::Process),
            Some(p) if p == Path::new("-") => Ok(ListingSource::Stdin(ListingLines::new(
                io::stdin().lock(),
                "stdin",
            ))),
            Some(p) => {
                let file = File::open(p).map_err(|source| ListingError::Open {
                    path: p.to_path_buf(),
                    source,
                })?;
                Ok(ListingSource::File(ListingLines::new(
                    BufReader::new(file),
                    p.display().to_string(),
                )))
            }
        }
    }
}

impl Iterator for ListingSource {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            ListingSource::Process(process) => process.next(),
            ListingSource::File(lines) => lines.next(),
            ListingSource::Stdin(lines) => lines.next(),
        }
    }
}
