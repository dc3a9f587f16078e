//! Error reporting for running events.
//!
//! Command failures never unwind through the game loop. Every parse or
//! dispatch problem becomes an [`ErrorReport`] delivered to an [`ErrorSink`];
//! the interpreter then decides whether to skip one command or abort the event
//! based on the report's [`Severity`].

use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the interpreter reacted to a failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, variantly::Variantly)]
pub enum Severity {
    /// Bad arguments or a missing referent: the command was skipped.
    Recoverable,
    /// No handler under that name: the command was skipped.
    UnknownCommand,
    /// A handler failed outright or the header was unusable: the event was aborted.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Recoverable => write!(f, "recoverable"),
            Severity::UnknownCommand => write!(f, "unknown command"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// One failure, with enough context to find the offending script line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub event_id: String,
    pub command_index: usize,
    pub command: String,
    pub reason: String,
    pub severity: Severity,
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event '{}' command {} ('{}'): {}",
            self.event_id, self.command_index, self.command, self.reason
        )
    }
}

/// Receiver for command failures.
pub trait ErrorSink {
    fn report(&mut self, report: ErrorReport);
}

/// Forwards reports to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&mut self, report: ErrorReport) {
        match report.severity {
            Severity::Fatal => error!("{report} [aborting event]"),
            Severity::UnknownCommand => warn!("{report} [skipped unknown command]"),
            Severity::Recoverable => warn!("{report} [skipped]"),
        }
    }
}

/// Keeps every report; used by tests and by the CLI summary.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub reports: Vec<ErrorReport>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.reports.iter().filter(|r| r.severity == severity).count()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&mut self, report: ErrorReport) {
        self.reports.push(report);
    }
}

/// Errors raised while preparing or redirecting an event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event header is too short: expected {expected} commands, found {found}")]
    ShortHeader { expected: usize, found: usize },
    #[error("event header command {index} ({field}) is malformed: {reason}")]
    BadHeader {
        index: usize,
        field: &'static str,
        reason: String,
    },
    #[error("no script found for fork key '{0}'")]
    UnknownForkKey(String),
    #[error("no entry '{entry}' in asset '{asset}'")]
    MissingScript { asset: String, entry: String },
    #[error("unknown asset '{0}'")]
    UnknownAsset(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(severity: Severity) -> ErrorReport {
        ErrorReport {
            event_id: "Data/Events/Town:100".into(),
            command_index: 4,
            command: "pause soon".into(),
            reason: "required index 1 (duration) has value 'soon'".into(),
            severity,
        }
    }

    #[test]
    fn collecting_sink_counts_by_severity() {
        let mut sink = CollectingSink::new();
        sink.report(report(Severity::Recoverable));
        sink.report(report(Severity::Fatal));
        sink.report(report(Severity::Recoverable));
        assert_eq!(sink.count(Severity::Recoverable), 2);
        assert_eq!(sink.count(Severity::Fatal), 1);
        assert_eq!(sink.count(Severity::UnknownCommand), 0);
    }

    #[test]
    fn report_display_names_event_and_command() {
        let text = report(Severity::Recoverable).to_string();
        assert!(text.contains("Data/Events/Town:100"));
        assert!(text.contains("command 4"));
        assert!(text.contains("'pause soon'"));
    }
}
