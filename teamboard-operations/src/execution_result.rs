//! Execution result of an operation

use crate::{LogEntry, Operation};
use serde_json::{json, Value};
use std::fmt::Display;
use std::time::Instant;

/// Result of executing an operation
///
/// - `Logged`: the operation changed state and belongs in the activity log
/// - `Unlogged`: nothing changed (reads, ignored drops)
/// - `Failed`: an error, optionally with a log entry
#[derive(Debug)]
pub enum ExecutionResult<T, E> {
    Logged { value: T, log_entry: LogEntry },
    Unlogged { value: T },
    Failed {
        error: E,
        log_entry: Option<LogEntry>,
    },
}

impl<T, E> ExecutionResult<T, E> {
    /// Build a logged result (or a logged failure) for `op` from a plain `Result`.
    ///
    /// `summarize` turns the success value into the log entry's output.
    pub fn record<O>(
        op: &O,
        input: Value,
        started: Instant,
        result: Result<T, E>,
        summarize: impl FnOnce(&T) -> Value,
    ) -> Self
    where
        O: Operation + ?Sized,
        E: Display,
    {
        match result {
            Ok(value) => {
                let output = summarize(&value);
                Self::Logged {
                    log_entry: LogEntry::since(op.op_string(), input, output, started),
                    value,
                }
            }
            Err(error) => {
                let output = json!({ "error": error.to_string() });
                Self::Failed {
                    log_entry: Some(LogEntry::since(op.op_string(), input, output, started)),
                    error,
                }
            }
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Logged { value, .. } | Self::Unlogged { value } => Ok(value),
            Self::Failed { error, .. } => Err(error),
        }
    }

    /// Split into the outcome and the entry that should be recorded, if any
    pub fn split(self) -> (Result<T, E>, Option<LogEntry>) {
        match self {
            Self::Logged { value, log_entry } => (Ok(value), Some(log_entry)),
            Self::Unlogged { value } => (Ok(value), None),
            Self::Failed { error, log_entry } => (Err(error), log_entry),
        }
    }

    pub fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Logged { .. }
                | Self::Failed {
                    log_entry: Some(_),
                    ..
                }
        )
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExecutionResult<U, E> {
        match self {
            Self::Logged { value, log_entry } => ExecutionResult::Logged {
                value: f(value),
                log_entry,
            },
            Self::Unlogged { value } => ExecutionResult::Unlogged { value: f(value) },
            Self::Failed { error, log_entry } => ExecutionResult::Failed { error, log_entry },
        }
    }
}
