//! Error types for the shell engine.

use std::fmt;
use std::io;
use std::num::{ParseFloatError, ParseIntError};

/// Errors produced by the shell engine and by command handlers.
///
/// Handlers usually return `anyhow::Error`; wrapping one of these variants
/// (or bubbling up a number parse error with `?`) lets the dispatcher tell the
/// user what kind of failure happened.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("couldn't import {0}")]
    Resolution(String),

    #[error("name '{0}' is not defined")]
    UnboundReference(String),

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("{0}")]
    Unhandled(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;

/// How a trapped handler failure is reported back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnboundReference,
    BadArgument,
    Unhandled,
}

impl FailureKind {
    /// Classify a handler failure by looking through its whole cause chain.
    pub fn classify(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(shell_err) = cause.downcast_ref::<ShellError>() {
                match shell_err {
                    ShellError::UnboundReference(_) => return FailureKind::UnboundReference,
                    ShellError::BadArgument(_) => return FailureKind::BadArgument,
                    _ => {}
                }
            }
            if cause.is::<ParseIntError>() || cause.is::<ParseFloatError>() {
                return FailureKind::BadArgument;
            }
        }
        FailureKind::Unhandled
    }
}

/// A trapped dispatch failure, as kept on a shell's trace stack.
#[derive(Debug)]
pub struct Failure {
    pub command: String,
    pub tail: Option<String>,
    pub kind: FailureKind,
    pub error: anyhow::Error,
}

impl Failure {
    pub fn new(command: &str, tail: Option<&str>, error: anyhow::Error) -> Self {
        Self {
            command: command.to_string(),
            tail: tail.map(str::to_string),
            kind: FailureKind::classify(&error),
            error,
        }
    }

    /// The one-line message shown to the user when the failure is trapped.
    pub fn summary(&self) -> String {
        match self.kind {
            FailureKind::UnboundReference => format!("Command '{}' failed", self.command),
            FailureKind::BadArgument => format!(
                "Bad argument '{}' for '{}'",
                self.tail.as_deref().unwrap_or_default(),
                self.command
            ),
            FailureKind::Unhandled => match &self.tail {
                Some(tail) => format!("Untrapped exception in '{} {tail}'", self.command),
                None => format!("Untrapped exception in '{}'", self.command),
            },
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {:#})",
            self.command,
            self.tail.as_deref().unwrap_or("None"),
            self.error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn resolution_error_display() {
        let e = ShellError::Resolution("mathx".into());
        assert_eq!(format!("{e}"), "couldn't import mathx");
    }

    #[test]
    fn unbound_error_display() {
        let e = ShellError::UnboundReference("y".into());
        assert_eq!(format!("{e}"), "name 'y' is not defined");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let e: ShellError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn parse_errors_classify_as_bad_argument() {
        let err = anyhow::Error::new("abc".parse::<i64>().unwrap_err());
        assert_eq!(FailureKind::classify(&err), FailureKind::BadArgument);

        let err = anyhow::Error::new("abc".parse::<f64>().unwrap_err());
        assert_eq!(FailureKind::classify(&err), FailureKind::BadArgument);
    }

    #[test]
    fn classification_sees_through_context() {
        let err = Err::<(), _>(ShellError::UnboundReference("q".into()))
            .context("while evaluating")
            .unwrap_err();
        assert_eq!(FailureKind::classify(&err), FailureKind::UnboundReference);
    }

    #[test]
    fn other_errors_are_unhandled() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(FailureKind::classify(&err), FailureKind::Unhandled);

        let err = anyhow::Error::new(ShellError::Resolution("x".into()));
        assert_eq!(FailureKind::classify(&err), FailureKind::Unhandled);
    }

    #[test]
    fn failure_summaries() {
        let f = Failure::new("double", Some("abc"), anyhow::Error::new("abc".parse::<i64>().unwrap_err()));
        assert_eq!(f.summary(), "Bad argument 'abc' for 'double'");

        let f = Failure::new("calc", None, anyhow::anyhow!("boom"));
        assert_eq!(f.summary(), "Untrapped exception in 'calc'");
        assert_eq!(f.to_string(), "(calc, None, boom)");

        let f = Failure::new("calc", Some("1 0 /"), anyhow::anyhow!("boom"));
        assert_eq!(f.summary(), "Untrapped exception in 'calc 1 0 /'");

        let f = Failure::new("eval", Some("y"), ShellError::UnboundReference("y".into()).into());
        assert_eq!(f.summary(), "Command 'eval' failed");
    }
}
