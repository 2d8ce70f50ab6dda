//! Error types for the HSU process launcher.
//!
//! # Rust Learning Note
//!
//! Rust doesn't have exceptions - it uses `Result<T, E>` for error handling.
//! Launch-time failures come back as a [`ProcessError`] whose variant names
//! the step that failed. Failures that happen inside the forked child after
//! `fork()` are not errors here at all: the child exits with a reserved
//! status and the parent sees it through the joined exit status.
//!
//! ## Rust
//! ```rust
//! use hsu_common::{ProcessError, ProcessResult};
//!
//! fn check_path(path: &str) -> ProcessResult<()> {
//!     if path.is_empty() {
//!         return Err(ProcessError::configuration("launch", "executable path is empty"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_path("").is_err());
//! ```

use crate::types::StdStream;
use thiserror::Error;

/// Process-specific error types for launching and controlling a child.
///
/// The `id` carried by every variant identifies the process the error is
/// about: the executable path before launch, the pid afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Invalid launch request, reported before any OS resource is touched.
    #[error("Process configuration error: {id} - {reason}")]
    Configuration { id: String, reason: String },

    /// The handle has already been launched (or launched and joined).
    #[error("Process already launched: {id} (state: {state})")]
    AlreadyLaunched { id: String, state: String },

    /// Creating the pipe for a standard stream failed.
    #[error("Process pipe creation failed: {id} - {stream}: {reason}")]
    PipeFailed {
        id: String,
        stream: StdStream,
        reason: String,
    },

    /// `fork()` itself failed; no child exists.
    #[error("Process fork failed: {id} - {reason}")]
    ForkFailed { id: String, reason: String },

    /// The handle does not refer to a live, unreaped child.
    #[error("No such child process: {id} (state: {state})")]
    NoSuchChild { id: String, state: String },

    /// The OS refused to deliver a signal.
    #[error("Process signal failed: {id} - {reason}")]
    SignalFailed { id: String, reason: String },
}

impl ProcessError {
    pub fn configuration(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn already_launched(id: impl Into<String>, state: impl Into<String>) -> Self {
        Self::AlreadyLaunched {
            id: id.into(),
            state: state.into(),
        }
    }

    pub fn pipe_failed(id: impl Into<String>, stream: StdStream, reason: impl Into<String>) -> Self {
        Self::PipeFailed {
            id: id.into(),
            stream,
            reason: reason.into(),
        }
    }

    pub fn fork_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ForkFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn no_such_child(id: impl Into<String>, state: impl Into<String>) -> Self {
        Self::NoSuchChild {
            id: id.into(),
            state: state.into(),
        }
    }

    pub fn signal_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error happened while acquiring OS resources (pipe or fork).
    pub fn is_resource_error(&self) -> bool {
        matches!(self, Self::PipeFailed { .. } | Self::ForkFailed { .. })
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_construction() {
        let error = ProcessError::configuration("/bin/echo", "stdin: pipe and ownership transfer both requested");
        assert!(matches!(error, ProcessError::Configuration { .. }));
        assert_eq!(
            format!("{}", error),
            "Process configuration error: /bin/echo - stdin: pipe and ownership transfer both requested"
        );

        let error = ProcessError::pipe_failed("/bin/cat", StdStream::Stdout, "Too many open files");
        assert!(format!("{}", error).contains("stdout"));
        assert!(error.is_resource_error());
    }

    #[test]
    fn test_dead_handle_error() {
        let error = ProcessError::no_such_child("1234", "joined");
        match error {
            ProcessError::NoSuchChild { id, state } => {
                assert_eq!(id, "1234");
                assert_eq!(state, "joined");
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_resource_classification() {
        assert!(ProcessError::fork_failed("x", "EAGAIN").is_resource_error());
        assert!(!ProcessError::already_launched("x", "launched").is_resource_error());
        assert!(!ProcessError::signal_failed("x", "EPERM").is_resource_error());
    }
}
