//! Launch mode flags.
//!
//! A [`ProcMode`] decides, per standard stream, whether the launcher creates
//! a pipe, whether the caller hands ownership of its own descriptor to the
//! process handle, and whether the executable path is prepended to the
//! argument list.

use bitflags::bitflags;
use hsu_common::{ProcessError, ProcessResult, StdStream};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Independent flags controlling pipe creation and descriptor ownership.
    ///
    /// In configuration files the flags are written by name, e.g.
    /// `mode: "PIPE_STDOUT | PIPE_STDERR"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ProcMode: u32 {
        /// Create a pipe for stdin; the parent keeps the write end.
        const PIPE_STDIN = 1 << 0;
        /// Create a pipe for stdout; the parent keeps the read end.
        const PIPE_STDOUT = 1 << 1;
        /// Create a pipe for stderr; the parent keeps the read end.
        const PIPE_STDERR = 1 << 2;

        /// Do not prepend the executable path as argv[0].
        const NO_PATH = 1 << 3;

        /// The handle closes the caller-supplied stdin descriptor on join.
        const OWN_STDIN = 1 << 4;
        /// The handle closes the caller-supplied stdout descriptor on join.
        const OWN_STDOUT = 1 << 5;
        /// The handle closes the caller-supplied stderr descriptor on join.
        const OWN_STDERR = 1 << 6;
    }
}

impl Default for ProcMode {
    fn default() -> Self {
        ProcMode::empty()
    }
}

impl ProcMode {
    /// The pipe-creation flag for `stream`.
    pub fn pipe_flag(stream: StdStream) -> ProcMode {
        match stream {
            StdStream::Stdin => ProcMode::PIPE_STDIN,
            StdStream::Stdout => ProcMode::PIPE_STDOUT,
            StdStream::Stderr => ProcMode::PIPE_STDERR,
        }
    }

    /// The ownership-transfer flag for `stream`.
    pub fn own_flag(stream: StdStream) -> ProcMode {
        match stream {
            StdStream::Stdin => ProcMode::OWN_STDIN,
            StdStream::Stdout => ProcMode::OWN_STDOUT,
            StdStream::Stderr => ProcMode::OWN_STDERR,
        }
    }

    pub fn pipes(self, stream: StdStream) -> bool {
        self.contains(Self::pipe_flag(stream))
    }

    pub fn owns(self, stream: StdStream) -> bool {
        self.contains(Self::own_flag(stream))
    }

    /// Streams for which both a pipe and an ownership transfer were requested.
    pub fn conflicts(self) -> Vec<StdStream> {
        StdStream::ALL
            .into_iter()
            .filter(|&stream| self.pipes(stream) && self.owns(stream))
            .collect()
    }

    /// Reject modes where a stream asks for a pipe and an ownership transfer at once.
    pub fn validate(self, id: &str) -> ProcessResult<()> {
        match self.conflicts().first() {
            None => Ok(()),
            Some(stream) => Err(ProcessError::configuration(
                id,
                format!(
                    "{}: pipe creation and descriptor ownership transfer are mutually exclusive",
                    stream
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_stream_flags() {
        let mode = ProcMode::PIPE_STDOUT | ProcMode::OWN_STDIN;
        assert!(mode.pipes(StdStream::Stdout));
        assert!(!mode.pipes(StdStream::Stdin));
        assert!(mode.owns(StdStream::Stdin));
        assert!(!mode.owns(StdStream::Stderr));
        assert!(mode.validate("test").is_ok());
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        for stream in StdStream::ALL {
            let mode = ProcMode::pipe_flag(stream) | ProcMode::own_flag(stream);
            assert_eq!(mode.conflicts(), vec![stream]);

            let err = mode.validate("/bin/cat").unwrap_err();
            assert!(matches!(err, ProcessError::Configuration { .. }));
            assert!(err.to_string().contains(&stream.to_string()));
        }
    }

    #[test]
    fn test_cross_stream_combination_is_valid() {
        // Piping stdout while transferring stdin is fine; only same-stream pairs conflict.
        let mode = ProcMode::PIPE_STDOUT | ProcMode::PIPE_STDERR | ProcMode::OWN_STDIN | ProcMode::NO_PATH;
        assert!(mode.conflicts().is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(ProcMode::default(), ProcMode::empty());
    }
}
