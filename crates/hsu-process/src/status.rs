//! Exit status of a joined child.

use std::fmt;

/// Exit code a forked child uses when it cannot finish its own setup:
/// opening the null device, duplicating a descriptor, or loading the
/// program image.
pub const CHILD_SETUP_FAILED_CODE: i32 = 255;

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by a signal.
    Signaled { signal: i32, core_dumped: bool },
}

impl ExitStatus {
    /// The exit code, if the child exited normally.
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Exited(code) => Some(*code),
            ExitStatus::Signaled { .. } => None,
        }
    }

    /// The terminating signal number, if the child was killed by a signal.
    pub fn signal(&self) -> Option<i32> {
        match self {
            ExitStatus::Exited(_) => None,
            ExitStatus::Signaled { signal, .. } => Some(*signal),
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }

    /// Whether the exit code is the one reserved for child-side setup failures.
    ///
    /// A program may legitimately exit with the same code, so this is a hint
    /// to look at the child's stderr rather than proof of a setup failure.
    pub fn is_setup_failure(&self) -> bool {
        self.code() == Some(CHILD_SETUP_FAILED_CODE)
    }

    /// Encode back into the raw `wait(2)` status word.
    pub fn into_raw(self) -> i32 {
        match self {
            ExitStatus::Exited(code) => (code & 0xff) << 8,
            ExitStatus::Signaled {
                signal,
                core_dumped,
            } => (signal & 0x7f) | if core_dumped { 0x80 } else { 0 },
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit code {}", code),
            ExitStatus::Signaled {
                signal,
                core_dumped: true,
            } => write!(f, "signal {} (core dumped)", signal),
            ExitStatus::Signaled { signal, .. } => write!(f, "signal {}", signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exited() {
        let status = ExitStatus::Exited(1);
        assert_eq!(status.code(), Some(1));
        assert_eq!(status.signal(), None);
        assert!(!status.success());
        assert_eq!(status.into_raw(), 0x100);
        assert!(ExitStatus::Exited(0).success());
    }

    #[test]
    fn test_signaled() {
        let status = ExitStatus::Signaled {
            signal: 15,
            core_dumped: false,
        };
        assert_eq!(status.code(), None);
        assert_eq!(status.signal(), Some(15));
        assert_eq!(status.into_raw(), 15);
        assert_eq!(status.to_string(), "signal 15");
    }

    #[test]
    fn test_setup_failure_code() {
        assert!(ExitStatus::Exited(CHILD_SETUP_FAILED_CODE).is_setup_failure());
        assert!(!ExitStatus::Exited(1).is_setup_failure());
    }
}
