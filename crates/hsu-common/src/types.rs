//! Core domain types shared by the HSU process crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three standard streams of a process.
///
/// # Example
/// ```
/// use hsu_common::StdStream;
///
/// assert_eq!(StdStream::Stderr.slot(), 2);
/// assert_eq!(StdStream::from_slot(1), Some(StdStream::Stdout));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    /// All standard streams in slot order.
    pub const ALL: [StdStream; 3] = [StdStream::Stdin, StdStream::Stdout, StdStream::Stderr];

    /// The descriptor number this stream occupies in a child (0, 1 or 2).
    pub fn slot(self) -> usize {
        match self {
            StdStream::Stdin => 0,
            StdStream::Stdout => 1,
            StdStream::Stderr => 2,
        }
    }

    /// Maps a descriptor number back to a standard stream.
    pub fn from_slot(slot: usize) -> Option<Self> {
        match slot {
            0 => Some(StdStream::Stdin),
            1 => Some(StdStream::Stdout),
            2 => Some(StdStream::Stderr),
            _ => None,
        }
    }

    /// Whether the child reads from this stream (only stdin).
    pub fn is_input(self) -> bool {
        matches!(self, StdStream::Stdin)
    }
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdStream::Stdin => write!(f, "stdin"),
            StdStream::Stdout => write!(f, "stdout"),
            StdStream::Stderr => write!(f, "stderr"),
        }
    }
}
