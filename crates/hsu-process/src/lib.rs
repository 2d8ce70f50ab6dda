//! # HSU Process
//!
//! Low-level process launching for the HSU framework.
//!
//! This crate replaces coarse "run a shell command" helpers with explicit
//! control over a child's descriptors:
//! - Launch requests with explicit argument and environment lists
//! - Per-stream pipe creation, caller-supplied descriptors, or inheritance
//! - Ownership transfer of caller descriptors to the process handle
//! - Join (reap + release), signal delivery and pid queries
//!
//! Unix only.

#![cfg(unix)]

pub mod check;
mod execute;
pub mod handle;
pub mod mode;
pub mod request;
pub mod state;
pub mod status;
pub mod terminate;
pub mod validation;
pub mod wiring;

// Re-export main types
pub use check::process_exists;
pub use handle::ProcessHandle;
pub use mode::ProcMode;
pub use request::LaunchRequest;
pub use state::LifecycleState;
pub use status::{ExitStatus, CHILD_SETUP_FAILED_CODE};
pub use terminate::{force_kill, send_raw_signal, send_signal, terminate_gracefully};
pub use wiring::{wire, SlotSource, Wiring};

pub use hsu_common::{ProcessError, ProcessResult, StdStream};
pub use nix::sys::signal::Signal;
pub use nix::unistd::Pid;
