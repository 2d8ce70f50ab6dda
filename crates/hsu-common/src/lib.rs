//! # HSU Common
//!
//! Common types and errors shared across the HSU process crates.
//!
//! This crate provides the foundational pieces the launcher builds upon:
//! the error taxonomy for launch/join/signal operations and the
//! standard-stream type used to name descriptor slots.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{ProcessError, ProcessResult};
pub use types::StdStream;
