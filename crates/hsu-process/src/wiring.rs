//! Descriptor wiring.
//!
//! Pure pre-fork computation that decides, for each standard stream, where
//! the child's descriptor comes from, which pipe ends the parent keeps, and
//! which caller descriptors the process handle takes over.

use crate::mode::ProcMode;
use hsu_common::{ProcessError, ProcessResult, StdStream};
use nix::fcntl::OFlag;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tracing::debug;

/// Where a child slot gets its descriptor from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// Leave the slot as the child inherits it from the parent.
    Inherit,
    /// Duplicate this descriptor onto the slot.
    Fd(RawFd),
}

/// Result of wiring a launch: child-side slot sources plus the descriptors
/// the launcher must close or keep after `fork()`.
#[derive(Debug)]
pub struct Wiring {
    slots: [SlotSource; 3],
    extras: Vec<(RawFd, RawFd)>,
    parent_ends: [Option<OwnedFd>; 3],
    child_ends: [Option<OwnedFd>; 3],
    transferred: Vec<RawFd>,
}

impl Wiring {
    /// Source for standard slot 0, 1 or 2.
    pub fn slot(&self, stream: StdStream) -> SlotSource {
        self.slots[stream.slot()]
    }

    /// Extra `(target, source)` pairs for table entries at index 3 and up.
    pub fn extras(&self) -> &[(RawFd, RawFd)] {
        &self.extras
    }

    /// Raw value of the pipe end kept by the parent, if `stream` is piped.
    pub fn parent_fd(&self, stream: StdStream) -> Option<RawFd> {
        self.parent_ends[stream.slot()].as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Caller descriptors whose ownership moves to the handle on launch.
    pub fn transferred(&self) -> &[RawFd] {
        &self.transferred
    }

    /// Split off the parent-side state once the child exists; dropping the
    /// returned child ends closes them in the parent.
    pub(crate) fn into_parent(self) -> ([Option<OwnedFd>; 3], Vec<RawFd>, [Option<OwnedFd>; 3]) {
        (self.parent_ends, self.transferred, self.child_ends)
    }
}

/// Create an `O_CLOEXEC` pipe, returned as `(read, write)`.
pub(crate) fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(OFlag::O_CLOEXEC)
}

/// Compute the wiring for `mode` and an optional caller descriptor table.
///
/// Entries of `table` at slots that became pipes are rewritten with the
/// parent's end. On error every pipe created so far is closed and `table`
/// is left untouched.
pub fn wire(id: &str, mode: ProcMode, table: Option<&mut [RawFd]>) -> ProcessResult<Wiring> {
    wire_with(id, mode, table, cloexec_pipe)
}

pub(crate) fn wire_with<F>(
    id: &str,
    mode: ProcMode,
    table: Option<&mut [RawFd]>,
    mut make_pipe: F,
) -> ProcessResult<Wiring>
where
    F: FnMut() -> nix::Result<(OwnedFd, OwnedFd)>,
{
    mode.validate(id)?;

    let supplied = |slot: usize| -> Option<RawFd> {
        table
            .as_deref()
            .and_then(|t| t.get(slot).copied())
            .filter(|&fd| fd >= 0)
    };

    let mut slots = [SlotSource::Inherit; 3];
    let mut parent_ends: [Option<OwnedFd>; 3] = [None, None, None];
    let mut child_ends: [Option<OwnedFd>; 3] = [None, None, None];
    let mut transferred = Vec::new();

    for stream in StdStream::ALL {
        let slot = stream.slot();

        if mode.pipes(stream) {
            // An early return drops the pipes created so far, closing both ends.
            let (read, write) = make_pipe()
                .map_err(|e| ProcessError::pipe_failed(id, stream, e.desc()))?;
            let (child, parent) = if stream.is_input() {
                (read, write)
            } else {
                (write, read)
            };
            slots[slot] = SlotSource::Fd(child.as_raw_fd());
            child_ends[slot] = Some(child);
            parent_ends[slot] = Some(parent);
        } else if let Some(fd) = supplied(slot) {
            slots[slot] = SlotSource::Fd(fd);
            if mode.owns(stream) && !transferred.contains(&fd) {
                transferred.push(fd);
            }
        }
    }

    let mut extras = Vec::new();
    if let Some(table) = table {
        for (slot, parent) in parent_ends.iter().enumerate() {
            if let (Some(parent), Some(entry)) = (parent, table.get_mut(slot)) {
                *entry = parent.as_raw_fd();
            }
        }
        extras = table
            .iter()
            .enumerate()
            .skip(3)
            .map(|(target, &source)| (target as RawFd, source))
            .collect();
    }

    debug!(
        "Wired {}: slots={:?}, extras={}, transferred={:?}",
        id,
        slots,
        extras.len(),
        transferred
    );

    Ok(Wiring {
        slots,
        extras,
        parent_ends,
        child_ends,
        transferred,
    })
}
