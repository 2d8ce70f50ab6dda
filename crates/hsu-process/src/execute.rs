//! Process execution primitives.
//!
//! This module forks the child, wires its descriptors and replaces its image.
//! Everything the child needs (C strings, pointer arrays, the slot plan) is
//! built before `fork()`, so the child only performs async-signal-safe
//! system calls between `fork()` and `exec`.

use crate::request::LaunchRequest;
use crate::status::CHILD_SETUP_FAILED_CODE;
use crate::wiring::{wire_with, SlotSource};
use hsu_common::{ProcessError, ProcessResult, StdStream};
use libc::c_char;
use nix::errno::Errno;
use nix::unistd::{fork, ForkResult, Pid};
use std::ffi::CString;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use tracing::{debug, error, warn};

const NULL_DEVICE: &str = "/dev/null";

/// Parent-side result of a successful launch.
#[derive(Debug)]
pub(crate) struct Spawned {
    pub pid: Pid,
    /// Pipe ends kept by the parent, indexed by slot.
    pub parent_ends: [Option<OwnedFd>; 3],
    /// Caller descriptors now owned by the handle.
    pub transferred: Vec<OwnedFd>,
}

/// Program image and argument arrays, prepared before `fork()`.
struct ChildImage {
    path: CString,
    _argv: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
    _envp: Option<Vec<CString>>,
    envp_ptrs: Option<Vec<*const c_char>>,
    null_device: CString,
}

impl ChildImage {
    fn prepare(request: &LaunchRequest) -> ProcessResult<Self> {
        let id = request.executable_path.as_str();
        let c_string = |value: &str| {
            CString::new(value).map_err(|e| ProcessError::configuration(id, e.to_string()))
        };

        let path = c_string(id)?;
        let argv = request
            .argv()
            .into_iter()
            .map(|arg| c_string(arg))
            .collect::<ProcessResult<Vec<_>>>()?;
        let envp = request
            .environment
            .as_ref()
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| c_string(entry.as_str()))
                    .collect::<ProcessResult<Vec<_>>>()
            })
            .transpose()?;

        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = envp.as_deref().map(null_terminated);

        Ok(Self {
            path,
            _argv: argv,
            argv_ptrs,
            _envp: envp,
            envp_ptrs,
            null_device: c_string(NULL_DEVICE)?,
        })
    }
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Launch `request`, wiring its streams from `mode` and the caller's table.
/// Pipes come from `make_pipe`.
///
/// On any error before or during `fork()` every pipe opened for this attempt
/// is closed and no child exists.
pub(crate) fn launch_with<F>(
    request: &LaunchRequest,
    table: Option<&mut [RawFd]>,
    make_pipe: F,
) -> ProcessResult<Spawned>
where
    F: FnMut() -> nix::Result<(OwnedFd, OwnedFd)>,
{
    request.validate()?;
    let id = request.executable_path.as_str();

    let image = ChildImage::prepare(request)?;
    let wiring = wire_with(id, request.mode, table, make_pipe)?;

    let slots = [
        wiring.slot(StdStream::Stdin),
        wiring.slot(StdStream::Stdout),
        wiring.slot(StdStream::Stderr),
    ];
    let extras = wiring.extras().to_vec();

    // Safety: the child branch only calls async-signal-safe functions on
    // memory prepared above and never returns.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => unsafe { exec_child(&image, &slots, &extras) },
        Ok(ForkResult::Parent { child }) => {
            let (parent_ends, transferred, child_ends) = wiring.into_parent();
            drop(child_ends);

            let transferred = transferred
                .into_iter()
                .filter_map(|fd| adopt(id, fd))
                .collect();

            debug!("Launched {} as pid {}", id, child);
            Ok(Spawned {
                pid: child,
                parent_ends,
                transferred,
            })
        }
        Err(e) => {
            error!("Failed to fork for {}: {}", id, e);
            drop(wiring);
            Err(ProcessError::fork_failed(id, e.desc()))
        }
    }
}

/// Take ownership of a caller descriptor handed over with an `OWN_*` flag.
fn adopt(id: &str, fd: RawFd) -> Option<OwnedFd> {
    if unsafe { libc::fcntl(fd, libc::F_GETFD) } == -1 {
        warn!("Transferred descriptor {} for {} is not open; ignoring", fd, id);
        return None;
    }
    // Safety: the descriptor is open and the caller gave up ownership of it.
    Some(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn dup_onto(source: RawFd, target: RawFd) -> bool {
    loop {
        if unsafe { libc::dup2(source, target) } != -1 {
            return true;
        }
        if Errno::last() != Errno::EINTR {
            return false;
        }
    }
}

fn clear_cloexec(fd: RawFd) -> bool {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    flags != -1 && unsafe { libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } != -1
}

/// Make `source` available as `target` across exec.
///
/// Pipe ends and the null device are close-on-exec, so one that already sits
/// on its target number only needs the flag cleared.
fn place(source: RawFd, target: RawFd) -> bool {
    if source == target {
        clear_cloexec(target)
    } else {
        dup_onto(source, target)
    }
}

/// Child side of the fork: wire descriptors and replace the process image.
///
/// Any failure terminates the child with [`CHILD_SETUP_FAILED_CODE`].
unsafe fn exec_child(image: &ChildImage, slots: &[SlotSource; 3], extras: &[(RawFd, RawFd)]) -> ! {
    let null = libc::open(image.null_device.as_ptr(), libc::O_RDWR | libc::O_CLOEXEC);
    if null == -1 {
        libc::_exit(CHILD_SETUP_FAILED_CODE);
    }

    for (slot, source) in slots.iter().enumerate() {
        let target = slot as RawFd;
        let wired = match *source {
            SlotSource::Inherit => true,
            SlotSource::Fd(fd) if libc::fcntl(fd, libc::F_GETFD) == -1 => place(null, target),
            SlotSource::Fd(fd) => place(fd, target),
        };
        if !wired {
            libc::_exit(CHILD_SETUP_FAILED_CODE);
        }
    }

    // No null-device fallback past the standard slots; negative entries are skipped.
    for &(target, source) in extras {
        let wired = match source {
            s if s < 0 => true,
            s => place(s, target),
        };
        if !wired {
            libc::_exit(CHILD_SETUP_FAILED_CODE);
        }
    }

    match &image.envp_ptrs {
        Some(envp) => {
            libc::execve(image.path.as_ptr(), image.argv_ptrs.as_ptr(), envp.as_ptr());
        }
        None => {
            libc::execv(image.path.as_ptr(), image.argv_ptrs.as_ptr());
        }
    }
    libc::_exit(CHILD_SETUP_FAILED_CODE)
}
