//! Process termination primitives.
//!
//! Signal delivery to a process id. The [`ProcessHandle`](crate::ProcessHandle)
//! only calls these while its child is launched and unreaped, so the pid
//! cannot belong to an unrelated process.

use hsu_common::{ProcessError, ProcessResult};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Deliver `signal` to `pid`.
pub fn send_signal(pid: Pid, signal: Signal) -> ProcessResult<()> {
    kill(pid, signal).map_err(|e| {
        ProcessError::signal_failed(pid.to_string(), format!("{}: {}", signal, e.desc()))
    })
}

/// Deliver a signal given by its raw number, leaving validation to the OS.
///
/// `0` only checks that the process exists and may be signaled. Real-time
/// signals, which have no [`Signal`] variant, are accepted as well.
pub fn send_raw_signal(pid: Pid, signum: i32) -> ProcessResult<()> {
    let result = if signum == 0 {
        kill(pid, None)
    } else {
        Errno::result(unsafe { libc::kill(pid.as_raw(), signum) }).map(drop)
    };
    result.map_err(|e| {
        ProcessError::signal_failed(pid.to_string(), format!("signal {}: {}", signum, e.desc()))
    })
}

/// Terminate a process gracefully (SIGTERM).
pub fn terminate_gracefully(pid: Pid) -> ProcessResult<()> {
    send_signal(pid, Signal::SIGTERM)
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: Pid) -> ProcessResult<()> {
    send_signal(pid, Signal::SIGKILL)
}
