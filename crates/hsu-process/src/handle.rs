//! Process handle: launch, join, signal and query a single child.
//!
//! A handle moves through [`LifecycleState`]: `Idle -> Launched -> Joined`,
//! or `Idle -> Failed` when setup fails before a child exists. It owns the
//! pipe ends the parent keeps and any descriptors transferred to it, and
//! closes each of them exactly once.
//!
//! Dropping a launched handle closes its descriptors but does not reap the
//! child; call [`ProcessHandle::join`] for that.

use crate::execute;
use crate::request::LaunchRequest;
use crate::state::LifecycleState;
use crate::status::ExitStatus;
use crate::terminate;
use crate::wiring::cloexec_pipe;
use hsu_common::{ProcessError, ProcessResult, StdStream};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::fs::File;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use tracing::{debug, warn};

/// Handle to a child process and the descriptors wired for it.
///
/// ```rust,no_run
/// use hsu_process::{LaunchRequest, ProcMode, ProcessHandle};
/// use std::io::Read;
///
/// let request = LaunchRequest::new("/bin/echo").arg("hello").mode(ProcMode::PIPE_STDOUT);
/// let mut handle = ProcessHandle::spawn(&request, None)?;
///
/// let mut output = String::new();
/// handle.stdout().unwrap().read_to_string(&mut output).unwrap();
/// let status = handle.join();
///
/// assert_eq!(output, "hello\n");
/// assert!(status.unwrap().success());
/// # Ok::<(), hsu_process::ProcessError>(())
/// ```
#[derive(Debug, Default)]
pub struct ProcessHandle {
    state: LifecycleState,
    /// Executable path of the last launch attempt, used in errors and logs.
    id: String,
    pid: Option<Pid>,
    stdin: Option<File>,
    stdout: Option<File>,
    stderr: Option<File>,
    transferred: Vec<OwnedFd>,
    exit_status: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Create an idle handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle and launch `request` in one step.
    pub fn spawn(request: &LaunchRequest, table: Option<&mut [RawFd]>) -> ProcessResult<Self> {
        let mut handle = Self::new();
        handle.launch(request, table)?;
        Ok(handle)
    }

    /// Launch `request`.
    ///
    /// `table` maps positionally onto the child's descriptors 0, 1, 2, ...;
    /// negative entries mean "not supplied". Entries for streams that get a
    /// pipe are rewritten with the parent's end of that pipe.
    ///
    /// Fails with [`ProcessError::AlreadyLaunched`] if the handle is launched
    /// or joined; the running child and its pipes are left untouched.
    pub fn launch(
        &mut self,
        request: &LaunchRequest,
        table: Option<&mut [RawFd]>,
    ) -> ProcessResult<()> {
        self.launch_with(request, table, cloexec_pipe)
    }

    pub(crate) fn launch_with<F>(
        &mut self,
        request: &LaunchRequest,
        table: Option<&mut [RawFd]>,
        make_pipe: F,
    ) -> ProcessResult<()>
    where
        F: FnMut() -> nix::Result<(OwnedFd, OwnedFd)>,
    {
        if !self.state.can_launch() {
            return Err(ProcessError::already_launched(
                self.ident(),
                self.state.to_string(),
            ));
        }
        self.id = request.executable_path.clone();

        match execute::launch_with(request, table, make_pipe) {
            Ok(spawned) => {
                let [stdin, stdout, stderr] = spawned.parent_ends;
                self.stdin = stdin.map(File::from);
                self.stdout = stdout.map(File::from);
                self.stderr = stderr.map(File::from);
                self.transferred = spawned.transferred;
                self.pid = Some(spawned.pid);
                self.exit_status = None;
                self.transition_to(LifecycleState::Launched);
                Ok(())
            }
            Err(e) => {
                if e.is_resource_error() {
                    self.transition_to(LifecycleState::Failed);
                }
                Err(e)
            }
        }
    }

    /// Wait for the child to exit and release every descriptor the handle owns.
    ///
    /// The stdin pipe is closed before waiting, which is how the child sees
    /// end of input. Never fails: on a handle that is not launched this only
    /// closes whatever is still open, and a failed wait still moves the
    /// handle to `Joined` without a status. Calling it again returns the
    /// status captured the first time.
    pub fn join(&mut self) -> Option<ExitStatus> {
        self.stdin = None;

        if let Some(pid) = self.live_pid() {
            match wait_blocking(pid) {
                Ok(status) => self.finish(pid, Some(status)),
                Err(e) => {
                    warn!("Failed to wait for {} (pid {}): {}", self.id, pid, e);
                    self.finish(pid, None);
                }
            }
        }

        self.release();
        self.exit_status
    }

    /// Non-blocking variant of [`join`](Self::join).
    ///
    /// Returns `None` while the child is still running, leaving all pipes
    /// open. Once the child has exited it performs the same teardown as
    /// `join` and returns the status.
    ///
    /// If the wait itself fails (the child was reaped elsewhere) the handle
    /// is torn down and moves to `Joined` without a status, and this also
    /// returns `None`. Pollers tell the two apart with [`state`](Self::state).
    pub fn try_join(&mut self) -> Option<ExitStatus> {
        let Some(pid) = self.live_pid() else {
            return self.join();
        };

        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => match decode(status) {
                Some(exit) => {
                    self.finish(pid, Some(exit));
                    self.release();
                    Some(exit)
                }
                None => None,
            },
            Err(Errno::EINTR) => None,
            Err(e) => {
                warn!("Failed to poll {} (pid {}): {}", self.id, pid, e);
                self.finish(pid, None);
                self.release();
                None
            }
        }
    }

    /// Send `signal` to the child.
    ///
    /// Fails with [`ProcessError::NoSuchChild`] unless the handle is launched
    /// and not yet joined.
    pub fn kill(&self, signal: Signal) -> ProcessResult<()> {
        match self.live_pid() {
            Some(pid) => terminate::send_signal(pid, signal),
            None => Err(self.no_such_child()),
        }
    }

    /// Send a signal given by its raw number.
    ///
    /// The number is passed to the OS unchanged: `0` checks that the child
    /// can be signaled, and real-time signals are delivered as well.
    pub fn signal(&self, signum: i32) -> ProcessResult<()> {
        let pid = self.live_pid().ok_or_else(|| self.no_such_child())?;
        terminate::send_raw_signal(pid, signum)
    }

    /// Ask the child to terminate (SIGTERM).
    pub fn terminate(&self) -> ProcessResult<()> {
        let pid = self.live_pid().ok_or_else(|| self.no_such_child())?;
        terminate::terminate_gracefully(pid)
    }

    /// Kill the child (SIGKILL).
    pub fn force_kill(&self) -> ProcessResult<()> {
        let pid = self.live_pid().ok_or_else(|| self.no_such_child())?;
        terminate::force_kill(pid)
    }

    /// The child's process id; `None` unless launched and not yet joined.
    pub fn pid(&self) -> Option<Pid> {
        self.live_pid()
    }

    /// The child's raw process id, or `-1` unless launched and not yet joined.
    pub fn raw_pid(&self) -> i32 {
        self.live_pid().map_or(-1, Pid::as_raw)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Status captured by the last join; `None` before that.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Write end of the stdin pipe.
    pub fn stdin(&mut self) -> Option<&mut File> {
        self.stdin.as_mut()
    }

    /// Read end of the stdout pipe.
    pub fn stdout(&mut self) -> Option<&mut File> {
        self.stdout.as_mut()
    }

    /// Read end of the stderr pipe.
    pub fn stderr(&mut self) -> Option<&mut File> {
        self.stderr.as_mut()
    }

    /// Take the stdin pipe; join no longer closes it.
    pub fn take_stdin(&mut self) -> Option<File> {
        self.stdin.take()
    }

    /// Take the stdout pipe; join no longer closes it.
    pub fn take_stdout(&mut self) -> Option<File> {
        self.stdout.take()
    }

    /// Take the stderr pipe; join no longer closes it.
    pub fn take_stderr(&mut self) -> Option<File> {
        self.stderr.take()
    }

    /// Raw descriptor of the parent's end of the pipe for `stream`, or `-1`.
    pub fn pipe_fd(&self, stream: StdStream) -> RawFd {
        let end = match stream {
            StdStream::Stdin => &self.stdin,
            StdStream::Stdout => &self.stdout,
            StdStream::Stderr => &self.stderr,
        };
        end.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    /// Number of transferred caller descriptors still held by the handle.
    pub fn transferred_count(&self) -> usize {
        self.transferred.len()
    }

    fn live_pid(&self) -> Option<Pid> {
        self.pid.filter(|_| self.state.is_live())
    }

    fn ident(&self) -> String {
        match self.live_pid() {
            Some(pid) => pid.to_string(),
            None if self.id.is_empty() => "process".to_string(),
            None => self.id.clone(),
        }
    }

    fn no_such_child(&self) -> ProcessError {
        ProcessError::no_such_child(self.ident(), self.state.to_string())
    }

    fn finish(&mut self, pid: Pid, status: Option<ExitStatus>) {
        match status {
            Some(status) => debug!("Process {} (pid {}) exited with {}", self.id, pid, status),
            None => debug!("Process {} (pid {}) reaped without a status", self.id, pid),
        }
        self.exit_status = status;
        self.pid = None;
        self.transition_to(LifecycleState::Joined);
    }

    fn release(&mut self) {
        self.stdin = None;
        self.stdout = None;
        self.stderr = None;
        self.transferred.clear();
    }

    fn transition_to(&mut self, target: LifecycleState) {
        debug_assert!(
            self.state.is_valid_transition(target),
            "invalid transition {} -> {}",
            self.state,
            target
        );
        debug!("Process {} transitioned from {} to {}", self.id, self.state, target);
        self.state = target;
    }
}

fn decode(status: WaitStatus) -> Option<ExitStatus> {
    match status {
        WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
        WaitStatus::Signaled(_, signal, core_dumped) => Some(ExitStatus::Signaled {
            signal: signal as i32,
            core_dumped,
        }),
        _ => None,
    }
}

fn wait_blocking(pid: Pid) -> nix::Result<ExitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(exit) = decode(status) {
                    return Ok(exit);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ProcMode;
    use std::io::Read;

    #[test]
    fn test_idle_handle_queries() {
        let mut handle = ProcessHandle::new();
        assert_eq!(handle.state(), LifecycleState::Idle);
        assert_eq!(handle.pid(), None);
        assert_eq!(handle.raw_pid(), -1);
        assert_eq!(handle.pipe_fd(StdStream::Stdout), -1);
        assert!(handle.stdout().is_none());
    }

    #[test]
    fn test_signal_idle_handle_is_no_such_child() {
        let handle = ProcessHandle::new();
        assert!(matches!(
            handle.kill(Signal::SIGTERM),
            Err(ProcessError::NoSuchChild { .. })
        ));
        assert!(matches!(handle.signal(15), Err(ProcessError::NoSuchChild { .. })));
        assert!(matches!(handle.terminate(), Err(ProcessError::NoSuchChild { .. })));
        assert!(matches!(handle.force_kill(), Err(ProcessError::NoSuchChild { .. })));
    }

    #[test]
    fn test_join_idle_handle_is_noop() {
        let mut handle = ProcessHandle::new();
        assert_eq!(handle.join(), None);
        assert_eq!(handle.try_join(), None);
        assert_eq!(handle.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_configuration_error_keeps_handle_idle() {
        let mut handle = ProcessHandle::new();
        let request = LaunchRequest::new("");
        assert!(matches!(
            handle.launch(&request, None),
            Err(ProcessError::Configuration { .. })
        ));
        assert_eq!(handle.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_pipe_failure_fails_handle_and_allows_relaunch() {
        let mut handle = ProcessHandle::new();
        let mut table = [-1, -1, -1];
        let request = LaunchRequest::new("/bin/echo").arg("again").mode(ProcMode::PIPE_STDOUT);

        let err = handle
            .launch_with(&request, Some(&mut table), || Err(Errno::EMFILE))
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::PipeFailed {
                stream: StdStream::Stdout,
                ..
            }
        ));
        assert_eq!(handle.state(), LifecycleState::Failed);
        assert_eq!(handle.pid(), None);
        assert_eq!(handle.pipe_fd(StdStream::Stdout), -1);
        assert_eq!(table, [-1, -1, -1]);

        // A second failure keeps it failed.
        assert!(handle.launch_with(&request, None, || Err(Errno::ENFILE)).is_err());
        assert_eq!(handle.state(), LifecycleState::Failed);

        handle.launch(&request, Some(&mut table)).unwrap();
        assert_eq!(handle.state(), LifecycleState::Launched);
        assert!(handle.pid().is_some());
        assert_eq!(table[1], handle.pipe_fd(StdStream::Stdout));

        let mut output = String::new();
        handle.stdout().unwrap().read_to_string(&mut output).unwrap();
        assert_eq!(output, "again\n");
        assert!(handle.join().unwrap().success());
        assert_eq!(handle.state(), LifecycleState::Joined);
    }

    #[test]
    fn test_decode_wait_status() {
        let pid = Pid::from_raw(42);
        assert_eq!(decode(WaitStatus::Exited(pid, 3)), Some(ExitStatus::Exited(3)));
        assert_eq!(
            decode(WaitStatus::Signaled(pid, Signal::SIGKILL, false)),
            Some(ExitStatus::Signaled {
                signal: libc::SIGKILL,
                core_dumped: false
            })
        );
        assert_eq!(decode(WaitStatus::StillAlive), None);
    }
}
