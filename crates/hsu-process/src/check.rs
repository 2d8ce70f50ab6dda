//! Process existence checking.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Check if a process with the given PID exists.
///
/// Uses `kill(pid, 0)`, which sends no signal but checks if the process
/// exists. An unreaped (zombie) child still counts as existing.
///
/// # Examples
///
/// ```rust,no_run
/// use hsu_process::process_exists;
/// use hsu_process::Pid;
///
/// if process_exists(Pid::from_raw(1234)) {
///     println!("Process 1234 is running");
/// }
/// ```
pub fn process_exists(pid: Pid) -> bool {
    match kill(pid, None) {
        Ok(_) => true,
        Err(Errno::EPERM) => true, // Exists but we may not signal it
        Err(_) => false,
    }
}
