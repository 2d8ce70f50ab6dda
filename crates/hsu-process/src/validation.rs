//! Process validation utilities.
//!
//! Validation functions for launch requests. Everything here runs before
//! any pipe is created or any process is forked.

use hsu_common::{ProcessError, ProcessResult};

/// Validate that an executable path is usable for `exec`.
///
/// The path is not resolved or checked for existence: a missing executable
/// shows up as the child's setup-failure exit status after join.
pub fn validate_executable(path: &str) -> ProcessResult<()> {
    if path.is_empty() {
        return Err(ProcessError::configuration(
            "validation",
            "Executable path cannot be empty",
        ));
    }
    validate_c_string(path, "executable path", path)
}

/// Validate that `value` can be passed to the OS as a C string.
pub fn validate_c_string(id: &str, what: &str, value: &str) -> ProcessResult<()> {
    if value.as_bytes().contains(&0) {
        return Err(ProcessError::configuration(
            id,
            format!("{} contains an interior NUL byte: {:?}", what, value),
        ));
    }
    Ok(())
}

/// Validate a single `KEY=VALUE` environment entry.
pub fn validate_env_entry(id: &str, entry: &str) -> ProcessResult<()> {
    validate_c_string(id, "environment entry", entry)?;

    match entry.split_once('=') {
        Some((key, _)) if !key.is_empty() => Ok(()),
        _ => Err(ProcessError::configuration(
            id,
            format!("environment entry must have the form KEY=VALUE, got {:?}", entry),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_executable() {
        assert!(validate_executable("/bin/echo").is_ok());
        assert!(validate_executable("").is_err());
        assert!(validate_executable("/bin/e\0cho").is_err());
    }

    #[test]
    fn test_validate_env_entry() {
        assert!(validate_env_entry("t", "PATH=/usr/bin").is_ok());
        assert!(validate_env_entry("t", "EMPTY=").is_ok());
        assert!(validate_env_entry("t", "A=b=c").is_ok());
        assert!(validate_env_entry("t", "NOEQUALS").is_err());
        assert!(validate_env_entry("t", "=value").is_err());
        assert!(validate_env_entry("t", "K=v\0").is_err());
    }
}
