//! Launch requests: what to execute and how to wire its streams.

use crate::mode::ProcMode;
use crate::validation::{validate_c_string, validate_env_entry, validate_executable};
use hsu_common::{ProcessError, ProcessResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Description of a process to launch.
///
/// ```
/// use hsu_process::{LaunchRequest, ProcMode};
///
/// let request = LaunchRequest::new("/bin/echo")
///     .arg("hello")
///     .mode(ProcMode::PIPE_STDOUT);
/// assert_eq!(request.argv(), vec!["/bin/echo", "hello"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Path handed to `exec`; no `PATH` search is performed.
    pub executable_path: String,

    /// Arguments, not including argv[0] unless `NO_PATH` is set.
    #[serde(default)]
    pub arguments: Vec<String>,

    /// `KEY=VALUE` entries replacing the parent environment entirely.
    /// `None` inherits the parent environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Vec<String>>,

    #[serde(default)]
    pub mode: ProcMode,
}

impl LaunchRequest {
    pub fn new(executable_path: impl Into<String>) -> Self {
        Self {
            executable_path: executable_path.into(),
            arguments: Vec::new(),
            environment: None,
            mode: ProcMode::empty(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add one `KEY=VALUE` entry, switching the request to an explicit environment.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.environment
            .get_or_insert_with(Vec::new)
            .push(format!("{}={}", key.as_ref(), value.as_ref()));
        self
    }

    /// Replace the environment with the given `KEY=VALUE` entries.
    pub fn envs<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environment = Some(entries.into_iter().map(Into::into).collect());
        self
    }

    pub fn mode(mut self, mode: ProcMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check the request without touching any OS resource.
    pub fn validate(&self) -> ProcessResult<()> {
        let id = self.executable_path.as_str();
        validate_executable(id)?;
        self.mode.validate(id)?;

        for arg in &self.arguments {
            validate_c_string(id, "argument", arg)?;
        }
        if let Some(environment) = &self.environment {
            for entry in environment {
                validate_env_entry(id, entry)?;
            }
        }
        Ok(())
    }

    /// The argument vector the child receives.
    pub fn argv(&self) -> Vec<&str> {
        let mut argv = Vec::with_capacity(self.arguments.len() + 1);
        if !self.mode.contains(ProcMode::NO_PATH) {
            argv.push(self.executable_path.as_str());
        }
        argv.extend(self.arguments.iter().map(String::as_str));
        argv
    }

    /// Parse and validate a request from YAML.
    pub fn from_yaml_str(content: &str) -> ProcessResult<Self> {
        let request: LaunchRequest = serde_yaml::from_str(content).map_err(|e| {
            ProcessError::configuration("config", format!("Failed to parse launch request: {}", e))
        })?;
        request.validate()?;
        Ok(request)
    }

    /// Load a request from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ProcessResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProcessError::configuration(
                path.display().to_string(),
                format!("Failed to read config file: {}", e),
            )
        })?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_prepends_path() {
        let request = LaunchRequest::new("/bin/echo").args(["a", "b"]);
        assert_eq!(request.argv(), vec!["/bin/echo", "a", "b"]);
    }

    #[test]
    fn test_argv_no_path() {
        let request = LaunchRequest::new("/bin/sh")
            .args(["-sh", "-c", "true"])
            .mode(ProcMode::NO_PATH);
        assert_eq!(request.argv(), vec!["-sh", "-c", "true"]);
    }

    #[test]
    fn test_env_builder_switches_to_explicit_environment() {
        let request = LaunchRequest::new("/usr/bin/env");
        assert!(request.environment.is_none());

        let request = request.env("FOO", "bar").env("EMPTY", "");
        assert_eq!(
            request.environment,
            Some(vec!["FOO=bar".to_string(), "EMPTY=".to_string()])
        );
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        assert!(LaunchRequest::new("").validate().is_err());
        assert!(LaunchRequest::new("/bin/echo").arg("a\0b").validate().is_err());
        assert!(LaunchRequest::new("/bin/echo").envs(["BROKEN"]).validate().is_err());

        let conflicting = LaunchRequest::new("/bin/cat")
            .mode(ProcMode::PIPE_STDIN | ProcMode::OWN_STDIN);
        assert!(matches!(
            conflicting.validate(),
            Err(ProcessError::Configuration { .. })
        ));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
executable_path: /bin/echo
arguments: [hello, world]
environment: [LANG=C]
mode: PIPE_STDOUT | PIPE_STDERR
"#;
        let request = LaunchRequest::from_yaml_str(yaml).unwrap();
        assert_eq!(request.executable_path, "/bin/echo");
        assert_eq!(request.arguments, vec!["hello", "world"]);
        assert_eq!(request.environment, Some(vec!["LANG=C".to_string()]));
        assert_eq!(request.mode, ProcMode::PIPE_STDOUT | ProcMode::PIPE_STDERR);
    }

    #[test]
    fn test_from_yaml_defaults() {
        let request = LaunchRequest::from_yaml_str("executable_path: /bin/true\n").unwrap();
        assert!(request.arguments.is_empty());
        assert!(request.environment.is_none());
        assert_eq!(request.mode, ProcMode::empty());
    }

    #[test]
    fn test_from_yaml_rejects_conflicting_mode() {
        let yaml = "executable_path: /bin/cat\nmode: PIPE_STDIN | OWN_STDIN\n";
        assert!(matches!(
            LaunchRequest::from_yaml_str(yaml),
            Err(ProcessError::Configuration { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launch.yaml");
        std::fs::write(&path, "executable_path: /bin/false\n").unwrap();

        let request = LaunchRequest::load_from_file(&path).unwrap();
        assert_eq!(request.executable_path, "/bin/false");

        assert!(LaunchRequest::load_from_file(dir.path().join("missing.yaml")).is_err());
    }
}
