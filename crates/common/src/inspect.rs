//! OS inspection collaborator trait and its data types.
//!
//! Controls never touch the filesystem or process table directly; everything
//! goes through an [`Inspector`] so evaluation can be tested against a mock
//! and so every external command execution is bounded by a timeout.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Stat result for a single filesystem path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStat {
    /// Whether the path is a regular file (not a directory, socket, ...).
    pub is_file: bool,
    /// Owning user name (uid rendered as a name when resolvable).
    pub owner: String,
    /// Permission bits as an octal string, e.g. "0644".
    pub mode: String,
    /// Whether any execute bit is set.
    pub executable: bool,
    /// Last modification time.
    pub mtime: DateTime<Utc>,
}

/// A single entry from the process table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub user: String,
    pub command: String,
}

/// State of a service as seen by the service manager.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ServiceState {
    /// A unit/definition for the service exists.
    pub installed: bool,
    /// The service is enabled at boot.
    pub enabled: bool,
    /// The service is currently running.
    pub running: bool,
}

/// Captured output of an external command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Read-only host inspection primitives.
///
/// Every method returns `Err` only when the inspection itself could not be
/// carried out (permission denied, tool missing); "the file does not exist"
/// is `Ok(None)`, not an error.
#[async_trait]
pub trait Inspector: Send + Sync {
    /// Stat a path. `Ok(None)` when the path does not exist.
    async fn stat(&self, path: &Path) -> Result<Option<FileStat>>;

    /// Read a file's content as UTF-8 (lossy).
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// Processes whose command name matches `name`.
    async fn processes(&self, name: &str) -> Result<Vec<ProcessInfo>>;

    /// Service manager state for a named service.
    async fn service(&self, name: &str) -> Result<ServiceState>;

    /// Whether a package is installed according to the system package manager.
    async fn package_installed(&self, name: &str) -> Result<bool>;

    /// Run an external command, bounded by `timeout`.
    async fn run_command(&self, cmd: &str, timeout: Duration) -> Result<CommandOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_success() {
        let out = CommandOutput {
            exit_code: Some(0),
            stdout: "ok".into(),
            stderr: String::new(),
        };
        assert!(out.success());

        let killed = CommandOutput {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(!killed.success());
    }
}
