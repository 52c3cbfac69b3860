//! In-memory inspector for control tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tsaudit_common::{
    CommandOutput, Error, FileStat, Inspector, ProcessInfo, Result, ServiceState,
};

#[derive(Clone)]
struct MockFile {
    stat: FileStat,
    content: String,
}

/// Inspector backed by in-memory maps. Anything not registered behaves as
/// absent; registered failures surface as inspection errors.
#[derive(Default)]
pub struct MockInspector {
    files: HashMap<PathBuf, MockFile>,
    unreadable: HashSet<PathBuf>,
    processes: HashMap<String, Vec<ProcessInfo>>,
    services: HashMap<String, ServiceState>,
    packages: HashSet<String>,
    commands: HashMap<String, CommandOutput>,
    timeouts: HashSet<String>,
}

impl MockInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(
        mut self,
        path: impl Into<PathBuf>,
        owner: &str,
        mode: &str,
        executable: bool,
        mtime: DateTime<Utc>,
        content: &str,
    ) -> Self {
        self.files.insert(
            path.into(),
            MockFile {
                stat: FileStat {
                    is_file: true,
                    owner: owner.to_string(),
                    mode: mode.to_string(),
                    executable,
                    mtime,
                },
                content: content.to_string(),
            },
        );
        self
    }

    /// Register a path whose stat/read fails with a permission error.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        self.unreadable.insert(path.into());
        self
    }

    pub fn with_process(mut self, name: &str, user: &str, pid: u32) -> Self {
        self.processes.entry(name.to_string()).or_default().push(ProcessInfo {
            pid,
            user: user.to_string(),
            command: name.to_string(),
        });
        self
    }

    pub fn with_service(mut self, name: &str, installed: bool, enabled: bool, running: bool) -> Self {
        self.services.insert(
            name.to_string(),
            ServiceState {
                installed,
                enabled,
                running,
            },
        );
        self
    }

    pub fn with_package(mut self, name: &str) -> Self {
        self.packages.insert(name.to_string());
        self
    }

    pub fn with_command(mut self, cmd: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.commands.insert(
            cmd.to_string(),
            CommandOutput {
                exit_code: Some(exit_code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    /// Register a command that times out instead of completing.
    pub fn with_hung_command(mut self, cmd: &str) -> Self {
        self.timeouts.insert(cmd.to_string());
        self
    }
}

#[async_trait]
impl Inspector for MockInspector {
    async fn stat(&self, path: &Path) -> Result<Option<FileStat>> {
        if self.unreadable.contains(path) {
            return Err(Error::Inspection(format!(
                "permission denied: {}",
                path.display()
            )));
        }
        Ok(self.files.get(path).map(|f| f.stat.clone()))
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        if self.unreadable.contains(path) {
            return Err(Error::Inspection(format!(
                "permission denied: {}",
                path.display()
            )));
        }
        self.files
            .get(path)
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::Inspection(format!("no such file: {}", path.display())))
    }

    async fn processes(&self, name: &str) -> Result<Vec<ProcessInfo>> {
        Ok(self.processes.get(name).cloned().unwrap_or_default())
    }

    async fn service(&self, name: &str) -> Result<ServiceState> {
        Ok(self.services.get(name).copied().unwrap_or_default())
    }

    async fn package_installed(&self, name: &str) -> Result<bool> {
        Ok(self.packages.contains(name))
    }

    async fn run_command(&self, cmd: &str, _timeout: Duration) -> Result<CommandOutput> {
        if self.timeouts.contains(cmd) {
            return Err(Error::CommandTimeout {
                cmd: cmd.to_string(),
            });
        }
        self.commands
            .get(cmd)
            .cloned()
            .ok_or_else(|| Error::CommandExecution {
                cmd: cmd.to_string(),
                reason: "command not found".into(),
            })
    }
}
