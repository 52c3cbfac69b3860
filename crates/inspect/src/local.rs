//! Inspector implementation for the local host.
//!
//! File metadata comes straight from the filesystem; process, service and
//! package state go through the standard system tools, every execution
//! bounded by a timeout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use tsaudit_common::{
    CommandOutput, Error, FileStat, Inspector, ProcessInfo, Result, ServiceState,
};

/// Inspector backed by the local filesystem and system tools.
pub struct LocalInspector {
    /// Timeout for the helper commands the inspector runs itself
    /// (ps, systemctl, package queries).
    query_timeout: Duration,
}

impl LocalInspector {
    pub fn new() -> Self {
        Self {
            query_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    async fn query(&self, cmd: &str) -> Result<CommandOutput> {
        self.run_command(cmd, self.query_timeout).await
    }
}

impl Default for LocalInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Inspector for LocalInspector {
    async fn stat(&self, path: &Path) -> Result<Option<FileStat>> {
        use std::os::unix::fs::MetadataExt;

        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Inspection(format!(
                    "stat {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let mode_bits = meta.mode();
        let mtime = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| Error::Inspection(format!("mtime {}: {}", path.display(), e)))?;

        Ok(Some(FileStat {
            is_file: meta.is_file(),
            owner: username_for_uid(meta.uid()).unwrap_or_else(|| meta.uid().to_string()),
            mode: format!("{:04o}", mode_bits & 0o7777),
            executable: mode_bits & 0o111 != 0,
            mtime,
        }))
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Inspection(format!("read {}: {}", path.display(), e)))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn processes(&self, name: &str) -> Result<Vec<ProcessInfo>> {
        let out = self.query("ps axo user=,pid=,comm=").await?;
        if !out.success() {
            return Err(Error::Inspection(format!(
                "ps exited with {:?}: {}",
                out.exit_code,
                out.stderr.trim()
            )));
        }
        Ok(parse_process_table(&out.stdout, name))
    }

    async fn service(&self, name: &str) -> Result<ServiceState> {
        // A name that would need shell quoting cannot be a systemd unit,
        // so it reads as not installed rather than an inspection failure.
        if !is_safe_service_name(name) {
            return Ok(ServiceState::default());
        }

        let unit_files = self
            .query(&format!(
                "systemctl list-unit-files --no-pager --no-legend {}.service",
                name
            ))
            .await?;
        let installed = unit_files.success() && !unit_files.stdout.trim().is_empty();

        let enabled = self
            .query(&format!("systemctl is-enabled {}", name))
            .await?
            .stdout
            .trim()
            == "enabled";

        let running = self
            .query(&format!("systemctl is-active {}", name))
            .await?
            .stdout
            .trim()
            == "active";

        Ok(ServiceState {
            installed,
            enabled,
            running,
        })
    }

    async fn package_installed(&self, name: &str) -> Result<bool> {
        if !is_safe_service_name(name) {
            return Err(Error::Inspection(format!("unsafe package name: {}", name)));
        }

        let dpkg = self
            .query(&format!("dpkg-query -W -f '${{Status}}' {} 2>/dev/null", name))
            .await?;
        if dpkg.success() && dpkg.stdout.contains("install ok installed") {
            return Ok(true);
        }

        let rpm = self.query(&format!("rpm -q {} 2>/dev/null", name)).await?;
        Ok(rpm.success())
    }

    async fn run_command(&self, cmd: &str, timeout: Duration) -> Result<CommandOutput> {
        debug!(cmd, "local exec");

        let child = tokio::process::Command::new("sh")
            .args(["-c", cmd])
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::CommandExecution {
                    cmd: cmd.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(Error::CommandTimeout {
                    cmd: cmd.to_string(),
                })
            }
        };

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Parse `ps axo user=,pid=,comm=` output, keeping rows whose command
/// matches `name`.
fn parse_process_table(output: &str, name: &str) -> Vec<ProcessInfo> {
    let mut processes = Vec::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let command = parts[2..].join(" ");
        if command != name {
            continue;
        }
        let Ok(pid) = parts[1].parse::<u32>() else {
            continue;
        };
        processes.push(ProcessInfo {
            pid,
            user: parts[0].to_string(),
            command,
        });
    }
    processes
}

/// Resolve a uid to a user name via /etc/passwd.
fn username_for_uid(uid: u32) -> Option<String> {
    let passwd = std::fs::read_to_string("/etc/passwd").ok()?;
    for line in passwd.lines() {
        let mut fields = line.split(':');
        let name = fields.next()?;
        let _password = fields.next()?;
        let entry_uid: u32 = fields.next()?.parse().ok()?;
        if entry_uid == uid {
            return Some(name.to_string());
        }
    }
    None
}

/// Validate a service/package name before it reaches a shell (no injection).
fn is_safe_service_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '@' || c == '+')
        && !name.is_empty()
        && name.len() < 256
}
