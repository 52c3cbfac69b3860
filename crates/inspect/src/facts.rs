//! Environment fact detection: OS identity and virtualization role.

use crate::local::LocalInspector;
use std::path::Path;
use tracing::debug;
use tsaudit_common::{EnvironmentFacts, Error, Inspector, OsFamily, OsInfo, Result, Virtualization};

/// Detect OS and virtualization facts for the local host.
pub async fn detect_facts(inspector: &LocalInspector) -> Result<EnvironmentFacts> {
    let os = detect_os(inspector).await?;
    let virtualization = detect_virtualization(inspector).await;
    debug!(family = %os.family, version = %os.version, role = ?virtualization.role, "detected environment");
    Ok(EnvironmentFacts {
        os,
        virtualization,
    })
}

async fn detect_os(inspector: &LocalInspector) -> Result<OsInfo> {
    if cfg!(target_os = "macos") {
        let version = inspector
            .run_command("sw_vers -productVersion", std::time::Duration::from_secs(5))
            .await
            .map(|out| out.stdout.trim().to_string())
            .unwrap_or_default();
        return Ok(OsInfo::new(OsFamily::Darwin, version, "macos"));
    }

    let content = inspector
        .read_file(Path::new("/etc/os-release"))
        .await
        .map_err(|e| Error::Inspection(format!("cannot detect OS: {}", e)))?;
    Ok(parse_os_release(&content))
}

/// Parse /etc/os-release into an OsInfo. Family comes from ID, falling back
/// to the first recognized ID_LIKE token.
fn parse_os_release(content: &str) -> OsInfo {
    let mut id = String::new();
    let mut id_like = String::new();
    let mut version_id = String::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "ID" => id = value,
                "ID_LIKE" => id_like = value,
                "VERSION_ID" => version_id = value,
                _ => {}
            }
        }
    }

    let mut family = OsFamily::from_name(&id);
    if matches!(family, OsFamily::Other(_)) {
        for token in id_like.split_whitespace() {
            let candidate = OsFamily::from_name(token);
            if !matches!(candidate, OsFamily::Other(_)) {
                family = candidate;
                break;
            }
        }
    }

    OsInfo::new(family, version_id, id)
}

async fn detect_virtualization(inspector: &LocalInspector) -> Virtualization {
    // Container markers first; they are cheaper and more reliable than
    // systemd-detect-virt inside minimal images.
    if Path::new("/.dockerenv").exists() {
        return Virtualization::guest("docker");
    }
    if Path::new("/run/.containerenv").exists() {
        return Virtualization::guest("podman");
    }
    if let Ok(environ) = std::fs::read_to_string("/proc/1/environ") {
        if environ.split('\0').any(|kv| kv == "container=lxc") {
            return Virtualization::guest("lxd");
        }
    }

    match inspector
        .run_command("systemd-detect-virt", std::time::Duration::from_secs(5))
        .await
    {
        Ok(out) if out.success() => {
            let system = out.stdout.trim().to_string();
            if system.is_empty() || system == "none" {
                Virtualization::host()
            } else {
                Virtualization::guest(system)
            }
        }
        // Non-zero exit means "none detected"; a missing tool means we
        // cannot tell, so assume bare metal.
        _ => Virtualization::host(),
    }
}
