//! Audit attributes: which package is declared and which upstream servers
//! the configuration must list.
//!
//! Values come from an optional YAML attributes file, overridden by CLI
//! flags, falling back to the profile defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tsaudit_controls::PackageChoice;

pub const DEFAULT_PACKAGE: &str = "openntpd";
pub const DEFAULT_SERVER: &str = "pool.ntp.org";

/// YAML attributes file shape.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributesFile {
    #[serde(default)]
    ntp_package: Option<String>,
    #[serde(default)]
    ntp_servers: Option<Vec<String>>,
}

/// Resolved audit inputs.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub choice: PackageChoice,
    pub servers: Vec<String>,
}

/// Load audit attributes. CLI flags win over the attributes file, which
/// wins over defaults.
pub fn load(
    attributes_path: Option<&Path>,
    package_flag: Option<&str>,
    server_flags: &[String],
) -> Result<AuditConfig> {
    let file = match attributes_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read attributes file {}", path.display()))?;
            serde_yaml::from_str::<AttributesFile>(&content)
                .with_context(|| format!("invalid attributes file {}", path.display()))?
        }
        None => AttributesFile::default(),
    };

    let package = package_flag
        .map(str::to_string)
        .or(file.ntp_package)
        .unwrap_or_else(|| DEFAULT_PACKAGE.to_string());

    let servers = if !server_flags.is_empty() {
        server_flags.to_vec()
    } else {
        file.ntp_servers
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_SERVER.to_string()])
    };

    Ok(AuditConfig {
        choice: PackageChoice::from_name(&package),
        servers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tsaudit_controls::Package;

    fn write_attributes(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = load(None, None, &[]).unwrap();
        assert_eq!(config.choice, PackageChoice::Managed(Package::Openntpd));
        assert_eq!(config.servers, vec![DEFAULT_SERVER.to_string()]);
    }

    #[test]
    fn test_attributes_file() {
        let file = write_attributes(
            "ntp_package: chrony\nntp_servers:\n  - 0.pool.ntp.org\n  - 1.pool.ntp.org\n",
        );
        let config = load(Some(file.path()), None, &[]).unwrap();
        assert_eq!(config.choice, PackageChoice::Managed(Package::Chrony));
        assert_eq!(config.servers, vec!["0.pool.ntp.org", "1.pool.ntp.org"]);
    }

    #[test]
    fn test_cli_flags_override_file() {
        let file = write_attributes("ntp_package: chrony\nntp_servers: [a.example.com]\n");
        let config = load(
            Some(file.path()),
            Some("ntp"),
            &["time.example.com".to_string()],
        )
        .unwrap();
        assert_eq!(config.choice, PackageChoice::Managed(Package::Ntp));
        assert_eq!(config.servers, vec!["time.example.com"]);
    }

    #[test]
    fn test_unknown_package_is_disabled_posture() {
        let config = load(None, Some("none"), &[]).unwrap();
        assert_eq!(config.choice, PackageChoice::Disabled("none".into()));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let file = write_attributes("ntp_package: [not, a, string\n");
        assert!(load(Some(file.path()), None, &[]).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let file = write_attributes("ntp_pakcage: ntp\n");
        assert!(load(Some(file.path()), None, &[]).is_err());
    }
}
