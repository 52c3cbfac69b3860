//! Operating system and environment fact types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system family of the audited host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Darwin,
    Redhat,
    Debian,
    Other(String),
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Darwin => write!(f, "darwin"),
            OsFamily::Redhat => write!(f, "redhat"),
            OsFamily::Debian => write!(f, "debian"),
            OsFamily::Other(name) => write!(f, "{}", name),
        }
    }
}

impl OsFamily {
    /// Map a distribution identifier (os-release ID / ID_LIKE token) to a
    /// family.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "darwin" | "macos" | "mac_os_x" => OsFamily::Darwin,
            "redhat" | "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" => {
                OsFamily::Redhat
            }
            "debian" | "ubuntu" | "raspbian" | "linuxmint" | "pop" => OsFamily::Debian,
            other => OsFamily::Other(other.to_string()),
        }
    }
}

impl FromStr for OsFamily {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OsFamily::from_name(s))
    }
}

/// Detected operating system identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsInfo {
    pub family: OsFamily,
    /// Full version string as reported by the OS (e.g. "8.6", "22.04").
    pub version: String,
    /// Distribution identifier (e.g. "centos", "ubuntu", "macos").
    pub distribution: String,
}

impl OsInfo {
    pub fn new(family: OsFamily, version: impl Into<String>, distribution: impl Into<String>) -> Self {
        Self {
            family,
            version: version.into(),
            distribution: distribution.into(),
        }
    }

    /// Major version number, when the version string starts with one.
    pub fn major_version(&self) -> Option<u32> {
        self.version
            .split(['.', '-'])
            .next()
            .and_then(|v| v.parse().ok())
    }
}

/// Virtualization role of the audited host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VirtRole {
    Host,
    Guest,
}

/// Virtualization facts for the audited host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Virtualization {
    pub role: VirtRole,
    /// Virtualization system when role is Guest (e.g. "docker", "lxd", "kvm").
    pub system: Option<String>,
}

impl Virtualization {
    /// Bare-metal / non-virtualized host.
    pub fn host() -> Self {
        Self {
            role: VirtRole::Host,
            system: None,
        }
    }

    pub fn guest(system: impl Into<String>) -> Self {
        Self {
            role: VirtRole::Guest,
            system: Some(system.into()),
        }
    }

    /// Whether the host is a container guest (docker, podman or lxd).
    /// Process and drift-file controls do not apply inside these.
    pub fn is_container_guest(&self) -> bool {
        self.role == VirtRole::Guest
            && matches!(
                self.system.as_deref(),
                Some("docker") | Some("podman") | Some("lxd")
            )
    }
}

/// Read-only environment facts gathered once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    pub os: OsInfo,
    pub virtualization: Virtualization,
}
