//! Platform profile resolution.
//!
//! Maps a declared time-sync package and the detected OS to the concrete
//! paths, users and permission modes the controls assert against. Resolution
//! is a priority-ordered dispatch table; the first matching row wins and no
//! partial profiles are ever produced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tsaudit_common::{Error, OsFamily, OsInfo, Result};

/// Supported time-synchronization implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Package {
    Ntp,
    Openntpd,
    Chrony,
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Package::Ntp => write!(f, "ntp"),
            Package::Openntpd => write!(f, "openntpd"),
            Package::Chrony => write!(f, "chrony"),
        }
    }
}

/// The user's `ntp_package` attribute, parsed.
///
/// Unrecognized names (including "none") are the intentional disabled
/// posture: the package must exist but no time-sync service may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageChoice {
    Managed(Package),
    Disabled(String),
}

impl PackageChoice {
    /// Parse the `ntp_package` attribute. Never fails: unknown names are
    /// the disabled posture.
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ntp" | "ntpd" => PackageChoice::Managed(Package::Ntp),
            "openntpd" => PackageChoice::Managed(Package::Openntpd),
            "chrony" | "chronyd" => PackageChoice::Managed(Package::Chrony),
            other => PackageChoice::Disabled(other.to_string()),
        }
    }
}

impl FromStr for PackageChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(PackageChoice::from_name(s))
    }
}

impl Default for PackageChoice {
    fn default() -> Self {
        PackageChoice::Managed(Package::Openntpd)
    }
}

/// Resolved platform-specific facts for the active time-sync implementation.
///
/// Immutable once constructed; every field is populated by the dispatch
/// table or resolution fails outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub package: Package,
    pub service_name: String,
    pub binary_path: PathBuf,
    pub config_path: PathBuf,
    pub daemon_user: String,
    pub drift_path: PathBuf,
    pub drift_owner: String,
    /// Expected drift file permission bits as an octal string, e.g. "0640".
    pub drift_mode: String,
    /// Ordered upstream server hostnames from the `ntp_servers` attribute.
    pub servers: Vec<String>,
}

/// Outcome of profile resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResolvedProfile {
    /// A recognized package with a full platform profile.
    Managed(PlatformProfile),
    /// Disabled posture: the named package must be installed but its
    /// service must not exist or run.
    Disabled { package: String, service: String },
}

impl ResolvedProfile {
    pub fn as_managed(&self) -> Option<&PlatformProfile> {
        match self {
            ResolvedProfile::Managed(p) => Some(p),
            ResolvedProfile::Disabled { .. } => None,
        }
    }
}

/// One row of the dispatch table. `family`/`major` of `None` match any OS.
struct ProfileRow {
    packages: &'static [Package],
    family: Option<OsFamily>,
    major: Option<u32>,
    build: fn(Vec<String>) -> PlatformProfile,
}

/// Dispatch table, highest priority first.
///
/// The redhat-8 row deliberately matches a declared `ntp` package as well:
/// redhat 8 dropped ntpd, so the chrony profile overrides the declared
/// choice on that platform.
static PROFILE_ROWS: &[ProfileRow] = &[
    ProfileRow {
        packages: &[Package::Ntp, Package::Chrony],
        family: Some(OsFamily::Redhat),
        major: Some(8),
        build: chrony_profile,
    },
    ProfileRow {
        packages: &[Package::Chrony],
        family: Some(OsFamily::Redhat),
        major: None,
        build: chrony_profile,
    },
    ProfileRow {
        packages: &[Package::Ntp],
        family: Some(OsFamily::Darwin),
        major: None,
        build: ntp_darwin_profile,
    },
    ProfileRow {
        packages: &[Package::Ntp],
        family: Some(OsFamily::Redhat),
        major: None,
        build: ntp_redhat_profile,
    },
    ProfileRow {
        packages: &[Package::Ntp],
        family: Some(OsFamily::Debian),
        major: None,
        build: ntp_debian_profile,
    },
    ProfileRow {
        packages: &[Package::Openntpd],
        family: None,
        major: None,
        build: openntpd_profile,
    },
];

fn chrony_profile(servers: Vec<String>) -> PlatformProfile {
    PlatformProfile {
        package: Package::Chrony,
        service_name: "chronyd".into(),
        binary_path: "/usr/sbin/chronyd".into(),
        config_path: "/etc/chrony.conf".into(),
        daemon_user: "chrony".into(),
        drift_path: "/var/lib/chrony/drift".into(),
        drift_owner: "chrony".into(),
        drift_mode: "0640".into(),
        servers,
    }
}

fn ntp_darwin_profile(servers: Vec<String>) -> PlatformProfile {
    PlatformProfile {
        package: Package::Ntp,
        service_name: "ntpd".into(),
        binary_path: "/usr/sbin/ntpd".into(),
        config_path: "/private/etc/ntp-restrict.conf".into(),
        daemon_user: "root".into(),
        drift_path: "/var/db/ntp.drift".into(),
        drift_owner: "root".into(),
        drift_mode: "0644".into(),
        servers,
    }
}

fn ntp_redhat_profile(servers: Vec<String>) -> PlatformProfile {
    PlatformProfile {
        package: Package::Ntp,
        service_name: "ntpd".into(),
        binary_path: "/usr/sbin/ntpd".into(),
        config_path: "/etc/ntp.conf".into(),
        daemon_user: "root".into(),
        drift_path: "/var/ntp/drift/ntp.drift".into(),
        drift_owner: "root".into(),
        drift_mode: "0640".into(),
        servers,
    }
}

fn ntp_debian_profile(servers: Vec<String>) -> PlatformProfile {
    PlatformProfile {
        package: Package::Ntp,
        service_name: "ntpd".into(),
        binary_path: "/usr/sbin/ntpd".into(),
        config_path: "/etc/ntp.conf".into(),
        daemon_user: "ntp".into(),
        drift_path: "/var/lib/ntp/ntp.drift".into(),
        drift_owner: "ntp".into(),
        drift_mode: "0640".into(),
        servers,
    }
}

fn openntpd_profile(servers: Vec<String>) -> PlatformProfile {
    PlatformProfile {
        package: Package::Openntpd,
        service_name: "openntpd".into(),
        binary_path: "/usr/sbin/openntpd".into(),
        config_path: "/etc/openntpd/ntpd.conf".into(),
        daemon_user: "ntpd".into(),
        drift_path: "/var/lib/openntpd/db/ntpd.drift".into(),
        drift_owner: "ntpd".into(),
        drift_mode: "0644".into(),
        servers,
    }
}

/// Resolve the platform profile for a declared package on a detected OS.
///
/// Fails with [`Error::UnsupportedPlatform`] when no dispatch row matches;
/// a partially-populated profile is never returned.
pub fn resolve(
    choice: &PackageChoice,
    os: &OsInfo,
    servers: Vec<String>,
) -> Result<ResolvedProfile> {
    let package = match choice {
        PackageChoice::Disabled(name) => {
            return Ok(ResolvedProfile::Disabled {
                package: name.clone(),
                service: name.clone(),
            });
        }
        PackageChoice::Managed(p) => *p,
    };

    for row in PROFILE_ROWS {
        if !row.packages.contains(&package) {
            continue;
        }
        if let Some(family) = &row.family {
            if *family != os.family {
                continue;
            }
        }
        if let Some(major) = row.major {
            if os.major_version() != Some(major) {
                continue;
            }
        }
        return Ok(ResolvedProfile::Managed((row.build)(servers)));
    }

    Err(Error::UnsupportedPlatform {
        package: package.to_string(),
        family: os.family.to_string(),
        version: os.version.clone(),
    })
}
