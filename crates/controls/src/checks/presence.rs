//! Presence control: binary and configuration of the time-sync daemon.

use crate::control::{Assertion, Control, ControlContext};
use crate::patterns::required_patterns;
use crate::profile::ResolvedProfile;
use async_trait::async_trait;

/// The daemon binary and its configuration file must exist and the config
/// must carry the package-specific hardening directives. In the disabled
/// posture only the raw package's presence is asserted.
pub struct PresenceControl;

#[async_trait]
impl Control for PresenceControl {
    fn id(&self) -> &str {
        "timesync-1.0"
    }

    fn title(&self) -> &str {
        "time-sync daemon should be present"
    }

    async fn evaluate(&self, ctx: &ControlContext<'_>) -> Vec<Assertion> {
        let profile = match ctx.profile {
            ResolvedProfile::Managed(p) => p,
            ResolvedProfile::Disabled { package, .. } => {
                let desc = format!("package {} is installed", package);
                return vec![match ctx.inspector.package_installed(package).await {
                    Ok(installed) => Assertion::check(desc, installed, "package is not installed"),
                    Err(e) => Assertion::inspection_error(desc, &e),
                }];
            }
        };

        let mut assertions = Vec::new();
        let config = profile.config_path.display();

        match ctx.inspector.stat(&profile.config_path).await {
            Ok(Some(stat)) => assertions.push(Assertion::check(
                format!("{} is a regular file", config),
                stat.is_file,
                "exists but is not a regular file",
            )),
            Ok(None) => assertions.push(Assertion::fail(
                format!("{} is a regular file", config),
                "file does not exist",
            )),
            Err(e) => assertions.push(Assertion::inspection_error(
                format!("{} is a regular file", config),
                &e,
            )),
        }

        let patterns = required_patterns(profile, &ctx.facts.os.family);
        match ctx.inspector.read_file(&profile.config_path).await {
            Ok(content) => {
                for pattern in &patterns {
                    assertions.push(pattern.evaluate(&content));
                }
            }
            Err(e) => {
                // Content assertions still appear in the report, each
                // failed with the read error.
                for pattern in &patterns {
                    assertions.push(Assertion::fail(
                        pattern.description(),
                        format!("config unreadable: {}", e),
                    ));
                }
            }
        }

        let binary = profile.binary_path.display();
        let binary_checks = [
            format!("{} is a regular file", binary),
            format!("{} is executable", binary),
            format!("{} is owned by root", binary),
        ];
        match ctx.inspector.stat(&profile.binary_path).await {
            Ok(Some(stat)) => {
                assertions.push(Assertion::check(
                    binary_checks[0].clone(),
                    stat.is_file,
                    "exists but is not a regular file",
                ));
                assertions.push(Assertion::check(
                    binary_checks[1].clone(),
                    stat.executable,
                    format!("mode {} has no execute bit", stat.mode),
                ));
                assertions.push(Assertion::check(
                    binary_checks[2].clone(),
                    stat.owner == "root",
                    format!("owned by {}", stat.owner),
                ));
            }
            Ok(None) => {
                for desc in binary_checks {
                    assertions.push(Assertion::fail(desc, "file does not exist"));
                }
            }
            Err(e) => {
                for desc in binary_checks {
                    assertions.push(Assertion::inspection_error(desc, &e));
                }
            }
        }

        assertions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlSettings;
    use crate::profile::{resolve, PackageChoice};
    use crate::testutil::MockInspector;
    use chrono::Utc;
    use tsaudit_common::{EnvironmentFacts, OsFamily, OsInfo, Virtualization};

    fn facts(family: OsFamily, version: &str) -> EnvironmentFacts {
        EnvironmentFacts {
            os: OsInfo::new(family, version, "test"),
            virtualization: Virtualization::host(),
        }
    }

    fn resolve_for(package: &str, facts: &EnvironmentFacts, servers: &[&str]) -> ResolvedProfile {
        let choice: PackageChoice = package.parse().unwrap();
        resolve(&choice, &facts.os, servers.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    async fn run(profile: &ResolvedProfile, facts: &EnvironmentFacts, inspector: &MockInspector) -> Vec<Assertion> {
        let settings = ControlSettings::default();
        let ctx = ControlContext {
            profile,
            facts,
            inspector,
            settings: &settings,
        };
        PresenceControl.evaluate(&ctx).await
    }

    #[tokio::test]
    async fn test_openntpd_presence_passes() {
        let facts = facts(OsFamily::Debian, "11");
        let profile = resolve_for("openntpd", &facts, &["pool.ntp.org", "time.example.com"]);
        let inspector = MockInspector::new()
            .with_file(
                "/etc/openntpd/ntpd.conf",
                "root",
                "0644",
                false,
                Utc::now(),
                "servers pool.ntp.org\nservers time.example.com\n",
            )
            .with_file("/usr/sbin/openntpd", "root", "0755", true, Utc::now(), "");

        let assertions = run(&profile, &facts, &inspector).await;
        assert!(
            assertions.iter().all(|a| a.passed),
            "failures: {:?}",
            assertions.iter().filter(|a| !a.passed).collect::<Vec<_>>()
        );
        // file + 2 servers + listen-absent + 3 binary checks
        assert_eq!(assertions.len(), 7);
    }

    #[tokio::test]
    async fn test_darwin_missing_includefile_fails_only_that_assertion() {
        let facts = facts(OsFamily::Darwin, "13.2");
        let profile = resolve_for("ntp", &facts, &["pool.ntp.org"]);
        let inspector = MockInspector::new()
            .with_file(
                "/private/etc/ntp-restrict.conf",
                "root",
                "0644",
                false,
                Utc::now(),
                "restrict default ignore\n",
            )
            .with_file("/usr/sbin/ntpd", "root", "0755", true, Utc::now(), "");

        let assertions = run(&profile, &facts, &inspector).await;
        let failed: Vec<&Assertion> = assertions.iter().filter(|a| !a.passed).collect();
        assert_eq!(failed.len(), 1, "assertions: {:?}", assertions);
        assert_eq!(failed[0].description, "config includes /private/etc/ntp.conf");
        // Restrict pattern and binary ownership still reported independently.
        assert!(assertions
            .iter()
            .any(|a| a.description == "config restricts default access" && a.passed));
        assert!(assertions
            .iter()
            .any(|a| a.description == "/usr/sbin/ntpd is owned by root" && a.passed));
    }

    #[tokio::test]
    async fn test_missing_config_fails_file_and_content_assertions() {
        let facts = facts(OsFamily::Debian, "11");
        let profile = resolve_for("openntpd", &facts, &["pool.ntp.org"]);
        let inspector =
            MockInspector::new().with_file("/usr/sbin/openntpd", "root", "0755", true, Utc::now(), "");

        let assertions = run(&profile, &facts, &inspector).await;
        let file_check = &assertions[0];
        assert!(!file_check.passed);
        assert_eq!(file_check.detail.as_deref(), Some("file does not exist"));
        // Pattern assertions are present and failed, not dropped.
        assert!(assertions
            .iter()
            .any(|a| a.description.contains("servers pool.ntp.org") && !a.passed));
    }

    #[tokio::test]
    async fn test_unreadable_config_records_inspection_errors() {
        let facts = facts(OsFamily::Debian, "11");
        let profile = resolve_for("openntpd", &facts, &["pool.ntp.org"]);
        let inspector = MockInspector::new()
            .with_unreadable("/etc/openntpd/ntpd.conf")
            .with_file("/usr/sbin/openntpd", "root", "0755", true, Utc::now(), "");

        let assertions = run(&profile, &facts, &inspector).await;
        assert!(assertions
            .iter()
            .any(|a| !a.passed && a.detail.as_deref().is_some_and(|d| d.contains("permission denied"))));
    }

    #[tokio::test]
    async fn test_binary_not_owned_by_root_fails() {
        let facts = facts(OsFamily::Debian, "11");
        let profile = resolve_for("openntpd", &facts, &["pool.ntp.org"]);
        let inspector = MockInspector::new()
            .with_file(
                "/etc/openntpd/ntpd.conf",
                "root",
                "0644",
                false,
                Utc::now(),
                "servers pool.ntp.org\n",
            )
            .with_file("/usr/sbin/openntpd", "ntpd", "0755", true, Utc::now(), "");

        let assertions = run(&profile, &facts, &inspector).await;
        let owner = assertions
            .iter()
            .find(|a| a.description.ends_with("owned by root"))
            .unwrap();
        assert!(!owner.passed);
        assert_eq!(owner.detail.as_deref(), Some("owned by ntpd"));
    }

    #[tokio::test]
    async fn test_disabled_posture_checks_package_only() {
        let facts = facts(OsFamily::Debian, "11");
        let profile = resolve_for("none", &facts, &[]);
        let inspector = MockInspector::new().with_package("none");

        let assertions = run(&profile, &facts, &inspector).await;
        assert_eq!(assertions.len(), 1);
        assert!(assertions[0].passed);
        assert_eq!(assertions[0].description, "package none is installed");
    }
}
