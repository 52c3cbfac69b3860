//! Process identity control.

use crate::control::{Assertion, Control, ControlContext};
use async_trait::async_trait;

/// Exactly one daemon process must run, owned by the profile's daemon user.
/// Not applicable inside container guests or in the disabled posture.
pub struct ProcessIdentityControl;

#[async_trait]
impl Control for ProcessIdentityControl {
    fn id(&self) -> &str {
        "timesync-3.0"
    }

    fn title(&self) -> &str {
        "time-sync daemon should run as its service user"
    }

    fn only_if(&self, ctx: &ControlContext<'_>) -> bool {
        ctx.on_managed_host()
    }

    async fn evaluate(&self, ctx: &ControlContext<'_>) -> Vec<Assertion> {
        let Some(profile) = ctx.profile.as_managed() else {
            return Vec::new();
        };
        let service = &profile.service_name;
        let count_desc = format!("exactly one {} process is running", service);
        let user_desc = format!("{} runs as user {}", service, profile.daemon_user);

        let procs = match ctx.inspector.processes(service).await {
            Ok(procs) => procs,
            Err(e) => {
                return vec![
                    Assertion::inspection_error(count_desc, &e),
                    Assertion::inspection_error(user_desc, &e),
                ];
            }
        };

        let mut users: Vec<&str> = procs.iter().map(|p| p.user.as_str()).collect();
        users.sort_unstable();
        users.dedup();

        vec![
            Assertion::check(
                count_desc,
                procs.len() == 1,
                format!("found {} processes", procs.len()),
            ),
            Assertion::check(
                user_desc,
                users == [profile.daemon_user.as_str()],
                format!("running as [{}]", users.join(", ")),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlSettings;
    use crate::profile::{resolve, PackageChoice, ResolvedProfile};
    use crate::testutil::MockInspector;
    use tsaudit_common::{EnvironmentFacts, OsFamily, OsInfo, Virtualization};

    fn facts(virt: Virtualization) -> EnvironmentFacts {
        EnvironmentFacts {
            os: OsInfo::new(OsFamily::Debian, "11", "debian"),
            virtualization: virt,
        }
    }

    fn openntpd_profile(facts: &EnvironmentFacts) -> ResolvedProfile {
        let choice: PackageChoice = "openntpd".parse().unwrap();
        resolve(&choice, &facts.os, vec!["pool.ntp.org".into()]).unwrap()
    }

    #[tokio::test]
    async fn test_single_process_with_right_user_passes() {
        let facts = facts(Virtualization::host());
        let profile = openntpd_profile(&facts);
        let inspector = MockInspector::new().with_process("openntpd", "ntpd", 412);
        let settings = ControlSettings::default();
        let ctx = ControlContext {
            profile: &profile,
            facts: &facts,
            inspector: &inspector,
            settings: &settings,
        };
        assert!(ProcessIdentityControl.only_if(&ctx));
        let assertions = ProcessIdentityControl.evaluate(&ctx).await;
        assert!(assertions.iter().all(|a| a.passed), "{:?}", assertions);
    }

    #[tokio::test]
    async fn test_wrong_user_and_duplicate_processes_fail() {
        let facts = facts(Virtualization::host());
        let profile = openntpd_profile(&facts);
        let inspector = MockInspector::new()
            .with_process("openntpd", "root", 412)
            .with_process("openntpd", "root", 413);
        let settings = ControlSettings::default();
        let ctx = ControlContext {
            profile: &profile,
            facts: &facts,
            inspector: &inspector,
            settings: &settings,
        };
        let assertions = ProcessIdentityControl.evaluate(&ctx).await;
        assert_eq!(assertions.len(), 2);
        assert!(!assertions[0].passed);
        assert_eq!(assertions[0].detail.as_deref(), Some("found 2 processes"));
        assert!(!assertions[1].passed);
        assert_eq!(assertions[1].detail.as_deref(), Some("running as [root]"));
    }

    #[tokio::test]
    async fn test_container_guest_is_guarded_out() {
        let facts = facts(Virtualization::guest("docker"));
        let profile = openntpd_profile(&facts);
        let inspector = MockInspector::new();
        let settings = ControlSettings::default();
        let ctx = ControlContext {
            profile: &profile,
            facts: &facts,
            inspector: &inspector,
            settings: &settings,
        };
        assert!(!ProcessIdentityControl.only_if(&ctx));

        let lxd = facts_with("lxd");
        let ctx = ControlContext {
            profile: &profile,
            facts: &lxd,
            inspector: &inspector,
            settings: &settings,
        };
        assert!(!ProcessIdentityControl.only_if(&ctx));

        // A kvm guest is a full VM; the control still applies there.
        let kvm = facts_with("kvm");
        let ctx = ControlContext {
            profile: &profile,
            facts: &kvm,
            inspector: &inspector,
            settings: &settings,
        };
        assert!(ProcessIdentityControl.only_if(&ctx));
    }

    fn facts_with(system: &str) -> EnvironmentFacts {
        facts(Virtualization::guest(system))
    }
}
