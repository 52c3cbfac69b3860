//! Service state control.

use crate::control::{Assertion, Control, ControlContext};
use crate::profile::ResolvedProfile;
use async_trait::async_trait;
use tsaudit_common::ServiceState;

/// The declared package's service must be installed, enabled and running.
/// In the disabled posture the opposite holds: no such service may exist.
pub struct ServiceStateControl;

#[async_trait]
impl Control for ServiceStateControl {
    fn id(&self) -> &str {
        "timesync-2.0"
    }

    fn title(&self) -> &str {
        "time-sync service should be running"
    }

    async fn evaluate(&self, ctx: &ControlContext<'_>) -> Vec<Assertion> {
        let (service, expect_present) = match ctx.profile {
            ResolvedProfile::Managed(p) => (p.service_name.as_str(), true),
            ResolvedProfile::Disabled { service, .. } => (service.as_str(), false),
        };

        let state = match ctx.inspector.service(service).await {
            Ok(state) => state,
            Err(e) => {
                return service_assertion_descs(service, expect_present)
                    .into_iter()
                    .map(|desc| Assertion::inspection_error(desc, &e))
                    .collect();
            }
        };

        service_assertions(service, expect_present, state)
    }
}

fn service_assertion_descs(service: &str, expect_present: bool) -> Vec<String> {
    let verb = if expect_present { "is" } else { "is not" };
    vec![
        format!("service {} {} installed", service, verb),
        format!("service {} {} enabled", service, verb),
        format!("service {} {} running", service, verb),
    ]
}

fn service_assertions(service: &str, expect_present: bool, state: ServiceState) -> Vec<Assertion> {
    let descs = service_assertion_descs(service, expect_present);
    let actuals = [
        ("installed", state.installed),
        ("enabled", state.enabled),
        ("running", state.running),
    ];
    descs
        .into_iter()
        .zip(actuals)
        .map(|(desc, (what, actual))| {
            let detail = if expect_present {
                format!("service is not {}", what)
            } else {
                format!("service is {}", what)
            };
            Assertion::check(desc, actual == expect_present, detail)
        })
        .collect()
}
