//! Control trait and result types.
//!
//! A control is one named, independently evaluable compliance assertion
//! group. Controls never short-circuit: every assertion in a control is
//! evaluated and recorded so the report is complete, not first-failure-wins.

use crate::profile::ResolvedProfile;
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tsaudit_common::{EnvironmentFacts, Error, Inspector};

/// Tunable evaluation settings.
#[derive(Debug, Clone)]
pub struct ControlSettings {
    /// How far in the past a drift file's mtime may be.
    pub drift_window: Duration,
    /// Bound on any single external command execution.
    pub command_timeout: std::time::Duration,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            drift_window: Duration::hours(8),
            command_timeout: std::time::Duration::from_secs(5),
        }
    }
}

/// Outcome of a single assertion inside a control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    /// What was asserted, e.g. "drift file is owned by ntpd".
    pub description: String,
    pub passed: bool,
    /// Actual-vs-expected detail for diagnostics, present on failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Assertion {
    pub fn pass(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            passed: true,
            detail: None,
        }
    }

    pub fn fail(description: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            passed: false,
            detail: Some(detail.into()),
        }
    }

    /// Pass/fail from a boolean, attaching the detail only on failure.
    pub fn check(description: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        if passed {
            Self::pass(description)
        } else {
            Self::fail(description, detail)
        }
    }

    /// Record an inspection error as a failed assertion. Inspection
    /// failures are never fatal and never silently ignored.
    pub fn inspection_error(description: impl Into<String>, err: &Error) -> Self {
        Self::fail(description, format!("inspection error: {}", err))
    }
}

/// Aggregate status of one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    Passed,
    Failed,
    /// The control's guard evaluated false; not applicable here.
    Skipped,
}

/// Sealed result of evaluating one control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResult {
    pub id: String,
    pub title: String,
    /// Severity weight, 0.0-1.0.
    pub impact: f64,
    pub status: ControlStatus,
    pub assertions: Vec<Assertion>,
}

impl ControlResult {
    /// Seal a result from collected assertions.
    pub fn from_assertions(
        id: impl Into<String>,
        title: impl Into<String>,
        impact: f64,
        assertions: Vec<Assertion>,
    ) -> Self {
        let status = if assertions.iter().all(|a| a.passed) {
            ControlStatus::Passed
        } else {
            ControlStatus::Failed
        };
        Self {
            id: id.into(),
            title: title.into(),
            impact,
            status,
            assertions,
        }
    }

    /// Result for a control whose guard evaluated false.
    pub fn skipped(id: impl Into<String>, title: impl Into<String>, impact: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            impact,
            status: ControlStatus::Skipped,
            assertions: Vec::new(),
        }
    }

    pub fn failed_assertions(&self) -> usize {
        self.assertions.iter().filter(|a| !a.passed).count()
    }
}

/// Shared read-only context handed to every control.
pub struct ControlContext<'a> {
    pub profile: &'a ResolvedProfile,
    pub facts: &'a EnvironmentFacts,
    pub inspector: &'a dyn Inspector,
    pub settings: &'a ControlSettings,
}

impl ControlContext<'_> {
    /// Guard helper: host-only controls do not apply inside docker/lxd
    /// guests and require a managed profile.
    pub fn on_managed_host(&self) -> bool {
        self.profile.as_managed().is_some() && !self.facts.virtualization.is_container_guest()
    }
}

/// One named, independently evaluable compliance check.
#[async_trait]
pub trait Control: Send + Sync {
    /// Unique identifier, e.g. "timesync-1.0".
    fn id(&self) -> &str;

    /// Human-readable title.
    fn title(&self) -> &str;

    /// Severity weight, 0.0-1.0.
    fn impact(&self) -> f64 {
        0.7
    }

    /// Guard predicate. When false the control is reported as skipped,
    /// never evaluated.
    fn only_if(&self, _ctx: &ControlContext<'_>) -> bool {
        true
    }

    /// Evaluate all assertions. Implementations must collect every outcome
    /// rather than returning early on the first failure.
    async fn evaluate(&self, ctx: &ControlContext<'_>) -> Vec<Assertion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_status_from_assertions() {
        let ok = ControlResult::from_assertions(
            "t-1.0",
            "test",
            0.7,
            vec![Assertion::pass("a"), Assertion::pass("b")],
        );
        assert_eq!(ok.status, ControlStatus::Passed);
        assert_eq!(ok.failed_assertions(), 0);

        let bad = ControlResult::from_assertions(
            "t-1.0",
            "test",
            0.7,
            vec![Assertion::pass("a"), Assertion::fail("b", "expected 0640, got 0600")],
        );
        assert_eq!(bad.status, ControlStatus::Failed);
        assert_eq!(bad.failed_assertions(), 1);
    }

    #[test]
    fn test_skipped_result_has_no_assertions() {
        let skipped = ControlResult::skipped("t-3.0", "test", 0.7);
        assert_eq!(skipped.status, ControlStatus::Skipped);
        assert!(skipped.assertions.is_empty());
    }

    #[test]
    fn test_check_attaches_detail_only_on_failure() {
        let pass = Assertion::check("mode", true, "unused");
        assert!(pass.detail.is_none());

        let fail = Assertion::check("mode", false, "expected 0640, got 0644");
        assert_eq!(fail.detail.as_deref(), Some("expected 0640, got 0644"));
    }
}
