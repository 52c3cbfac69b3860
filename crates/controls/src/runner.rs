//! Evaluation runner: executes the control set in declaration order.

use crate::checks::all_controls;
use crate::control::{ControlContext, ControlResult, ControlSettings, ControlStatus};
use crate::profile::ResolvedProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tsaudit_common::{EnvironmentFacts, Inspector, Result};
use uuid::Uuid;

/// Aggregate result of one audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub facts: EnvironmentFacts,
    /// Results in control declaration order.
    pub results: Vec<ControlResult>,
    /// True when every assertion of every non-skipped control passed.
    pub passed: bool,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for result in &self.results {
            match result.status {
                ControlStatus::Passed => passed += 1,
                ControlStatus::Failed => failed += 1,
                ControlStatus::Skipped => skipped += 1,
            }
        }
        (passed, failed, skipped)
    }
}

/// Run every control against the resolved profile.
///
/// Controls are independent; failures are collected, never propagated. The
/// only fatal error in an audit is profile resolution, which happens before
/// this function is reached.
pub async fn run_controls(
    profile: &ResolvedProfile,
    facts: &EnvironmentFacts,
    inspector: &dyn Inspector,
    settings: &ControlSettings,
) -> RunReport {
    let started_at = Utc::now();
    let ctx = ControlContext {
        profile,
        facts,
        inspector,
        settings,
    };

    let mut results = Vec::new();
    for control in all_controls() {
        if !control.only_if(&ctx) {
            debug!(control = control.id(), "guard false, skipping");
            results.push(ControlResult::skipped(
                control.id(),
                control.title(),
                control.impact(),
            ));
            continue;
        }
        let assertions = control.evaluate(&ctx).await;
        let result =
            ControlResult::from_assertions(control.id(), control.title(), control.impact(), assertions);
        info!(
            control = %result.id,
            status = ?result.status,
            failed = result.failed_assertions(),
            "control evaluated"
        );
        results.push(result);
    }

    let passed = results.iter().all(|r| r.status != ControlStatus::Failed);
    RunReport {
        run_id: Uuid::new_v4(),
        started_at,
        finished_at: Utc::now(),
        facts: facts.clone(),
        results,
        passed,
    }
}
