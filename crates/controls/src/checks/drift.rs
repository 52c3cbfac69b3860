//! Drift file controls: ownership/mode integrity and mtime freshness.

use crate::control::{Assertion, Control, ControlContext};
use async_trait::async_trait;
use chrono::Utc;
use tsaudit_common::FileStat;

/// The drift file must exist with the expected owner and exact permission
/// mode. Not applicable inside container guests or without a managed
/// profile.
pub struct DriftIntegrityControl;

#[async_trait]
impl Control for DriftIntegrityControl {
    fn id(&self) -> &str {
        "timesync-4.0"
    }

    fn title(&self) -> &str {
        "time-sync drift file should be present"
    }

    fn only_if(&self, ctx: &ControlContext<'_>) -> bool {
        ctx.on_managed_host()
    }

    async fn evaluate(&self, ctx: &ControlContext<'_>) -> Vec<Assertion> {
        let Some(profile) = ctx.profile.as_managed() else {
            return Vec::new();
        };
        let drift = profile.drift_path.display();
        let descs = [
            format!("{} is a regular file", drift),
            format!("{} is owned by {}", drift, profile.drift_owner),
            format!("{} has mode {}", drift, profile.drift_mode),
        ];

        match stat_drift(ctx, profile).await {
            StatOutcome::Found(stat) => vec![
                Assertion::check(
                    descs[0].clone(),
                    stat.is_file,
                    "exists but is not a regular file",
                ),
                Assertion::check(
                    descs[1].clone(),
                    stat.owner == profile.drift_owner,
                    format!("owned by {}", stat.owner),
                ),
                // Exact string comparison: a more permissive mode is as
                // wrong as a more restrictive one.
                Assertion::check(
                    descs[2].clone(),
                    stat.mode == profile.drift_mode,
                    format!("mode is {}", stat.mode),
                ),
            ],
            StatOutcome::Missing => descs
                .into_iter()
                .map(|d| Assertion::fail(d, "file does not exist"))
                .collect(),
            StatOutcome::Error(e) => descs
                .into_iter()
                .map(|d| Assertion::inspection_error(d, &e))
                .collect(),
        }
    }
}

/// The drift file's mtime must lie within the configured window before
/// "now". A future mtime is a failure as well: it means the clock being
/// audited has already gone wrong.
pub struct DriftFreshnessControl;

#[async_trait]
impl Control for DriftFreshnessControl {
    fn id(&self) -> &str {
        "timesync-5.0"
    }

    fn title(&self) -> &str {
        "time-sync drift file should be updated"
    }

    fn only_if(&self, ctx: &ControlContext<'_>) -> bool {
        ctx.on_managed_host()
    }

    async fn evaluate(&self, ctx: &ControlContext<'_>) -> Vec<Assertion> {
        let Some(profile) = ctx.profile.as_managed() else {
            return Vec::new();
        };
        let drift = profile.drift_path.display();
        let window = ctx.settings.drift_window;
        let descs = [
            format!("{} mtime is not in the future", drift),
            format!("{} was updated within the last {}h", drift, window.num_hours()),
        ];

        match stat_drift(ctx, profile).await {
            StatOutcome::Found(stat) => {
                let now = Utc::now();
                vec![
                    Assertion::check(
                        descs[0].clone(),
                        stat.mtime <= now,
                        format!("mtime {} is after {}", stat.mtime, now),
                    ),
                    Assertion::check(
                        descs[1].clone(),
                        stat.mtime >= now - window,
                        format!("mtime {} is older than {}h", stat.mtime, window.num_hours()),
                    ),
                ]
            }
            StatOutcome::Missing => descs
                .into_iter()
                .map(|d| Assertion::fail(d, "file does not exist"))
                .collect(),
            StatOutcome::Error(e) => descs
                .into_iter()
                .map(|d| Assertion::inspection_error(d, &e))
                .collect(),
        }
    }
}

enum StatOutcome {
    Found(FileStat),
    Missing,
    Error(tsaudit_common::Error),
}

async fn stat_drift(
    ctx: &ControlContext<'_>,
    profile: &crate::profile::PlatformProfile,
) -> StatOutcome {
    match ctx.inspector.stat(&profile.drift_path).await {
        Ok(Some(stat)) => StatOutcome::Found(stat),
        Ok(None) => StatOutcome::Missing,
        Err(e) => StatOutcome::Error(e),
    }
}
