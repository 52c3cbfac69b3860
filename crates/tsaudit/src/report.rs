//! Report rendering for the CLI.

use tsaudit_controls::{ControlStatus, RunReport};

/// Render a run report as human-readable text.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== TSAudit Report {} ===\n", report.run_id));
    out.push_str(&format!(
        "Host: {} {} ({})\n",
        report.facts.os.distribution, report.facts.os.version, report.facts.os.family
    ));
    out.push_str(&format!(
        "Started: {}\n\n",
        report.started_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));

    for result in &report.results {
        let tag = match result.status {
            ControlStatus::Passed => "PASS",
            ControlStatus::Failed => "FAIL",
            ControlStatus::Skipped => "SKIP",
        };
        out.push_str(&format!(
            "[{}] {} {} (impact {:.1})\n",
            tag, result.id, result.title, result.impact
        ));
        for assertion in &result.assertions {
            let mark = if assertion.passed { "+" } else { "-" };
            match (&assertion.detail, assertion.passed) {
                (Some(detail), false) => out.push_str(&format!(
                    "  {} {} ({})\n",
                    mark, assertion.description, detail
                )),
                _ => out.push_str(&format!("  {} {}\n", mark, assertion.description)),
            }
        }
    }

    let (passed, failed, skipped) = report.counts();
    out.push_str(&format!(
        "\nSummary: {} passed, {} failed, {} skipped\n",
        passed, failed, skipped
    ));
    out.push_str(&format!(
        "Verdict: {}\n",
        if report.passed { "PASSED" } else { "FAILED" }
    ));

    out
}
