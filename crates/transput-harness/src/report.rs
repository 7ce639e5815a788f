//! Report generation for fixture verification.

use serde::Serialize;
use transput_core::MetricsSnapshot;

use crate::verify::VerificationSummary;

/// A verification report for one recovery mode.
#[derive(Debug, Clone, Serialize)]
pub struct ConformanceReport {
    pub title: String,
    /// Recovery mode tested (`strict` or `lenient`).
    pub mode: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub summary: VerificationSummary,
    /// Engine counters summed over the run.
    pub metrics: MetricsSnapshot,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Mode: {}\n", self.mode));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Case | Section | Status |\n");
        out.push_str("|------|---------|--------|\n");
        for r in &self.summary.results {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                r.case_name,
                r.section,
                r.verdict.label()
            ));
        }

        out.push_str("\n## Sections\n\n");
        out.push_str("| Section | Passed | Failed |\n");
        out.push_str("|---------|--------|--------|\n");
        for (section, tally) in self.summary.by_section() {
            out.push_str(&format!(
                "| {section} | {} | {} |\n",
                tally.passed, tally.failed
            ));
        }

        let mut failures = self.summary.failures().peekable();
        if failures.peek().is_some() {
            out.push_str("\n## Failures\n");
            for r in failures {
                out.push_str(&format!("\n### {}\n\n```\n", r.case_name));
                out.push_str(r.diff.as_deref().unwrap_or(""));
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("```\n");
            }
        }

        let m = &self.metrics;
        out.push_str("\n## Counters\n\n");
        out.push_str(&format!("- pictures_written: {}\n", m.pictures_written));
        out.push_str(&format!("- pictures_read: {}\n", m.pictures_read));
        out.push_str(&format!("- insertions: {}\n", m.insertions));
        out.push_str(&format!("- frames_opened: {}\n", m.frames_opened));
        out.push_str(&format!("- restarts: {}\n", m.restarts));
        out.push_str(&format!("- embedded_returns: {}\n", m.embedded_returns));
        out.push_str(&format!("- value_errors: {}\n", m.value_errors));
        out.push_str(&format!("- format_errors: {}\n", m.format_errors));
        out.push_str(&format!(
            "- fraction_recoveries: {}\n",
            m.fraction_recoveries
        ));
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
