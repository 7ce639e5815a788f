//! Output comparison and verification.
//!
//! Case outputs are the written text (or the joined read values) with an
//! `<error:TAG>` suffix when the statement ended in an error. Comparison
//! separates a wrong error tag from a wrong text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::diff;

const ERROR_OPEN: &str = "<error:";

/// How a case's output compared with its expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    /// Text differed from the expectation.
    Mismatch,
    /// Text matched but the statement ended with a different error.
    WrongError,
    /// The case could not be built from its fixture.
    Broken,
}

impl Verdict {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Mismatch => "MISMATCH",
            Self::WrongError => "WRONG ERROR",
            Self::Broken => "BROKEN",
        }
    }
}

/// Split a trailing `<error:TAG>` off a case output.
#[must_use]
pub fn split_error_tag(output: &str) -> (&str, Option<&str>) {
    if let Some(body) = output.strip_suffix('>')
        && let Some(at) = body.rfind(ERROR_OPEN)
    {
        return (&body[..at], Some(&body[at + ERROR_OPEN.len()..]));
    }
    (output, None)
}

/// Result of verifying a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Case name, suffixed with the recovery mode for `both` cases.
    pub case_name: String,
    /// Behaviour area the case covers.
    pub section: String,
    pub verdict: Verdict,
    pub expected: String,
    pub actual: String,
    /// Error the statement ended with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_tag: Option<String>,
    /// Diff, or the build failure, when the case did not pass.
    pub diff: Option<String>,
}

impl VerificationResult {
    /// Compare a case's `actual` output with `expected`.
    #[must_use]
    pub fn compare(
        case_name: impl Into<String>,
        section: impl Into<String>,
        expected: &str,
        actual: String,
    ) -> Self {
        let (expected_text, expected_tag) = split_error_tag(expected);
        let (actual_text, actual_tag) = split_error_tag(&actual);
        let verdict = if expected == actual {
            Verdict::Pass
        } else if expected_text == actual_text {
            Verdict::WrongError
        } else {
            Verdict::Mismatch
        };
        let diff = match verdict {
            Verdict::Pass => None,
            Verdict::WrongError => Some(format!(
                "--- expected error {}\n+++ actual error {}\n",
                expected_tag.unwrap_or("none"),
                actual_tag.unwrap_or("none")
            )),
            _ => Some(diff::render_diff(expected, &actual)),
        };
        let error_tag = actual_tag.map(str::to_string);
        Self {
            case_name: case_name.into(),
            section: section.into(),
            verdict,
            expected: expected.to_string(),
            actual,
            error_tag,
            diff,
        }
    }

    /// A case whose fixture could not be turned into a statement.
    #[must_use]
    pub fn broken(
        case_name: impl Into<String>,
        section: impl Into<String>,
        expected: &str,
        reason: String,
    ) -> Self {
        Self {
            case_name: case_name.into(),
            section: section.into(),
            verdict: Verdict::Broken,
            expected: expected.to_string(),
            actual: String::new(),
            error_tag: None,
            diff: Some(reason),
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Pass/fail counts for one section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTally {
    pub passed: usize,
    pub failed: usize,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed()).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// Counts per section, in section order.
    #[must_use]
    pub fn by_section(&self) -> BTreeMap<&str, SectionTally> {
        let mut sections: BTreeMap<&str, SectionTally> = BTreeMap::new();
        for r in &self.results {
            let tally = sections.entry(r.section.as_str()).or_default();
            if r.passed() {
                tally.passed += 1;
            } else {
                tally.failed += 1;
            }
        }
        sections
    }
}
