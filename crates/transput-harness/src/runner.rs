//! Test execution engine.

use std::cell::Cell;
use std::sync::Arc;
use std::time::Instant;

use transput_core::{
    MemoryFile, MetricsSnapshot, ReadItem, RecoveryMode, Transput, TransputConfig, TransputItem,
    TransputMetrics, Value,
};

use crate::fixtures::{CaseDirection, FixtureCase, FixtureError, FixtureSet};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use crate::verify::VerificationResult;

/// What one case produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRun {
    /// Written text or read values, with `<error:TAG>` appended on failure.
    pub output: String,
    pub metrics: MetricsSnapshot,
}

/// Runs fixture sets under one recovery mode and collects results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
    /// Recovery mode being tested (`strict` or `lenient`).
    pub mode: String,
    totals: Cell<MetricsSnapshot>,
}

impl TestRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            mode: mode.into(),
            totals: Cell::new(MetricsSnapshot::default()),
        }
    }

    /// Counters accumulated over every case this runner executed.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.totals.get()
    }

    /// Run all matching fixtures in a set.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        self.cases(fixture_set).map(|case| self.verify(case)).collect()
    }

    /// Run all matching fixtures, emitting one log record per case. A log
    /// write failure stops the run.
    pub fn run_logged(
        &self,
        fixture_set: &FixtureSet,
        log: &mut LogEmitter,
    ) -> std::io::Result<Vec<VerificationResult>> {
        let mut results = Vec::new();
        for case in self.cases(fixture_set) {
            let started = Instant::now();
            let result = self.verify(case);
            let elapsed = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
            log.emit_entry(self.log_entry(&fixture_set.family, &result, elapsed))?;
            results.push(result);
        }
        Ok(results)
    }

    fn cases<'a>(&'a self, fixture_set: &'a FixtureSet) -> impl Iterator<Item = &'a FixtureCase> {
        fixture_set
            .cases
            .iter()
            .filter(move |case| mode_matches(&self.mode, &case.mode))
    }

    fn verify(&self, case: &FixtureCase) -> VerificationResult {
        let case_name = if case.mode.eq_ignore_ascii_case("both") {
            format!("{} [{}]", case.name, self.mode)
        } else {
            case.name.clone()
        };
        match self.execute(case) {
            Ok(run) => VerificationResult::compare(
                case_name,
                &case.section,
                &case.expected_output,
                run.output,
            ),
            Err(err) => VerificationResult::broken(
                case_name,
                &case.section,
                &case.expected_output,
                err.to_string(),
            ),
        }
    }

    fn log_entry(&self, family: &str, result: &VerificationResult, latency_ns: u64) -> LogEntry {
        let (level, outcome) = if result.passed() {
            (LogLevel::Info, Outcome::Pass)
        } else {
            (LogLevel::Error, Outcome::Fail)
        };
        let entry = LogEntry::new("", level, "fixture_case")
            .with_mode(&self.mode)
            .with_case(family, &result.case_name)
            .with_outcome(outcome)
            .with_latency_ns(latency_ns);
        if result.passed() {
            entry
        } else {
            entry.with_details(serde_json::json!({
                "verdict": result.verdict,
                "expected": result.expected,
                "actual": result.actual,
                "error_tag": result.error_tag,
            }))
        }
    }

    /// Execute one case under this runner's recovery mode.
    pub fn execute(&self, case: &FixtureCase) -> Result<CaseRun, FixtureError> {
        let config = TransputConfig {
            recovery: RecoveryMode::from_str_loose(&self.mode),
            ..TransputConfig::default()
        };
        let format = case.compile(&case.format)?;
        let mut host = case.host()?;
        let case_metrics = Arc::new(TransputMetrics::new());

        let output = match case.direction {
            CaseDirection::Write => {
                let mut items = vec![TransputItem::Format(format)];
                items.extend(case.values.iter().cloned().map(TransputItem::Value));
                let mut file = MemoryFile::new();
                let result = Transput::with_config(&mut file, config)
                    .with_metrics(case_metrics.clone())
                    .putf(&mut host, &items);
                with_error(file.output(), result.err())
            }
            CaseDirection::Read => {
                let mut items = vec![ReadItem::Format(format)];
                items.extend(case.modes.iter().copied().map(ReadItem::Value));
                let mut file = MemoryFile::with_input(&case.input);
                let result = Transput::with_config(&mut file, config)
                    .with_metrics(case_metrics.clone())
                    .getf(&mut host, &items);
                match result {
                    Ok(values) => describe_all(&values),
                    Err(err) => with_error(String::new(), Some(err)),
                }
            }
        };

        let metrics = case_metrics.snapshot();
        self.absorb(metrics);
        Ok(CaseRun { output, metrics })
    }

    fn absorb(&self, snap: MetricsSnapshot) {
        self.totals.set(self.totals.get().merged(snap));
    }
}

fn mode_matches(active_mode: &str, case_mode: &str) -> bool {
    let active = active_mode.to_ascii_lowercase();
    let case = case_mode.to_ascii_lowercase();
    case == active || case == "both"
}

fn with_error(mut text: String, err: Option<transput_core::TransputError>) -> String {
    if let Some(err) = err {
        text.push_str(&format!("<error:{}>", err.tag()));
    }
    text
}

/// Read values rendered for comparison: strings unquoted, others as in
/// diagnostics.
fn describe_all(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::Str(s) => s.clone(),
            Value::Char(c) => c.to_string(),
            other => other.describe(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured_log::SharedBuffer;
    use crate::verify::Verdict;

    fn set(cases: &str) -> FixtureSet {
        FixtureSet::from_json(&format!(
            r#"{{"version": "v1", "family": "smoke", "cases": [{cases}]}}"#
        ))
        .unwrap()
    }

    #[test]
    fn strict_runner_executes_matching_cases() {
        let fixture = set(
            r#"{"name": "w", "section": "mould", "direction": "write",
                "format": {"picture": {"integral": {"digits": "zzd"}}},
                "values": [{"int": 42}], "expected_output": " 42", "mode": "strict"},
               {"name": "l", "section": "mould", "direction": "write",
                "format": {"picture": {"integral": {"digits": "d"}}},
                "values": [{"int": 42}], "expected_output": "*", "mode": "lenient"}"#,
        );
        let strict = TestRunner::new("smoke", "strict").run(&fixture);
        assert_eq!(strict.len(), 1);
        assert!(strict[0].passed(), "{:?}", strict[0].diff);
    }

    #[test]
    fn recovery_mode_changes_outcome() {
        let fixture = set(
            r#"{"name": "overflow", "section": "errors", "direction": "write",
                "format": {"collection": [
                    {"picture": {"integral": {"digits": "d"}}},
                    {"insertion": {"literal": "."}}]},
                "values": [{"int": 42}], "expected_output": "*.", "mode": "both"}"#,
        );
        let lenient = TestRunner::new("errors", "lenient").run(&fixture);
        assert!(lenient[0].passed(), "{:?}", lenient[0].diff);
        assert_eq!(lenient[0].case_name, "overflow [lenient]");

        let strict = TestRunner::new("errors", "strict").run(&fixture);
        assert_eq!(strict[0].verdict, Verdict::Mismatch);
        assert_eq!(strict[0].actual, "*<error:value_error>");
        assert_eq!(strict[0].error_tag.as_deref(), Some("value_error"));
    }

    #[test]
    fn read_cases_join_values() {
        let fixture = set(
            r#"{"name": "r", "section": "read", "direction": "read",
                "format": {"collection": [
                    {"picture": {"integral": {"digits": "dd"}}},
                    {"picture": {"str": {"frames": "aa"}}}]},
                "input": "07ab", "modes": ["int", "str"],
                "expected_output": "7, ab", "mode": "both"}"#,
        );
        let runner = TestRunner::new("read", "strict");
        let results = runner.run(&fixture);
        assert!(results[0].passed(), "{:?}", results[0].diff);
        assert_eq!(runner.metrics().pictures_read, 2);
    }

    #[test]
    fn broken_case_is_reported_not_panicked() {
        let fixture = set(
            r#"{"name": "bad", "section": "x", "direction": "write",
                "format": {"picture": {"nonsense": 1}},
                "expected_output": "", "mode": "both"}"#,
        );
        let results = TestRunner::new("x", "strict").run(&fixture);
        assert_eq!(results[0].verdict, Verdict::Broken);
        assert!(results[0].diff.as_deref().unwrap().starts_with("case 'bad'"));
    }

    #[test]
    fn logged_run_emits_one_record_per_case() {
        let fixture = set(
            r#"{"name": "w", "section": "mould", "direction": "write",
                "format": {"picture": {"general": {}}},
                "values": [{"bool": true}], "expected_output": "T", "mode": "both"},
               {"name": "x", "section": "mould", "direction": "write",
                "format": {"picture": {"general": {}}},
                "values": [{"bool": true}], "expected_output": "F", "mode": "both"}"#,
        );
        let buffer = SharedBuffer::default();
        let mut log = LogEmitter::new(Box::new(buffer.clone()), "smoke", "run-1");
        let results = TestRunner::new("smoke", "strict")
            .run_logged(&fixture, &mut log)
            .unwrap();
        log.flush().unwrap();
        assert!(results[0].passed());
        let text = buffer.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""outcome":"pass""#));
        assert!(!lines[0].contains("details"));
        assert!(lines[1].contains(r#""verdict":"mismatch""#));
    }

    struct FullDisk;

    impl std::io::Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn log_write_failure_stops_the_run() {
        let fixture = set(
            r#"{"name": "w", "section": "mould", "direction": "write",
                "format": {"picture": {"general": {}}},
                "values": [{"bool": true}], "expected_output": "T", "mode": "both"}"#,
        );
        let mut log = LogEmitter::new(Box::new(FullDisk), "smoke", "run-2");
        let err = TestRunner::new("smoke", "strict")
            .run_logged(&fixture, &mut log)
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
