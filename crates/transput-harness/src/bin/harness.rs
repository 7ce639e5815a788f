//! CLI entrypoint for the transput fixture harness.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use transput_core::{
    EnvHandle, FormatText, JsonlTrace, MemoryFile, MetricsSnapshot, PictureNode, TableHost,
    Transput, TransputConfig, TransputItem, Value, WideArithmetic,
};
use transput_harness::structured_log::{LogEmitter, LogLevel};
use transput_harness::{ConformanceReport, FixtureSet, TestRunner, VerificationSummary};

/// Fixture tooling for transput-core.
#[derive(Debug, Parser)]
#[command(name = "transput-harness")]
#[command(about = "Conformance testing harness for formatted transput")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the engine against fixture files.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown; JSON is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
        /// JSONL log of every executed case.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Recovery mode to test (`strict`, `lenient`, or `both`).
        #[arg(long, default_value = "both")]
        mode: String,
    },
    /// Write values through a format read from a JSON picture tree.
    Render {
        /// Path of the picture tree JSON.
        #[arg(long)]
        format: PathBuf,
        /// JSON array of values, e.g. `[{"int": 7}]`.
        #[arg(long)]
        values: String,
        /// Emit engine trace events on stderr as JSONL.
        #[arg(long)]
        trace: bool,
    },
    /// Print the SHA-256 of every fixture file.
    Digest {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
    },
}

fn modes(mode: &str) -> Result<Vec<&'static str>, String> {
    match mode {
        "strict" => Ok(vec!["strict"]),
        "lenient" => Ok(vec!["lenient"]),
        "both" => Ok(vec!["strict", "lenient"]),
        other => Err(format!(
            "Unsupported mode '{other}', expected strict|lenient|both"
        )),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            report,
            log,
            mode,
        } => {
            let modes = modes(&mode)?;
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let fixture_sets = FixtureSet::load_dir(&fixture)?;
            if fixture_sets.is_empty() {
                return Err(format!("No fixture JSON files found in {}", fixture.display()).into());
            }

            let run_id = format!("{:x}", std::process::id());
            let mut emitter = match &log {
                Some(path) => Some(LogEmitter::to_file(path, "fixture-verify", &run_id)?),
                None => None,
            };
            if let Some(emitter) = emitter.as_mut() {
                emitter.emit(LogLevel::Info, "verify_start")?;
            }

            let mut results = Vec::new();
            let mut metrics = MetricsSnapshot::default();
            for mode in &modes {
                let runner = TestRunner::new("fixture-verify", *mode);
                for (_, set) in &fixture_sets {
                    let set_results = match emitter.as_mut() {
                        Some(emitter) => runner.run_logged(set, emitter)?,
                        None => runner.run(set),
                    };
                    results.extend(set_results);
                }
                metrics = metrics.merged(runner.metrics());
            }

            if let Some(emitter) = emitter.as_mut() {
                emitter.emit(LogLevel::Info, "verify_end")?;
                emitter.flush()?;
            }

            let report_doc = ConformanceReport {
                title: String::from("Transput Fixture Report"),
                mode: modes.join("+"),
                timestamp: format!("{:?}", std::time::SystemTime::now()),
                summary: VerificationSummary::from_results(results),
                metrics,
            };

            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
            );
            for failure in report_doc.summary.failures() {
                eprintln!("{} {}", failure.verdict.label(), failure.case_name);
            }

            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                std::fs::write(report_path.with_extension("json"), report_doc.to_json())?;
            }

            if !report_doc.summary.all_passed() {
                return Err("Fixture verification failed".into());
            }
        }
        Command::Render {
            format,
            values,
            trace,
        } => {
            let tree: PictureNode = serde_json::from_str(&std::fs::read_to_string(&format)?)?;
            let values: Vec<Value> = serde_json::from_str(&values)?;

            let mut items = vec![TransputItem::Format(FormatText::new(&tree, EnvHandle(0)))];
            items.extend(values.into_iter().map(TransputItem::Value));

            let mut host = TableHost::new().with_arithmetic(WideArithmetic::new());
            let mut file = MemoryFile::new();
            let mut chan = Transput::with_config(&mut file, TransputConfig::from_env());
            if trace {
                chan = chan.with_trace(Arc::new(JsonlTrace::new(std::io::stderr())));
            }
            let result = chan.putf(&mut host, &items);
            print!("{}", file.output());
            result?;
        }
        Command::Digest { fixture } => {
            for (path, _) in FixtureSet::load_dir(&fixture)? {
                let digest = transput_harness::fixtures::fixture_digest(&path)?;
                println!("{digest}  {}", path.display());
            }
        }
    }

    Ok(())
}
