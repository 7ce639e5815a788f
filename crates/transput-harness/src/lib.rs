//! Conformance harness for transput-core.
//!
//! This crate provides:
//! - Fixture sets: formats, dynamic expression tables, values or input text,
//!   and the expected output, described in JSON
//! - Fixture verify: run each case through the engine under a recovery mode
//! - Report generation: markdown and JSON conformance reports
//! - Structured logging: one JSONL record per executed case

#![forbid(unsafe_code)]

pub mod diff;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use fixtures::{CaseDirection, FixtureCase, FixtureError, FixtureSet};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::{Verdict, VerificationResult, VerificationSummary};
