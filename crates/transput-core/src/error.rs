//! Transput error taxonomy.
//!
//! Every recoverable error is first offered to the matching file hook
//! (`on_value_error` for value errors, `on_format_error` for pattern
//! mismatches and unused pictures). Only a declined error surfaces as a
//! `TransputError` and aborts the statement.

use thiserror::Error;

use crate::picture::PatternKind;
use crate::value::Mode;

/// Errors raised by the transput engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransputError {
    /// The outermost format ran out of pictures and restarting it found none.
    #[error("format exhausted: no picture left for the next value")]
    FormatExhausted,
    /// A nil or empty format was opened.
    #[error("format undefined: format is nil or has no items")]
    FormatUndefined,
    /// The value's mode is incompatible with the selected picture.
    #[error("pattern mismatch: {mode} value cannot be transput with a {pattern} pattern")]
    PatternMismatch { mode: Mode, pattern: PatternKind },
    /// The value is unrepresentable with the picture, or input text is malformed.
    #[error("value error in {pattern} pattern for {value}: {reason}")]
    ValueError {
        pattern: PatternKind,
        value: String,
        reason: String,
    },
    /// A dynamic replication count evaluated to a negative number.
    #[error("replicator invalid: count {count} is negative")]
    ReplicatorInvalid { count: i64 },
    /// Pictures were left in the format when the statement finished.
    #[error("unused pictures: {pattern} picture left at end of transput")]
    UnusedPictures { pattern: PatternKind },
    /// Input ended while a picture still needed characters.
    #[error("end of file while reading {pattern} pattern")]
    EndOfFile { pattern: PatternKind },
    /// Embedded formats nested deeper than the configured limit.
    #[error("frame depth {depth} exceeds limit {limit}")]
    FrameDepthExceeded { depth: usize, limit: usize },
    /// A back-skip or column move left the current line.
    #[error("record pointer cannot move by {offset} within the current line")]
    PositionOutOfLine { offset: i64 },
    /// A frame was closed out of LIFO order.
    #[error("frame {found} closed while frame {expected} is on top")]
    FrameOrder { expected: usize, found: usize },
    /// The host evaluator failed.
    #[error("host evaluation failed: {0}")]
    Host(String),
}

impl TransputError {
    pub(crate) fn value(pattern: PatternKind, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValueError {
            pattern,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Short stable tag used in trace events and harness expectations.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::FormatExhausted => "format_exhausted",
            Self::FormatUndefined => "format_undefined",
            Self::PatternMismatch { .. } => "pattern_mismatch",
            Self::ValueError { .. } => "value_error",
            Self::ReplicatorInvalid { .. } => "replicator_invalid",
            Self::UnusedPictures { .. } => "unused_pictures",
            Self::EndOfFile { .. } => "end_of_file",
            Self::FrameDepthExceeded { .. } => "frame_depth_exceeded",
            Self::PositionOutOfLine { .. } => "position_out_of_line",
            Self::FrameOrder { .. } => "frame_order",
            Self::Host(_) => "host",
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TransputError>;
