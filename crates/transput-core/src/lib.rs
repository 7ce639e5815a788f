//! # transput-core
//!
//! Formatted transput driven by picture formats.
//!
//! A format is a tree of pictures, insertions, replicators and
//! collections. A [`Transput`] channel walks that tree one picture per
//! value, converting values to text on write and text to values on read.
//! Counts and embedded formats are evaluated on demand through a [`Host`],
//! which may itself call back into the channel.

#![deny(unsafe_code)]

pub mod choice;
pub mod config;
pub mod cstyle;
pub mod error;
pub mod file;
pub mod format;
pub mod frame;
pub mod general;
pub mod host;
pub mod insertion;
pub mod metrics;
pub mod mould;
pub mod numeric;
pub mod picture;
pub mod selector;
pub mod sign;
pub mod strings;
pub mod stringify;
pub mod trace;
pub mod transput;
pub mod value;

pub use config::{RecoveryMode, TransputConfig};
pub use error::{Result, TransputError};
pub use file::{MemoryFile, TransputFile};
pub use format::{EnvHandle, FormatText, PictureTree};
pub use frame::FrameId;
pub use host::{Host, LongArithmetic, StaticHost, TableHost, WideArithmetic};
pub use metrics::{MetricsSnapshot, TransputMetrics};
pub use picture::{Count, ExprHandle, Pattern, PatternKind, PictureNode};
pub use selector::{PictureRef, Selection};
pub use trace::{JsonlTrace, MemoryTrace, TraceEvent, TraceSink};
pub use transput::{Direction, ReadItem, Transput, TransputItem};
pub use value::{LongHandle, Mode, Value};
