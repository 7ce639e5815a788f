//! The transput channel.
//!
//! A [`Transput`] borrows one file exclusively and owns the frame stack of
//! the formats currently driving it. Statement-level calls (`putf`, `getf`)
//! open and close frames around a list of items; nested calls made by the
//! host while a count or sub-format is evaluated push their own frames and
//! leave the stack as they found it.

use std::sync::Arc;

use crate::config::TransputConfig;
use crate::error::{Result, TransputError};
use crate::file::TransputFile;
use crate::format::{EnvHandle, FormatText};
use crate::frame::FrameStack;
use crate::host::Host;
use crate::insertion::InsertOp;
use crate::metrics::TransputMetrics;
use crate::picture::{ChoiceKind, Count, Pattern, PatternKind};
use crate::selector::{PictureRef, Selection};
use crate::stringify::{Refusal, Rendering};
use crate::trace::{TraceEvent, TraceSink};
use crate::value::{Mode, Value};

/// Which way characters flow for insertions met while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// One item of a formatted write.
#[derive(Debug, Clone, PartialEq)]
pub enum TransputItem {
    Format(FormatText),
    Value(Value),
}

/// One item of a formatted read: a format, or the mode of the next value.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadItem {
    Format(FormatText),
    Value(Mode),
}

/// Formatted transput over one file.
pub struct Transput<'f> {
    pub(crate) file: &'f mut dyn TransputFile,
    pub(crate) frames: FrameStack,
    pub(crate) config: TransputConfig,
    pub(crate) direction: Direction,
    metrics: Arc<TransputMetrics>,
    trace: Option<Arc<dyn TraceSink>>,
}

impl<'f> Transput<'f> {
    /// Channel with default configuration.
    pub fn new(file: &'f mut dyn TransputFile) -> Self {
        Self::with_config(file, TransputConfig::default())
    }

    pub fn with_config(file: &'f mut dyn TransputFile, config: TransputConfig) -> Self {
        Self {
            file,
            frames: FrameStack::new(),
            config,
            direction: Direction::Write,
            metrics: Arc::new(TransputMetrics::new()),
            trace: None,
        }
    }

    #[must_use]
    pub fn with_trace(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Share counters with other channels.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<TransputMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn config(&self) -> &TransputConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<TransputMetrics> {
        &self.metrics
    }

    /// Number of open frames.
    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// The underlying file.
    pub fn file(&mut self) -> &mut dyn TransputFile {
        &mut *self.file
    }

    pub(crate) fn trace(&self, event: TraceEvent) {
        if let Some(sink) = &self.trace {
            sink.record(&event);
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Write `items`: each format item replaces the current format, each
    /// value is written through the next picture.
    pub fn putf(&mut self, host: &mut dyn Host, items: &[TransputItem]) -> Result<()> {
        self.statement(Direction::Write, |chan| {
            let mut current = None;
            for item in items {
                match item {
                    TransputItem::Format(format) => {
                        if let Some(id) = current.take() {
                            chan.close(host, id)?;
                        }
                        current = Some(chan.open(format.clone())?);
                    }
                    TransputItem::Value(value) => {
                        if current.is_none() {
                            return Err(TransputError::FormatUndefined);
                        }
                        chan.write_value(host, value)?;
                    }
                }
            }
            if let Some(id) = current {
                chan.close(host, id)?;
            }
            Ok(())
        })
    }

    /// Read one value per mode item, in order.
    pub fn getf(&mut self, host: &mut dyn Host, items: &[ReadItem]) -> Result<Vec<Value>> {
        self.statement(Direction::Read, |chan| {
            let mut current = None;
            let mut values = Vec::new();
            for item in items {
                match item {
                    ReadItem::Format(format) => {
                        if let Some(id) = current.take() {
                            chan.close(host, id)?;
                        }
                        current = Some(chan.open(format.clone())?);
                    }
                    ReadItem::Value(mode) => {
                        if current.is_none() {
                            return Err(TransputError::FormatUndefined);
                        }
                        values.push(chan.read_value(host, *mode)?);
                    }
                }
            }
            if let Some(id) = current {
                chan.close(host, id)?;
            }
            Ok(values)
        })
    }

    /// Run `body` in `direction`; on error every frame it opened is dropped.
    fn statement<T>(
        &mut self,
        direction: Direction,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let base = self.frames.len();
        let saved = std::mem::replace(&mut self.direction, direction);
        let result = body(self);
        if result.is_err() {
            self.abort_to(base);
        }
        self.direction = saved;
        result
    }

    pub(crate) fn abort_to(&mut self, base: usize) {
        while self.frames.len() > base {
            let depth = self.frames.len();
            self.frames.pop();
            self.trace(TraceEvent::FrameClosed { depth });
        }
    }

    /// Write `value` through the next picture of the open format.
    pub fn write_value(&mut self, host: &mut dyn Host, value: &Value) -> Result<()> {
        let saved = std::mem::replace(&mut self.direction, Direction::Write);
        let result = self
            .require_pattern(host)
            .and_then(|pic| self.write_picture(host, &pic, value));
        self.direction = saved;
        result
    }

    /// Read a value of `mode` through the next picture of the open format.
    pub fn read_value(&mut self, host: &mut dyn Host, mode: Mode) -> Result<Value> {
        let saved = std::mem::replace(&mut self.direction, Direction::Read);
        let result = self
            .require_pattern(host)
            .and_then(|pic| self.read_picture(host, &pic, mode));
        self.direction = saved;
        result
    }

    pub(crate) fn require_pattern(&mut self, host: &mut dyn Host) -> Result<PictureRef> {
        self.next_pattern(host, Selection::Required)?
            .ok_or(TransputError::FormatUndefined)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Render `value` with one picture.
    pub fn write_picture(&mut self, host: &mut dyn Host, pic: &PictureRef, value: &Value) -> Result<()> {
        let pattern = pic.shared_pattern();
        let env = pic.env();
        let mode = value.mode();
        match &*pattern {
            Pattern::Integral(p) if mode.is_integral() => self.write_integral(host, p, env, value),
            Pattern::Real(p) => match *value {
                // A complex value is straightened into two reals.
                Value::Complex(re, im) => {
                    self.write_real(host, p, env, &Value::Real(re))?;
                    let next = self.require_pattern(host)?;
                    self.write_picture(host, &next, &Value::Real(im))
                }
                _ if mode.is_numeric() => self.write_real(host, p, env, value),
                _ => self.mismatch(mode, PatternKind::Real),
            },
            Pattern::Complex(p) if mode.is_numeric() || mode == Mode::Complex => {
                self.write_complex(host, p, env, value)
            }
            Pattern::Bits(p) if mode == Mode::Bits => self.write_bits(host, p, env, value),
            Pattern::Choice(p) if choice_accepts(p.kind, mode) => self.write_choice(host, p, env, value),
            Pattern::Str(p) if matches!(mode, Mode::Str | Mode::Char) => {
                self.write_string(host, p, env, value)
            }
            Pattern::General(p) => self.write_general(host, p, env, value),
            Pattern::CStyle(p) if crate::cstyle::accepts(p.kind, mode) => {
                self.write_cstyle(host, p, env, value)
            }
            other => self.mismatch(mode, other.kind()),
        }
    }

    /// Parse a value of `mode` with one picture.
    pub fn read_picture(&mut self, host: &mut dyn Host, pic: &PictureRef, mode: Mode) -> Result<Value> {
        let pattern = pic.shared_pattern();
        let env = pic.env();
        let value = match &*pattern {
            Pattern::Integral(p) if mode.is_integral() => self.read_integral(host, p, env, mode)?,
            Pattern::Real(p) if mode == Mode::Complex => {
                let re = self.read_real(host, p, env, Mode::Real)?;
                let next = self.require_pattern(host)?;
                let im = self.read_picture(host, &next, Mode::Real)?;
                Value::Complex(real_part(&re), real_part(&im))
            }
            Pattern::Real(p) if matches!(mode, Mode::Real | Mode::LongReal) => {
                self.read_real(host, p, env, mode)?
            }
            Pattern::Complex(p) if mode == Mode::Complex => self.read_complex(host, p, env)?,
            Pattern::Bits(p) if mode == Mode::Bits => self.read_bits(host, p, env)?,
            Pattern::Choice(p) if choice_accepts(p.kind, mode) => self.read_choice(host, p, env)?,
            Pattern::Str(p) if matches!(mode, Mode::Str | Mode::Char) => {
                self.read_string(host, p, env, mode)?
            }
            Pattern::General(p) => self.read_general(host, p, env, mode)?,
            Pattern::CStyle(p) if crate::cstyle::accepts(p.kind, mode) => {
                self.read_cstyle(host, p, env, mode)?
            }
            other => {
                self.mismatch(mode, other.kind())?;
                return zero_value(host, mode);
            }
        };
        TransputMetrics::inc(&self.metrics.pictures_read);
        Ok(value)
    }

    fn mismatch(&mut self, mode: Mode, pattern: PatternKind) -> Result<()> {
        self.format_error(TransputError::PatternMismatch { mode, pattern })
    }

    // -----------------------------------------------------------------------
    // Errors and shared helpers
    // -----------------------------------------------------------------------

    /// Evaluate a count for the picture environment `env`.
    pub(crate) fn eval_count(&mut self, host: &mut dyn Host, count: Count, env: EnvHandle) -> Result<u64> {
        match count {
            Count::Static(n) => Ok(u64::from(n)),
            Count::Dynamic(expr) => {
                let n = host.eval_int(expr, env, self)?;
                u64::try_from(n).map_err(|_| TransputError::ReplicatorInvalid { count: n })
            }
        }
    }

    /// Offer a value error to the file; `Ok` when it is to be recovered.
    pub(crate) fn value_error(
        &mut self,
        pattern: PatternKind,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<()> {
        let value = value.into();
        let reason = reason.into();
        TransputMetrics::inc(&self.metrics.value_errors);
        let recovered = self.file.on_value_error() || self.config.recovery.recovers();
        self.trace(TraceEvent::ValueError {
            pattern,
            value: value.clone(),
            reason: reason.clone(),
            recovered,
        });
        if recovered {
            Ok(())
        } else {
            Err(TransputError::value(pattern, value, reason))
        }
    }

    /// Offer a format error to the file; `Ok` when it is to be recovered.
    pub(crate) fn format_error(&mut self, err: TransputError) -> Result<()> {
        TransputMetrics::inc(&self.metrics.format_errors);
        let recovered = self.file.on_format_error();
        self.trace(TraceEvent::FormatError {
            kind: err.tag().to_string(),
            recovered,
        });
        if recovered { Ok(()) } else { Err(err) }
    }

    /// Write a finished rendering, or the error placeholder when it failed.
    pub(crate) fn emit_rendering(
        &mut self,
        rendering: Rendering<Vec<InsertOp>>,
        pattern: PatternKind,
        value: &Value,
    ) -> Result<()> {
        match rendering {
            Ok(ops) => {
                self.put_ops(&ops)?;
                TransputMetrics::inc(&self.metrics.pictures_written);
                Ok(())
            }
            Err(Refusal::Unfit { width, reason }) => {
                let placeholder = self.config.placeholder(width);
                self.file.put_str(&placeholder);
                self.value_error(pattern, value.describe(), reason)
            }
            Err(Refusal::Failed(err)) => Err(err),
        }
    }

    pub(crate) fn note_recovery(&self, reduced: bool) {
        if reduced {
            TransputMetrics::inc(&self.metrics.fraction_recoveries);
        }
    }
}

fn choice_accepts(kind: ChoiceKind, mode: Mode) -> bool {
    matches!(
        (kind, mode),
        (ChoiceKind::Boolean, Mode::Bool) | (ChoiceKind::Integral, Mode::Int)
    )
}

fn real_part(value: &Value) -> f64 {
    match *value {
        Value::Real(x) => x,
        Value::Int(v) => v as f64,
        _ => 0.0,
    }
}

/// Value handed back when a mismatched read is recovered.
fn zero_value(host: &mut dyn Host, mode: Mode) -> Result<Value> {
    Ok(match mode {
        Mode::Int => Value::Int(0),
        Mode::Real => Value::Real(0.0),
        Mode::Complex => Value::Complex(0.0, 0.0),
        Mode::Bits => Value::Bits(0),
        Mode::Bool => Value::Bool(false),
        Mode::Char => Value::Char(' '),
        Mode::Str => Value::Str(String::new()),
        Mode::LongInt | Mode::LongReal => {
            let arith = host
                .long_arithmetic()
                .ok_or_else(|| TransputError::Host("long value without long arithmetic".into()))?;
            let handle = arith.value_of("0", 10)?;
            if mode == Mode::LongInt {
                Value::LongInt(handle)
            } else {
                Value::LongReal(handle)
            }
        }
    })
}
