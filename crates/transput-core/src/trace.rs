//! Structured trace events.
//!
//! A channel with a sink attached reports frame lifecycle and error events
//! as [`TraceEvent`] records. [`JsonlTrace`] writes one JSON object per line;
//! [`MemoryTrace`] keeps them for inspection in tests.

use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;

use crate::picture::PatternKind;

/// One engine event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    FrameOpened { depth: usize, embedded: bool },
    FrameClosed { depth: usize },
    FormatRestarted { depth: usize },
    FormatReturned { depth: usize },
    PatternSelected { depth: usize, pattern: PatternKind },
    ValueError {
        pattern: PatternKind,
        value: String,
        reason: String,
        recovered: bool,
    },
    FormatError { kind: String, recovered: bool },
}

/// Receiver of trace events.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: &TraceEvent);
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryTrace {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemoryTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TraceSink for MemoryTrace {
    fn record(&self, event: &TraceEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Writes each event as a JSON line.
pub struct JsonlTrace<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonlTrace<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> TraceSink for JsonlTrace<W> {
    fn record(&self, event: &TraceEvent) {
        // Write errors are dropped.
        if let Ok(line) = serde_json::to_string(event) {
            let mut out = self.out.lock();
            let _ = writeln!(out, "{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_trace_collects_in_order() {
        let trace = MemoryTrace::new();
        trace.record(&TraceEvent::FrameOpened {
            depth: 1,
            embedded: false,
        });
        trace.record(&TraceEvent::FrameClosed { depth: 1 });
        let events = trace.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], TraceEvent::FrameClosed { depth: 1 });
        trace.clear();
        assert!(trace.events().is_empty());
    }

    #[test]
    fn jsonl_trace_writes_tagged_lines() {
        let trace = JsonlTrace::new(Vec::new());
        trace.record(&TraceEvent::FormatRestarted { depth: 1 });
        trace.record(&TraceEvent::PatternSelected {
            depth: 2,
            pattern: PatternKind::Choice,
        });
        let text = String::from_utf8(trace.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"event":"format_restarted","depth":1}"#);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "pattern_selected");
        assert_eq!(second["pattern"], "choice");
    }
}
