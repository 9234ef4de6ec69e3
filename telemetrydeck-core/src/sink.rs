//! Diagnostic sinks
//!
//! Delivery failures happen on background tasks where nobody is waiting
//! for a result. They are written as human-readable lines to the
//! client's [`DiagnosticSink`]. The default sink discards everything.
//!
//! A sink is shared by every in-flight send, so implementations must be
//! safe to call from several tasks at once.

use std::sync::{Arc, Mutex};

/// Write-only, line-oriented diagnostic output
pub trait DiagnosticSink: Send + Sync {
    /// Record one line of text
    fn write_line(&self, line: &str);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// Sink that drops every line
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn write_line(&self, _line: &str) {}
}

/// Sink that forwards lines to `tracing` at warn level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::warn!(target: "telemetrydeck::diagnostics", "{}", line);
    }
}

/// Sink that keeps every line in memory
///
/// Clones share the same buffer, so one handle can be given to the
/// client while another is used to read what was written.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Discard all captured lines
    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().map(|l| l.is_empty()).unwrap_or(true)
    }
}

impl DiagnosticSink for MemorySink {
    fn write_line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
