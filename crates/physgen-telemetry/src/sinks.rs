//! Pluggable event sinks.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::events::{EventKind, TrialEvent};

/// Trait for event consumers.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &TrialEvent);

    /// Called when the run ends.
    fn finalize(&mut self) {}

    fn name(&self) -> &str;
}

/// Collects events into a shared `Vec` for tests and inspection.
///
/// Clones share the same buffer, so a test can keep one handle while the
/// bus owns the other.
#[derive(Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<TrialEvent>>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the collected events.
    pub fn events(&self) -> Vec<TrialEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &TrialEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Forwards events to `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn handle(&mut self, event: &TrialEvent) {
        match &event.kind {
            EventKind::FrameRetry { .. } | EventKind::PlacementFallback { .. } => {
                tracing::warn!(trial = event.trial, event = ?event.kind, "trial_event");
            }
            EventKind::TrialEnd {
                frames,
                timed_out,
                wall_time,
            } => {
                tracing::info!(
                    trial = event.trial,
                    frames,
                    timed_out,
                    wall_time = format!("{wall_time:.2}s"),
                    "Trial complete"
                );
            }
            EventKind::TrialFailed { error } => {
                tracing::error!(trial = event.trial, error = %error, "Trial failed");
            }
            kind => tracing::debug!(trial = event.trial, event = ?kind, "trial_event"),
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}

/// Writes one JSON object per event to any writer (e.g. a log file).
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn handle(&mut self, event: &TrialEvent) {
        let written = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to write telemetry event");
        }
    }

    fn finalize(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::warn!(error = %e, "failed to flush telemetry sink");
        }
    }

    fn name(&self) -> &str {
        "json_lines_sink"
    }
}
