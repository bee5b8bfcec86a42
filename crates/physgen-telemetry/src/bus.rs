//! Event bus with pluggable sinks.
//!
//! Generation is single-threaded, so events simply queue on the bus until
//! the next trial boundary. The runner flushes when a trial ends, failed or
//! not, and the driver finalizes when the run ends. A bus that is dropped
//! without being finalized finalizes itself, so sinks such as
//! [`JsonLinesSink`](crate::sinks::JsonLinesSink) still see the events of a
//! run that ended in an error.

use crate::events::TrialEvent;
use crate::sinks::EventSink;

/// Queues trial events and hands them to every sink at trial boundaries.
pub struct EventBus {
    pending: Vec<TrialEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    /// A disabled bus drops events.
    enabled: bool,
    finalized: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            sinks: Vec::new(),
            enabled: true,
            finalized: false,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues an event. No-op on a disabled bus.
    pub fn emit(&mut self, event: TrialEvent) {
        if self.enabled {
            self.pending.push(event);
        }
    }

    /// Events queued since the last flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Hands every queued event to the sinks, in emission order. Returns
    /// the number of events dispatched.
    pub fn flush(&mut self) -> usize {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for sink in &mut self.sinks {
                sink.handle(event);
            }
        }
        events.len()
    }

    /// Flushes, then finalizes every sink. Only the first call finalizes.
    pub fn finalize(&mut self) {
        self.flush();
        if self.finalized {
            return;
        }
        self.finalized = true;
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.finalize();
    }
}
