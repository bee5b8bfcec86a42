//! # physgen-telemetry
//!
//! Event bus for generation telemetry. The runner and driver emit
//! structured trial events (begin/end, retried exchanges, placement
//! fallbacks, skipped trials) that pluggable sinks consume.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, TrialEvent};
pub use sinks::{EventSink, JsonLinesSink, TracingSink, VecSink};
