//! Trial event types.
//!
//! Events are small value types emitted at trial and frame boundaries.
//! They carry just enough data to monitor a long generation run.

use serde::{Deserialize, Serialize};

/// An event emitted while generating a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialEvent {
    /// Trial index.
    pub trial: u32,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Run started.
    RunBegin {
        scenario: String,
        first_trial: u32,
        num_trials: u32,
    },

    /// Trial setup commands were sent.
    TrialBegin {
        /// Number of objects in the static section.
        object_count: usize,
    },

    /// A response batch lacked an expected record; the frame is retried.
    FrameRetry {
        frame: u32,
        /// Record kind that was missing.
        missing: String,
        /// Consecutive retries so far for this frame.
        attempt: u32,
    },

    /// A placement routine ran out of attempts and kept its last sample.
    PlacementFallback { attempts: u32 },

    /// Trial finished and its archive was published.
    TrialEnd {
        frames: u32,
        /// True if the frame cap ended the trial.
        timed_out: bool,
        /// Wall-clock time for the trial (seconds).
        wall_time: f64,
    },

    /// The trial's archive already existed.
    TrialSkipped,

    /// The trial failed and nothing was published for it. The run stops.
    TrialFailed { error: String },

    /// Run finished.
    RunEnd { trials_written: u32 },
}

impl TrialEvent {
    pub fn new(trial: u32, kind: EventKind) -> Self {
        Self { trial, kind }
    }
}
