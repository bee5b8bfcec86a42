//! # physgen-runner
//!
//! Drives a scenario against a Simulation Host and writes one archive per
//! trial.
//!
//! - [`TrialRunner`] runs one trial: setup, the frame loop with bounded
//!   retry of incomplete responses, termination and cleanup.
//! - [`DatasetDriver`] runs many trials, resumes an interrupted run and
//!   publishes each archive atomically.

pub mod driver;
pub mod trial;

pub use driver::{
    existing_trials, publish, publish_by_copy, trial_file_name, DatasetDriver, DriverOptions,
    RunMetadata, RunSummary, METADATA_FILE,
};
pub use trial::{RunnerSettings, TrialRunner, TrialSummary};
