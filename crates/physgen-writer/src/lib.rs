//! # physgen-writer
//!
//! The Dataset Writer: defines the on-disk layout of one trial and maps
//! each response batch onto it.
//!
//! - [`StaticSection`] is written once per trial, before any frame.
//! - [`TrialWriter::write_frame`] joins records to the trial's object IDs
//!   and returns the sleep hint.
//! - [`TrialLabels`] are computed afterwards from a finished archive.

pub mod backend;
pub mod frame;
pub mod labels;
pub mod layout;
pub mod static_data;
pub mod trial_writer;

pub use backend::PhysicsBackend;
pub use frame::{sleep_hint, FrameData};
pub use labels::{FrameLabels, LabelValue, TrialLabels};
pub use static_data::{FlexActor, ObjectStatic, RigidParams, ScenarioValue, StaticSection};
pub use trial_writer::TrialWriter;
