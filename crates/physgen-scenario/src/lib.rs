//! # physgen-scenario
//!
//! Scenario strategies: each preset decides what a trial contains and
//! emits the commands that build it.
//!
//! - [`Scenario`] is the strategy trait the runner drives.
//! - [`TrialContext`] carries the RNG, ID allocator and per-trial object
//!   registry, and builds the add-object command sequences.
//! - [`presets`] holds the configurable presets and [`ScenarioConfig`].
//! - [`sampling`] has ranges, colors, camera placement and bounded
//!   placement retry.

pub mod context;
pub mod presets;
pub mod sampling;
pub mod scenario;
pub mod scene;

pub use context::{ObjectRegistry, TrialContext};
pub use presets::{ScenarioConfig, ScenarioKind};
pub use sampling::{Range, XyzSpec};
pub use scenario::{Scenario, TargetTracker};
pub use scene::global_scene_commands;
