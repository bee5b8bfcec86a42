//! The scenario strategy trait.

use glam::Vec3;

use physgen_protocol::{Command, ResponseBatch};
use physgen_types::{ObjectId, PhysgenResult, Vector3};
use physgen_writer::labels::{TARGET_DELTA_POSITION, TARGET_HAS_MOVED};
use physgen_writer::{LabelValue, PhysicsBackend};

use crate::context::TrialContext;

/// One kind of procedurally varied trial.
///
/// The runner calls [`Scenario::trial_commands`] once per trial with a
/// fresh context, then alternates [`Scenario::per_frame_commands`] and
/// [`Scenario::is_done`] until the trial ends. Per-trial state a scenario
/// keeps between those calls must be reset in `trial_commands`.
pub trait Scenario: Send {
    fn name(&self) -> &'static str;

    fn backend(&self) -> PhysicsBackend;

    /// Camera field of view in degrees.
    fn field_of_view(&self) -> f32 {
        55.0
    }

    /// Scenario part of the once-per-process scene setup.
    fn scene_commands(&self) -> Vec<Command>;

    /// Builds the objects of a new trial and returns the commands that
    /// create them.
    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>>;

    /// Commands for frame `frame`, computed from the previous response.
    fn per_frame_commands(
        &mut self,
        _batch: &ResponseBatch,
        _frame: u32,
        _ctx: &mut TrialContext<'_>,
    ) -> Vec<Command> {
        Vec::new()
    }

    /// Scenario-specific termination predicate.
    fn is_done(&mut self, batch: &ResponseBatch, frame: u32) -> bool;

    /// Whether the writer's sleep hint may end the trial at `frame`.
    fn accepts_sleep_hint(&self, _frame: u32) -> bool {
        true
    }

    /// Extra labels for frame `frame`.
    fn frame_labels(&mut self, _batch: &ResponseBatch, _frame: u32) -> Vec<(String, LabelValue)> {
        Vec::new()
    }
}

/// Displacement above which the target counts as moved.
pub const TARGET_MOVE_THRESHOLD: f32 = 0.01;

/// Follows one object's position relative to where it was first seen.
#[derive(Debug, Clone, Default)]
pub struct TargetTracker {
    target: Option<ObjectId>,
    origin: Option<Vec3>,
}

impl TargetTracker {
    /// Starts tracking `id`, forgetting the previous target.
    pub fn track(&mut self, id: ObjectId) {
        self.target = Some(id);
        self.origin = None;
    }

    /// Stops tracking, e.g. when the target was removed from the trial.
    pub fn clear(&mut self) {
        self.target = None;
        self.origin = None;
    }

    pub fn target(&self) -> Option<ObjectId> {
        self.target
    }

    /// Displacement since the first frame the target was reported.
    pub fn delta(&mut self, batch: &ResponseBatch) -> Option<Vec3> {
        let id = self.target?;
        let position = Vec3::from(batch.transform_of(id)?.position);
        let origin = *self.origin.get_or_insert(position);
        Some(position - origin)
    }

    /// `target_delta_position` and `target_has_moved` for this frame.
    pub fn labels(&mut self, batch: &ResponseBatch) -> Vec<(String, LabelValue)> {
        let Some(delta) = self.delta(batch) else {
            return Vec::new();
        };
        vec![
            (
                TARGET_DELTA_POSITION.to_string(),
                LabelValue::Vec3(Vector3::from(delta)),
            ),
            (
                TARGET_HAS_MOVED.to_string(),
                LabelValue::Bool(delta.length() > TARGET_MOVE_THRESHOLD),
            ),
        ]
    }
}
