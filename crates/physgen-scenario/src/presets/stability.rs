//! A stack of primitives of varying stability, nudged at the base.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord, FLEX_LIBRARY};
use physgen_protocol::{Command, ResponseBatch};
use physgen_types::{PhysgenError, PhysgenResult, Vector3};
use physgen_writer::{PhysicsBackend, ScenarioValue};

use crate::context::{RigidSpec, TrialContext};
use crate::presets::aim_camera;
use crate::sampling::{random_color, AvatarPlacement, Range, RigidParamRanges};
use crate::scenario::Scenario;
use crate::scene::box_room;

/// How stable a generated stack is meant to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackType {
    /// Stable objects, any flat-bottomed object on top.
    Stable,
    /// Mostly stable objects, anything on top.
    MaybeStable,
    /// Stable or maybe-stable objects, any flat-bottomed object on top.
    BaseStable,
    /// Anything anywhere.
    Unstable,
}

impl StackType {
    pub fn all() -> &'static [StackType] {
        &[
            StackType::Stable,
            StackType::MaybeStable,
            StackType::BaseStable,
            StackType::Unstable,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            StackType::Stable => "stable",
            StackType::MaybeStable => "maybe_stable",
            StackType::BaseStable => "base_stable",
            StackType::Unstable => "unstable",
        }
    }
}

/// Model groups keyed by how well they support objects above them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilityGroups {
    pub stable: Vec<String>,
    pub maybe_stable: Vec<String>,
    pub base_stable: Vec<String>,
}

impl Default for StabilityGroups {
    fn default() -> Self {
        Self {
            stable: vec!["cube".into(), "cylinder".into(), "pentagon".into()],
            maybe_stable: vec!["bowl".into(), "pipe".into(), "torus".into()],
            base_stable: vec!["cone".into(), "pyramid".into(), "triangular_prism".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilityConfig {
    pub library: String,
    /// Stack types to draw from. Empty draws from all of them.
    pub stack_types: Vec<StackType>,
    pub min_objects: u32,
    pub max_objects: u32,
    pub object_scale: Range,
    pub position_jitter: f32,
    /// Horizontal force range applied to the base object.
    pub base_force: f32,
    /// Pitch and yaw jitter of the camera, in degrees.
    pub camera_jitter: f32,
    /// Every library model outside these groups counts as unstable.
    pub groups: StabilityGroups,
    pub physics: RigidParamRanges,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            library: FLEX_LIBRARY.to_string(),
            stack_types: Vec::new(),
            min_objects: 4,
            max_objects: 7,
            object_scale: Range::new(0.2, 0.23),
            position_jitter: 0.02,
            base_force: 0.05,
            camera_jitter: 5.0,
            groups: StabilityGroups::default(),
            physics: RigidParamRanges::default(),
        }
    }
}

impl StabilityConfig {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        Groups::resolve(&self.library, &self.groups, libraries)?;
        if self.min_objects == 0 || self.min_objects > self.max_objects {
            return Err(PhysgenError::InvalidConfig(format!(
                "object count range [{}, {}] is invalid",
                self.min_objects, self.max_objects
            )));
        }
        self.object_scale.validate("object scale")?;
        if self.object_scale.min <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "object scale must be positive".into(),
            ));
        }
        if self.position_jitter < 0.0 || self.base_force < 0.0 || self.camera_jitter < 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "jitter and force ranges must be non-negative".into(),
            ));
        }
        self.physics.validate()
    }
}

/// Resolved model groups, indexed by [`StackType`].
#[derive(Debug, Clone)]
struct Groups([Vec<ModelRecord>; 4]);

impl Groups {
    fn resolve(library: &str, groups: &StabilityGroups, libraries: &LibrarySet) -> PhysgenResult<Self> {
        let lib = libraries.require(library)?;
        let stable = lib.select(&groups.stable)?;
        let maybe = lib.select(&groups.maybe_stable)?;
        let base = lib.select(&groups.base_stable)?;
        let grouped = [&groups.stable, &groups.maybe_stable, &groups.base_stable];
        let unstable: Vec<ModelRecord> = lib
            .records()
            .iter()
            .filter(|r| !grouped.iter().any(|g| g.contains(&r.name)))
            .cloned()
            .collect();
        let resolved = Groups([stable, maybe, base, unstable]);
        // Every stack type draws non-top objects from stable or maybe-stable.
        if resolved.get(StackType::Stable).is_empty() || resolved.get(StackType::MaybeStable).is_empty() {
            return Err(PhysgenError::InvalidConfig(
                "stable and maybe-stable groups must not be empty".into(),
            ));
        }
        Ok(resolved)
    }

    fn get(&self, kind: StackType) -> &[ModelRecord] {
        let index = match kind {
            StackType::Stable => 0,
            StackType::MaybeStable => 1,
            StackType::BaseStable => 2,
            StackType::Unstable => 3,
        };
        &self.0[index]
    }

    /// A random object from a random non-empty group of `kinds`.
    fn pick<R: Rng + ?Sized>(&self, rng: &mut R, kinds: &[StackType]) -> PhysgenResult<&ModelRecord> {
        let candidates: Vec<StackType> = kinds
            .iter()
            .copied()
            .filter(|k| !self.get(*k).is_empty())
            .collect();
        candidates
            .choose(rng)
            .and_then(|k| self.get(*k).choose(rng))
            .ok_or_else(|| PhysgenError::InvalidConfig("no models to stack".into()))
    }
}

pub struct Stability {
    config: StabilityConfig,
    groups: Groups,
    /// Weights of the groups below the top of a maybe-stable stack.
    maybe_weights: WeightedIndex<u32>,
}

impl Stability {
    pub fn new(config: StabilityConfig, libraries: &LibrarySet) -> PhysgenResult<Self> {
        config.validate(libraries)?;
        let maybe_weights = WeightedIndex::new([4u32, 4, 1, 1])
            .map_err(|e| PhysgenError::InvalidConfig(format!("stack weights: {e}")))?;
        Ok(Self {
            groups: Groups::resolve(&config.library, &config.groups, libraries)?,
            config,
            maybe_weights,
        })
    }

    fn pick_record<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        stack: StackType,
        top: bool,
    ) -> PhysgenResult<&ModelRecord> {
        use StackType::*;
        match (stack, top) {
            (Stable, false) => self.groups.pick(rng, &[Stable]),
            (Stable, true) | (BaseStable, true) => self.groups.pick(rng, &[Stable, MaybeStable, BaseStable]),
            (MaybeStable, false) => {
                let mut kind = StackType::all()[self.maybe_weights.sample(rng)];
                if self.groups.get(kind).is_empty() {
                    kind = Stable;
                }
                self.groups.pick(rng, &[kind])
            }
            (BaseStable, false) => self.groups.pick(rng, &[Stable, MaybeStable]),
            (MaybeStable, true) | (Unstable, _) => self.groups.pick(rng, StackType::all()),
        }
    }
}

impl Scenario for Stability {
    fn name(&self) -> &'static str {
        "stability"
    }

    fn backend(&self) -> PhysicsBackend {
        PhysicsBackend::Rigidbodies
    }

    fn scene_commands(&self) -> Vec<Command> {
        box_room(4.8)
    }

    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>> {
        let c = &self.config;
        let types = if c.stack_types.is_empty() {
            StackType::all()
        } else {
            c.stack_types.as_slice()
        };
        let stack = *types
            .choose(ctx.rng)
            .ok_or_else(|| PhysgenError::InvalidConfig("no stack types".into()))?;
        let count = ctx.rng.gen_range(c.min_objects..=c.max_objects);
        tracing::debug!(stack = stack.name(), count, "Building stack");

        let jitter = Range::new(-c.position_jitter, c.position_jitter);
        let mut commands = Vec::new();
        let mut base = None;
        let mut y = 0.0;
        for i in 0..count {
            let record = self.pick_record(ctx.rng, stack, i + 1 == count)?;
            let scale = c.object_scale.sample(ctx.rng);
            let position = Vector3::new(jitter.sample(ctx.rng), y, jitter.sample(ctx.rng));
            let rotation = Vector3::new(0.0, ctx.rng.gen_range(0.0..360.0), 0.0);
            let color = random_color(ctx.rng, None, 0.0);
            let params = c.physics.sample(ctx.rng);
            let (id, object) = ctx.add_rigid_object(RigidSpec {
                record,
                position,
                rotation,
                scale: Vector3::splat(scale),
                color: Some(color),
                params,
            });
            commands.extend(object);
            base.get_or_insert(id);
            y += record.bounds.top.y * scale;
        }

        let camera = AvatarPlacement {
            radius: Range::new(y, 1.3 * y),
            height: Range::new(y / 4.0, y / 3.0),
            angle: Range::new(0.0, 360.0),
        };
        let position = camera.sample(ctx.rng, Vector3::ZERO);
        commands.extend(aim_camera(position, Vector3::new(0.0, 0.5 * y, 0.0)));
        let tilt = Range::new(-c.camera_jitter, c.camera_jitter);
        for axis in ["pitch", "yaw"] {
            commands.push(Command::RotateSensorContainerBy {
                axis: axis.to_string(),
                angle: tilt.sample(ctx.rng),
            });
        }
        if let Some(id) = base {
            let push = Range::new(-c.base_force, c.base_force);
            commands.push(Command::ApplyForceToObject {
                force: Vector3::new(push.sample(ctx.rng), 0.0, push.sample(ctx.rng)),
                id,
            });
        }

        ctx.record("stack_type", ScenarioValue::Str(stack.name().to_string()));
        ctx.record("stack_height", ScenarioValue::F32(y));
        Ok(commands)
    }

    fn is_done(&mut self, _batch: &ResponseBatch, frame: u32) -> bool {
        frame > 500
    }

    fn accepts_sleep_hint(&self, frame: u32) -> bool {
        frame < 300
    }
}
