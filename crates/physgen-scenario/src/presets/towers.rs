//! A tower of cube blocks, optionally capped, knocked over by a probe.

use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord, FLEX_LIBRARY};
use physgen_protocol::{Command, ResponseBatch};
use physgen_types::{ObjectId, PhysgenError, PhysgenResult, Vector3};
use physgen_writer::{LabelValue, PhysicsBackend, RigidParams, ScenarioValue};

use crate::context::{RigidSpec, TrialContext};
use crate::presets::dominoes::{CollisionAxis, COLOR_EXCLUSION};
use crate::presets::{aim_camera, choose, resolve_models};
use crate::sampling::{random_color, AvatarPlacement, Range, RigidParamRanges, XyzSpec};
use crate::scenario::{Scenario, TargetTracker};
use crate::scene::box_room;

const BLOCK_MODEL: &str = "cube";
const CAP_SCALE: f32 = 0.5;
/// Frames to keep recording after the tower has fallen.
const FRAMES_AFTER_FALL: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TowersConfig {
    pub library: String,
    pub num_blocks: u32,
    /// Uniform scale of each block before the gradient is applied.
    pub block_scale: Range,
    /// Scale change per block, larger at the bottom when positive.
    pub block_scale_gradient: f32,
    /// Yaw range of blocks, in degrees.
    pub block_rotation: Range,
    pub block_mass: f32,
    /// Candidate cap models. Empty builds an uncapped tower.
    pub tower_cap: Vec<String>,
    pub spacing_jitter: f32,
    pub target_objects: Vec<String>,
    pub probe_objects: Vec<String>,
    pub target_scale: XyzSpec,
    pub target_rotation: XyzSpec,
    pub probe_scale: XyzSpec,
    pub probe_mass: Range,
    pub force_scale: Range,
    pub force_angle: Range,
    pub force_offset: Vector3,
    pub force_offset_jitter: f32,
    pub collision_axis_length: f32,
    pub remove_target: bool,
    pub color: Option<[f32; 3]>,
    /// Give every block the same color.
    pub monochrome: bool,
    pub physics: RigidParamRanges,
    pub camera: AvatarPlacement,
}

impl Default for TowersConfig {
    fn default() -> Self {
        Self {
            library: FLEX_LIBRARY.to_string(),
            num_blocks: 3,
            block_scale: Range::fixed(0.5),
            block_scale_gradient: 0.0,
            block_rotation: Range::new(-45.0, 45.0),
            block_mass: 4.5,
            tower_cap: vec!["bowl".into()],
            spacing_jitter: 0.25,
            target_objects: vec!["cube".into()],
            probe_objects: vec!["sphere".into()],
            target_scale: XyzSpec::fixed(0.1, 0.5, 0.25),
            target_rotation: XyzSpec::fixed(0.0, 0.0, 0.0),
            probe_scale: XyzSpec::uniform(0.2, 0.4),
            probe_mass: Range::new(2.0, 4.0),
            force_scale: Range::new(4.0, 15.0),
            force_angle: Range::new(-10.0, 10.0),
            force_offset: Vector3::new(0.0, 0.5, 0.0),
            force_offset_jitter: 0.0,
            collision_axis_length: 3.0,
            remove_target: true,
            color: None,
            monochrome: false,
            physics: RigidParamRanges::default(),
            camera: AvatarPlacement {
                radius: Range::fixed(2.5),
                height: Range::new(0.25, 1.0),
                angle: Range::new(0.0, 60.0),
            },
        }
    }
}

impl TowersConfig {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        self.axis().validate(libraries)?;
        libraries.record(&self.library, BLOCK_MODEL)?;
        if !self.tower_cap.is_empty() {
            resolve_models(libraries, &self.library, &self.tower_cap, "tower cap")?;
        }
        if self.num_blocks == 0 {
            return Err(PhysgenError::InvalidConfig(
                "a tower needs at least one block".into(),
            ));
        }
        self.block_scale.validate("block scale")?;
        self.block_rotation.validate("block rotation")?;
        let mid = self.num_blocks as f32 / 2.0;
        let bottom = self.block_scale.min + mid * self.block_scale_gradient;
        let top = self.block_scale.min + (mid - (self.num_blocks - 1) as f32) * self.block_scale_gradient;
        if bottom <= 0.0 || top <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "block scale gradient makes a block scale non-positive".into(),
            ));
        }
        if self.block_mass <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "block mass must be positive".into(),
            ));
        }
        if self.spacing_jitter < 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "spacing jitter must be non-negative".into(),
            ));
        }
        Ok(())
    }

    fn axis(&self) -> CollisionAxis {
        CollisionAxis {
            library: self.library.clone(),
            target_objects: self.target_objects.clone(),
            probe_objects: self.probe_objects.clone(),
            target_scale: self.target_scale,
            target_rotation: self.target_rotation,
            probe_scale: self.probe_scale,
            probe_mass: self.probe_mass,
            force_scale: self.force_scale,
            force_angle: self.force_angle,
            force_offset: self.force_offset,
            force_offset_jitter: self.force_offset_jitter,
            length: self.collision_axis_length,
            remove_target: self.remove_target,
            color: self.color,
            match_probe_color: false,
            physics: self.physics,
            camera: self.camera,
        }
    }

    fn levels(&self) -> f32 {
        self.num_blocks as f32 + if self.tower_cap.is_empty() { 0.0 } else { 1.0 }
    }
}

pub struct Towers {
    config: TowersConfig,
    axis: CollisionAxis,
    targets: Vec<ModelRecord>,
    probes: Vec<ModelRecord>,
    block: ModelRecord,
    caps: Vec<ModelRecord>,
    tracker: TargetTracker,
    /// The highest object and the height it started at.
    top: Option<(ObjectId, f32)>,
    fallen_at: Option<u32>,
}

impl Towers {
    pub fn new(config: TowersConfig, libraries: &LibrarySet) -> PhysgenResult<Self> {
        config.validate(libraries)?;
        let caps = if config.tower_cap.is_empty() {
            Vec::new()
        } else {
            resolve_models(libraries, &config.library, &config.tower_cap, "tower cap")?
        };
        Ok(Self {
            axis: config.axis(),
            targets: resolve_models(libraries, &config.library, &config.target_objects, "target objects")?,
            probes: resolve_models(libraries, &config.library, &config.probe_objects, "probe objects")?,
            block: libraries.record(&config.library, BLOCK_MODEL)?.clone(),
            caps,
            config,
            tracker: TargetTracker::default(),
            top: None,
            fallen_at: None,
        })
    }

    /// Whether the top of the tower is below half its starting height.
    fn has_fallen(&self, batch: &ResponseBatch) -> bool {
        let Some((id, start)) = self.top else {
            return false;
        };
        batch
            .transform_of(id)
            .is_some_and(|t| t.position[1] < 0.5 * start)
    }
}

impl Scenario for Towers {
    fn name(&self) -> &'static str {
        "towers"
    }

    fn backend(&self) -> PhysicsBackend {
        PhysicsBackend::Rigidbodies
    }

    fn scene_commands(&self) -> Vec<Command> {
        box_room(8.0)
    }

    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>> {
        self.top = None;
        self.fallen_at = None;

        let mut layout = self.axis.place(ctx, &self.targets, &self.probes)?;
        let mut commands = std::mem::take(&mut layout.commands);
        let c = &self.config;

        let shared_color = c
            .monochrome
            .then(|| random_color(ctx.rng, Some(layout.target_color), COLOR_EXCLUSION));
        let mid = c.num_blocks as f32 / 2.0;
        let jitter = Range::new(-c.spacing_jitter, c.spacing_jitter);
        let mut height = 0.0;
        for i in 0..c.num_blocks {
            let s = c.block_scale.sample(ctx.rng) + (mid - i as f32) * c.block_scale_gradient;
            let scale = Vector3::splat(s);
            let color = shared_color.unwrap_or_else(|| {
                random_color(ctx.rng, Some(layout.target_color), COLOR_EXCLUSION)
            });
            let position = Vector3::new(
                scale.x * jitter.sample(ctx.rng),
                height,
                scale.z * jitter.sample(ctx.rng),
            );
            let rotation = Vector3::new(0.0, c.block_rotation.sample(ctx.rng), 0.0);
            let sampled = c.physics.sample(ctx.rng);
            let (id, block) = ctx.add_rigid_object(RigidSpec {
                record: &self.block,
                position,
                rotation,
                scale,
                color: Some(color),
                params: RigidParams {
                    mass: c.block_mass,
                    ..sampled
                },
            });
            commands.extend(block);
            self.top = Some((id, height));
            height += scale.y;
        }

        let cap_type = if self.caps.is_empty() {
            None
        } else {
            let cap = choose(ctx.rng, &self.caps)?;
            let params = c.physics.sample(ctx.rng);
            let (id, cap_commands) = ctx.add_rigid_object(RigidSpec {
                record: cap,
                position: Vector3::new(0.0, height, 0.0),
                rotation: Vector3::ZERO,
                scale: Vector3::splat(CAP_SCALE),
                color: Some(layout.target_color),
                params,
            });
            commands.extend(cap_commands);
            self.top = Some((id, height));
            Some(cap.name.clone())
        };
        ctx.record("use_cap", ScenarioValue::Bool(cap_type.is_some()));
        if let Some(name) = cap_type {
            ctx.record("cap_type", ScenarioValue::Str(name));
        }

        let levels = c.levels();
        let camera = c.camera.with_height_scale(0.5 * levels);
        let position = camera.sample(ctx.rng, Vector3::ZERO);
        commands.extend(aim_camera(position, Vector3::new(0.0, 0.25 * levels, 0.0)));

        match layout.target_id {
            Some(id) => self.tracker.track(id),
            None => self.tracker.clear(),
        }
        Ok(commands)
    }

    fn is_done(&mut self, batch: &ResponseBatch, frame: u32) -> bool {
        if self.fallen_at.is_none() && self.has_fallen(batch) {
            tracing::debug!(frame, "Tower has fallen");
            self.fallen_at = Some(frame);
        }
        frame > 350
            || self
                .fallen_at
                .is_some_and(|fallen| frame >= fallen + FRAMES_AFTER_FALL)
    }

    fn accepts_sleep_hint(&self, frame: u32) -> bool {
        frame < 300
    }

    fn frame_labels(&mut self, batch: &ResponseBatch, _frame: u32) -> Vec<(String, LabelValue)> {
        let mut labels = self.tracker.labels(batch);
        labels.push((
            "tower_fallen".to_string(),
            LabelValue::Bool(self.fallen_at.is_some() || self.has_fallen(batch)),
        ));
        labels
    }
}
