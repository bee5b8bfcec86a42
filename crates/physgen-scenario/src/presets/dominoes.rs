//! A probe pushed along a collision axis toward a target, optionally
//! through a row of middle objects.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord, FLEX_LIBRARY};
use physgen_protocol::{Command, ResponseBatch};
use physgen_types::{Color, ObjectId, PhysgenError, PhysgenResult, Vector3};
use physgen_writer::{LabelValue, PhysicsBackend, RigidParams, ScenarioValue};

use crate::context::{RigidSpec, TrialContext};
use crate::presets::drop::object_params;
use crate::presets::{aim_camera, choose, resolve_models, rgb, validate_rgb};
use crate::sampling::{
    planar_direction, random_color, AvatarPlacement, Range, RigidParamRanges, XyzSpec,
};
use crate::scenario::{Scenario, TargetTracker};
use crate::scene::box_room;

/// Probe colors are kept at least this far from the target color.
pub(crate) const COLOR_EXCLUSION: f32 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DominoesConfig {
    pub library: String,
    pub target_objects: Vec<String>,
    pub probe_objects: Vec<String>,
    /// Defaults to the target list.
    pub middle_objects: Option<Vec<String>>,
    pub num_middle_objects: u32,
    pub target_scale: XyzSpec,
    pub target_rotation: XyzSpec,
    /// Defaults to the target scale.
    pub middle_scale: Option<XyzSpec>,
    /// Yaw range of middle objects, in degrees.
    pub middle_rotation: Range,
    pub middle_color: Option<[f32; 3]>,
    pub probe_scale: XyzSpec,
    pub probe_mass: Range,
    /// Push magnitude as a multiple of the probe mass.
    pub force_scale: Range,
    /// Push yaw in degrees from the collision axis.
    pub force_angle: Range,
    /// Push point relative to the probe, in units of its scale.
    pub force_offset: Vector3,
    pub force_offset_jitter: f32,
    pub collision_axis_length: f32,
    pub spacing_jitter: f32,
    /// Add the target far away and destroy it immediately.
    pub remove_target: bool,
    pub color: Option<[f32; 3]>,
    pub monochrome: bool,
    pub physics: RigidParamRanges,
    pub camera: AvatarPlacement,
}

impl Default for DominoesConfig {
    fn default() -> Self {
        Self {
            library: FLEX_LIBRARY.to_string(),
            target_objects: vec!["cube".into()],
            probe_objects: vec!["sphere".into()],
            middle_objects: None,
            num_middle_objects: 0,
            target_scale: XyzSpec::fixed(0.1, 0.5, 0.25),
            target_rotation: XyzSpec::fixed(0.0, 0.0, 0.0),
            middle_scale: None,
            middle_rotation: Range::new(-60.0, 60.0),
            middle_color: None,
            probe_scale: XyzSpec::fixed(0.2, 0.2, 0.2),
            probe_mass: Range::new(2.0, 7.0),
            force_scale: Range::new(4.0, 10.0),
            force_angle: Range::new(-30.0, 30.0),
            force_offset: Vector3::new(0.0, 0.75, 0.0),
            force_offset_jitter: 0.0,
            collision_axis_length: 1.0,
            spacing_jitter: 0.25,
            remove_target: false,
            color: None,
            monochrome: false,
            physics: RigidParamRanges::default(),
            camera: AvatarPlacement {
                radius: Range::fixed(1.25),
                height: Range::new(0.25, 1.0),
                angle: Range::new(0.0, 180.0),
            },
        }
    }
}

impl DominoesConfig {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        self.axis().validate(libraries)?;
        if let Some(middle) = &self.middle_objects {
            resolve_models(libraries, &self.library, middle, "middle objects")?;
        }
        if let Some(scale) = &self.middle_scale {
            scale.validate("middle scale")?;
        }
        self.middle_rotation.validate("middle rotation")?;
        validate_rgb(self.middle_color, "middle color")?;
        if !(0.0..1.0).contains(&self.spacing_jitter) {
            return Err(PhysgenError::InvalidConfig(
                "spacing jitter must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn axis(&self) -> CollisionAxis {
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
            match_probe_color: self.monochrome,
            physics: self.physics,
            camera: self.camera,
        }
    }
}

/// Target, probe and push parameters shared with the towers preset.
#[derive(Debug, Clone)]
pub(crate) struct CollisionAxis {
    pub library: String,
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
    pub length: f32,
    pub remove_target: bool,
    pub color: Option<[f32; 3]>,
    pub match_probe_color: bool,
    pub physics: RigidParamRanges,
    pub camera: AvatarPlacement,
}

/// What the axis setup placed.
pub(crate) struct AxisLayout {
    /// `None` when the target was removed.
    pub target_id: Option<ObjectId>,
    pub target_scale: Vector3,
    pub target_color: Color,
    pub probe_scale: Vector3,
    pub probe_color: Color,
    pub commands: Vec<Command>,
}

impl CollisionAxis {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        resolve_models(libraries, &self.library, &self.target_objects, "target objects")?;
        resolve_models(libraries, &self.library, &self.probe_objects, "probe objects")?;
        self.target_scale.validate("target scale")?;
        self.target_rotation.validate("target rotation")?;
        self.probe_scale.validate("probe scale")?;
        self.probe_mass.validate("probe mass")?;
        self.force_scale.validate("force scale")?;
        self.force_angle.validate("force angle")?;
        if self.length <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "collision axis length must be positive".into(),
            ));
        }
        if self.force_offset_jitter < 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "force offset jitter must be non-negative".into(),
            ));
        }
        validate_rgb(self.color, "color")?;
        self.physics.validate()?;
        self.camera.validate()
    }

    /// Places the target at `+L/2` and the probe at `-L/2`, then pushes
    /// the probe along the axis.
    pub fn place(
        &self,
        ctx: &mut TrialContext<'_>,
        targets: &[ModelRecord],
        probes: &[ModelRecord],
    ) -> PhysgenResult<AxisLayout> {
        let half = 0.5 * self.length;

        let target = choose(ctx.rng, targets)?;
        let target_scale = self.target_scale.sample(ctx.rng);
        let target_color = match self.color {
            Some(c) => rgb(c),
            None => random_color(ctx.rng, None, 0.0),
        };
        let target_rotation = self.target_rotation.sample(ctx.rng);
        let params = object_params(ctx, target, &self.physics, false);
        let (target_id, mut commands) = ctx.add_rigid_object(RigidSpec {
            record: target,
            position: if self.remove_target {
                Vector3::new(half, 10.0, 10.0)
            } else {
                Vector3::new(half, 0.0, 0.0)
            },
            rotation: target_rotation,
            scale: if self.remove_target {
                Vector3::ZERO
            } else {
                target_scale
            },
            color: Some(target_color),
            params,
        });
        let target_id = if self.remove_target {
            commands.extend(ctx.destroy_object(target_id));
            None
        } else {
            Some(target_id)
        };

        let probe = choose(ctx.rng, probes)?;
        let probe_scale = self.probe_scale.sample(ctx.rng);
        let probe_color = if self.match_probe_color {
            target_color
        } else {
            random_color(ctx.rng, Some(target_color), COLOR_EXCLUSION)
        };
        let probe_mass = self.probe_mass.sample(ctx.rng);
        let sampled = self.physics.sample(ctx.rng);
        let probe_position = Vector3::new(-half, 0.0, 0.0);
        let (probe_id, probe_commands) = ctx.add_rigid_object(RigidSpec {
            record: probe,
            position: probe_position,
            rotation: Vector3::ZERO,
            scale: probe_scale,
            color: Some(probe_color),
            params: RigidParams {
                mass: probe_mass,
                ..sampled
            },
        });
        commands.extend(probe_commands);

        let magnitude = self.force_scale.scaled(probe_mass).sample(ctx.rng);
        let force = planar_direction(self.force_angle.sample(ctx.rng)) * magnitude;
        let jitter = Range::new(-self.force_offset_jitter, self.force_offset_jitter);
        let offset = Vec3::from(self.force_offset) * Vec3::from(probe_scale);
        let push_position = Vec3::from(probe_position)
            + offset
            + Vec3::new(
                jitter.sample(ctx.rng),
                jitter.sample(ctx.rng),
                jitter.sample(ctx.rng),
            );
        commands.push(Command::ApplyForceAtPosition {
            force: force.into(),
            position: push_position.into(),
            id: probe_id,
        });

        ctx.record("target_type", ScenarioValue::Str(target.name.clone()));
        ctx.record("target_rotation", ScenarioValue::Vec3(target_rotation));
        ctx.record("probe_type", ScenarioValue::Str(probe.name.clone()));
        ctx.record("probe_mass", ScenarioValue::F32(probe_mass));
        ctx.record("push_force", ScenarioValue::Vec3(force.into()));
        ctx.record("push_position", ScenarioValue::Vec3(push_position.into()));

        Ok(AxisLayout {
            target_id,
            target_scale,
            target_color,
            probe_scale,
            probe_color,
            commands,
        })
    }
}

pub struct Dominoes {
    config: DominoesConfig,
    axis: CollisionAxis,
    targets: Vec<ModelRecord>,
    probes: Vec<ModelRecord>,
    middles: Vec<ModelRecord>,
    tracker: TargetTracker,
}

impl Dominoes {
    pub fn new(config: DominoesConfig, libraries: &LibrarySet) -> PhysgenResult<Self> {
        config.validate(libraries)?;
        let axis = config.axis();
        let targets = resolve_models(libraries, &config.library, &config.target_objects, "target objects")?;
        let middles = match &config.middle_objects {
            Some(names) => resolve_models(libraries, &config.library, names, "middle objects")?,
            None => targets.clone(),
        };
        Ok(Self {
            probes: resolve_models(libraries, &config.library, &config.probe_objects, "probe objects")?,
            targets,
            middles,
            axis,
            config,
            tracker: TargetTracker::default(),
        })
    }

    /// Middle objects at jittered spacing between probe and target.
    fn place_middle_objects(
        &self,
        ctx: &mut TrialContext<'_>,
        layout: &AxisLayout,
    ) -> PhysgenResult<Vec<Command>> {
        let c = &self.config;
        let mut commands = Vec::new();
        if c.num_middle_objects == 0 {
            return Ok(commands);
        }
        let color = match c.middle_color {
            Some(color) => rgb(color),
            None if c.monochrome => layout.probe_color,
            None => random_color(ctx.rng, None, 0.0),
        };
        let half = 0.5 * c.collision_axis_length;
        let spacing = c.collision_axis_length / (c.num_middle_objects as f32 + 1.0);
        let spacing_jitter = Range::new(1.0 - c.spacing_jitter, 1.0 + c.spacing_jitter);
        let min_offset = -half + layout.probe_scale.x;
        let max_offset = half - layout.target_scale.x;
        let scale_spec = c.middle_scale.unwrap_or(c.target_scale);

        let mut offset = -half;
        let mut middle_type = None;
        for m in 0..c.num_middle_objects {
            offset += spacing * spacing_jitter.sample(ctx.rng);
            offset = offset.max(min_offset).min(max_offset);
            if offset >= max_offset {
                tracing::debug!(placed = m, "No room left for middle objects");
                break;
            }
            let record = choose(ctx.rng, &self.middles)?;
            let scale = scale_spec.sample(ctx.rng);
            let rotation = Vector3::new(0.0, c.middle_rotation.sample(ctx.rng), 0.0);
            let params = object_params(ctx, record, &c.physics, false);
            let (_, middle) = ctx.add_rigid_object(RigidSpec {
                record,
                position: Vector3::new(offset, 0.0, 0.0),
                rotation,
                scale,
                color: Some(color),
                params,
            });
            commands.extend(middle);
            middle_type = Some(record.name.clone());
        }
        if let Some(name) = middle_type {
            ctx.record("middle_type", ScenarioValue::Str(name));
        }
        Ok(commands)
    }
}

impl Scenario for Dominoes {
    fn name(&self) -> &'static str {
        "dominoes"
    }

    fn backend(&self) -> PhysicsBackend {
        PhysicsBackend::Rigidbodies
    }

    fn scene_commands(&self) -> Vec<Command> {
        box_room(8.0)
    }

    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>> {
        let mut layout = self.axis.place(ctx, &self.targets, &self.probes)?;
        let mut commands = std::mem::take(&mut layout.commands);
        commands.extend(self.place_middle_objects(ctx, &layout)?);

        let position = self.config.camera.sample(ctx.rng, Vector3::ZERO);
        commands.extend(aim_camera(position, Vector3::new(0.0, 0.5, 0.0)));

        match layout.target_id {
            Some(id) => self.tracker.track(id),
            None => self.tracker.clear(),
        }
        Ok(commands)
    }

    fn is_done(&mut self, _batch: &ResponseBatch, frame: u32) -> bool {
        frame > 250
    }

    fn accepts_sleep_hint(&self, frame: u32) -> bool {
        frame < 300
    }

    fn frame_labels(&mut self, batch: &ResponseBatch, _frame: u32) -> Vec<(String, LabelValue)> {
        self.tracker.labels(batch)
    }
}
