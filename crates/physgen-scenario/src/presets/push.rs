//! Two or three objects scattered on the floor; one is pushed at another.

use glam::{Quat, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord, FLEX_LIBRARY};
use physgen_protocol::{Command, ResponseBatch};
use physgen_types::constants::PLACEMENT_ATTEMPTS;
use physgen_types::{ObjectId, PhysgenError, PhysgenResult, Vector3};
use physgen_writer::{LabelValue, PhysicsBackend, RigidParams, ScenarioValue};

use crate::context::{RigidSpec, TrialContext};
use crate::presets::resolve_models;
use crate::sampling::{
    place_with_retry, random_color, random_point_in_circle, AvatarPlacement, Range,
    RigidParamRanges,
};
use crate::scenario::{Scenario, TargetTracker};
use crate::scene::box_room;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PushConfig {
    pub library: String,
    /// Candidate models. Empty allows every model in the library.
    pub objects: Vec<String>,
    pub min_objects: u32,
    pub max_objects: u32,
    /// Radius of the disc objects are placed in.
    pub placement_radius: f32,
    /// Multiplier on each model's unit scale.
    pub scale: Range,
    /// Yaw range in degrees.
    pub rotation: Range,
    pub force: Range,
    /// Yaw jitter of the push direction, in degrees.
    pub force_angle_jitter: f32,
    pub physics: RigidParamRanges,
    pub camera: AvatarPlacement,
    /// Pitch and yaw jitter of the camera, in degrees.
    pub camera_jitter: f32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            library: FLEX_LIBRARY.to_string(),
            objects: Vec::new(),
            min_objects: 2,
            max_objects: 3,
            placement_radius: 2.0,
            scale: Range::new(0.8, 1.1),
            rotation: Range::new(-90.0, 90.0),
            force: Range::new(20.0, 60.0),
            force_angle_jitter: 5.0,
            physics: RigidParamRanges {
                mass: Range::new(1.0, 5.0),
                ..RigidParamRanges::default()
            },
            camera: AvatarPlacement {
                radius: Range::new(0.9, 1.5),
                height: Range::new(0.5, 1.25),
                angle: Range::new(0.0, 360.0),
            },
            camera_jitter: 5.0,
        }
    }
}

impl PushConfig {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        let records = resolve_models(libraries, &self.library, &self.objects, "objects")?;
        if self.min_objects < 2 || self.min_objects > self.max_objects {
            return Err(PhysgenError::InvalidConfig(format!(
                "object count range [{}, {}] needs at least two objects",
                self.min_objects, self.max_objects
            )));
        }
        if records.len() < self.max_objects as usize {
            return Err(PhysgenError::InvalidConfig(format!(
                "{} distinct models needed, {} selected",
                self.max_objects,
                records.len()
            )));
        }
        if self.placement_radius <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "placement radius must be positive".into(),
            ));
        }
        self.scale.validate("scale")?;
        self.rotation.validate("rotation")?;
        self.force.validate("force")?;
        self.physics.validate()?;
        self.camera.validate()
    }
}

pub struct Push {
    config: PushConfig,
    records: Vec<ModelRecord>,
    tracker: TargetTracker,
    target: Option<ObjectId>,
}

impl Push {
    pub fn new(config: PushConfig, libraries: &LibrarySet) -> PhysgenResult<Self> {
        config.validate(libraries)?;
        Ok(Self {
            records: resolve_models(libraries, &config.library, &config.objects, "objects")?,
            config,
            tracker: TargetTracker::default(),
            target: None,
        })
    }
}

impl Scenario for Push {
    fn name(&self) -> &'static str {
        "push"
    }

    fn backend(&self) -> PhysicsBackend {
        PhysicsBackend::Rigidbodies
    }

    fn scene_commands(&self) -> Vec<Command> {
        let mut commands = box_room(4.8);
        commands.insert(
            2,
            Command::SetFocusDistance {
                focus_distance: 1.25,
            },
        );
        commands
    }

    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>> {
        let c = &self.config;
        let count = ctx.rng.gen_range(c.min_objects..=c.max_objects) as usize;
        let chosen: Vec<&ModelRecord> = self.records.choose_multiple(ctx.rng, count).collect();

        let mut commands = Vec::new();
        // Placed objects as (position, keep-out radius).
        let mut placed: Vec<(Vector3, f32)> = Vec::new();
        let mut ids = Vec::with_capacity(count);
        for record in chosen.iter().copied() {
            let scale = record.unit_scale() * c.scale.sample(ctx.rng);
            let rng = &mut *ctx.rng;
            let placement = place_with_retry(
                PLACEMENT_ATTEMPTS,
                || random_point_in_circle(rng, c.placement_radius, Vector3::ZERO),
                |p| placed.iter().all(|(q, r)| p.distance(*q) > *r),
            );
            if placement.fell_back {
                ctx.note_placement_fallback();
            }
            let position = placement.value;
            placed.push((position, scale));

            let rotation = Vector3::new(0.0, c.rotation.sample(ctx.rng), 0.0);
            let color = random_color(ctx.rng, None, 0.0);
            let params: RigidParams = c.physics.sample(ctx.rng);
            let (id, object) = ctx.add_rigid_object(RigidSpec {
                record,
                position,
                rotation,
                scale: Vector3::splat(scale),
                color: Some(color),
                params,
            });
            commands.extend(object);
            ids.push(id);
        }

        let (pusher, target) = match ids.as_slice() {
            [pusher, target, ..] => (*pusher, *target),
            _ => {
                return Err(PhysgenError::InvalidConfig(
                    "push needs at least two objects".into(),
                ))
            }
        };

        // Push the first object toward the second, off by a small yaw.
        let toward = Vec3::from(placed[1].0) - Vec3::from(placed[0].0);
        let jitter = Range::new(-c.force_angle_jitter, c.force_angle_jitter).sample(ctx.rng);
        let direction = Quat::from_rotation_y(jitter.to_radians()) * toward.normalize_or_zero();
        let magnitude = c.force.sample(ctx.rng);
        commands.push(Command::ApplyForceToObject {
            force: Vector3::from(direction * magnitude),
            id: pusher,
        });

        let camera = c.camera.sample(ctx.rng, Vector3::ZERO);
        commands.push(Command::TeleportAvatarTo { position: camera });
        commands.push(Command::LookAt {
            id: target,
            use_centroid: true,
        });
        let tilt = Range::new(-c.camera_jitter, c.camera_jitter);
        for axis in ["pitch", "yaw"] {
            commands.push(Command::RotateSensorContainerBy {
                axis: axis.to_string(),
                angle: tilt.sample(ctx.rng),
            });
        }
        commands.push(Command::FocusOnObject { object_id: target });

        let names: Vec<String> = chosen.iter().map(|r| r.name.clone()).collect();
        ctx.record("object_types", ScenarioValue::Str(names.join(",")));
        ctx.record("push_force", ScenarioValue::F32(magnitude));
        ctx.record("pusher_id", ScenarioValue::I32(pusher.raw()));
        ctx.record("target_id", ScenarioValue::I32(target.raw()));

        self.target = Some(target);
        self.tracker.track(target);
        Ok(commands)
    }

    fn per_frame_commands(
        &mut self,
        _batch: &ResponseBatch,
        _frame: u32,
        _ctx: &mut TrialContext<'_>,
    ) -> Vec<Command> {
        self.target
            .map(|object_id| vec![Command::FocusOnObject { object_id }])
            .unwrap_or_default()
    }

    fn is_done(&mut self, _batch: &ResponseBatch, frame: u32) -> bool {
        frame > 300
    }

    fn frame_labels(&mut self, batch: &ResponseBatch, _frame: u32) -> Vec<(String, LabelValue)> {
        self.tracker.labels(batch)
    }
}
