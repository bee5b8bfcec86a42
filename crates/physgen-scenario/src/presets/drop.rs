//! Drop a random primitive onto a target primitive at the origin.

use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord, FLEX_LIBRARY};
use physgen_protocol::{Command, ResponseBatch};
use physgen_types::{PhysgenError, PhysgenResult, Vector3};
use physgen_writer::{LabelValue, PhysicsBackend, RigidParams, ScenarioValue};

use crate::context::{RigidSpec, TrialContext};
use crate::presets::{aim_camera, choose, resolve_models, rgb, sample_rotation, validate_rgb};
use crate::sampling::{random_color, AvatarPlacement, Range, RigidParamRanges, XyzSpec};
use crate::scenario::{Scenario, TargetTracker};
use crate::scene::box_room;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DropConfig {
    pub library: String,
    /// Allowed drop models. Empty allows every model in the library.
    pub drop_objects: Vec<String>,
    pub target_objects: Vec<String>,
    /// Release height of the drop object.
    pub height: Range,
    pub drop_scale: XyzSpec,
    pub target_scale: XyzSpec,
    /// Random yaw when unset.
    pub drop_rotation: Option<XyzSpec>,
    pub target_rotation: Option<XyzSpec>,
    /// Horizontal jitter of the release point.
    pub jitter: f32,
    /// Target color. Random when unset.
    pub color: Option<[f32; 3]>,
    /// Give the drop object the target's color.
    pub monochrome: bool,
    /// Use the physics catalog's values where the model has an entry.
    pub catalog_physics: bool,
    pub physics: RigidParamRanges,
    pub camera_distance: f32,
    /// Camera yaw range in degrees.
    pub camera_angle: Range,
    /// Camera height as a fraction of the drop height.
    pub camera_height: Range,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            library: FLEX_LIBRARY.to_string(),
            drop_objects: Vec::new(),
            target_objects: Vec::new(),
            height: Range::new(0.75, 1.25),
            drop_scale: XyzSpec::uniform(0.2, 0.3),
            target_scale: XyzSpec::uniform(0.2, 0.3),
            drop_rotation: None,
            target_rotation: None,
            jitter: 0.2,
            color: None,
            monochrome: false,
            catalog_physics: false,
            physics: RigidParamRanges::default(),
            camera_distance: 1.25,
            camera_angle: Range::fixed(0.0),
            camera_height: Range::new(1.0 / 3.0, 2.0 / 3.0),
        }
    }
}

impl DropConfig {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        resolve_models(libraries, &self.library, &self.drop_objects, "drop objects")?;
        resolve_models(libraries, &self.library, &self.target_objects, "target objects")?;
        self.height.validate("height")?;
        self.drop_scale.validate("drop scale")?;
        self.target_scale.validate("target scale")?;
        if let Some(r) = &self.drop_rotation {
            r.validate("drop rotation")?;
        }
        if let Some(r) = &self.target_rotation {
            r.validate("target rotation")?;
        }
        if self.jitter < 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "jitter must be non-negative".into(),
            ));
        }
        validate_rgb(self.color, "color")?;
        self.physics.validate()?;
        self.camera_angle.validate("camera angle")?;
        self.camera_height.validate("camera height")
    }
}

/// Picks physics values for one object.
pub(crate) fn object_params(
    ctx: &mut TrialContext<'_>,
    record: &ModelRecord,
    ranges: &RigidParamRanges,
    catalog: bool,
) -> RigidParams {
    let from_catalog = if catalog {
        ctx.default_params(record)
    } else {
        None
    };
    from_catalog.unwrap_or_else(|| ranges.sample(ctx.rng))
}

pub struct ObjectDrop {
    config: DropConfig,
    drop_records: Vec<ModelRecord>,
    target_records: Vec<ModelRecord>,
    tracker: TargetTracker,
}

impl ObjectDrop {
    pub fn new(config: DropConfig, libraries: &LibrarySet) -> PhysgenResult<Self> {
        config.validate(libraries)?;
        Ok(Self {
            drop_records: resolve_models(libraries, &config.library, &config.drop_objects, "drop objects")?,
            target_records: resolve_models(
                libraries,
                &config.library,
                &config.target_objects,
                "target objects",
            )?,
            config,
            tracker: TargetTracker::default(),
        })
    }
}

impl Scenario for ObjectDrop {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn backend(&self) -> PhysicsBackend {
        PhysicsBackend::Rigidbodies
    }

    fn scene_commands(&self) -> Vec<Command> {
        box_room(8.0)
    }

    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>> {
        let c = &self.config;

        // Target at the origin.
        let target = choose(ctx.rng, &self.target_records)?;
        let target_scale = c.target_scale.sample(ctx.rng);
        let target_color = match c.color {
            Some(color) => rgb(color),
            None => random_color(ctx.rng, None, 0.0),
        };
        let target_rotation = sample_rotation(c.target_rotation.as_ref(), ctx.rng);
        let params = object_params(ctx, target, &c.physics, c.catalog_physics);
        let (target_id, mut commands) = ctx.add_rigid_object(RigidSpec {
            record: target,
            position: Vector3::ZERO,
            rotation: target_rotation,
            scale: target_scale,
            color: Some(target_color),
            params,
        });

        // Drop object above it.
        let dropped = choose(ctx.rng, &self.drop_records)?;
        let drop_scale = c.drop_scale.sample(ctx.rng);
        let drop_color = if c.monochrome {
            target_color
        } else {
            random_color(ctx.rng, None, 0.0)
        };
        let height = c.height.sample(ctx.rng);
        let jitter = Range::new(-c.jitter, c.jitter);
        let drop_position = Vector3::new(jitter.sample(ctx.rng), height, jitter.sample(ctx.rng));
        let drop_rotation = sample_rotation(c.drop_rotation.as_ref(), ctx.rng);
        let params = object_params(ctx, dropped, &c.physics, c.catalog_physics);
        let (_, drop_commands) = ctx.add_rigid_object(RigidSpec {
            record: dropped,
            position: drop_position,
            rotation: drop_rotation,
            scale: drop_scale,
            color: Some(drop_color),
            params,
        });
        commands.extend(drop_commands);

        let camera = AvatarPlacement {
            radius: Range::fixed(c.camera_distance),
            height: c.camera_height,
            angle: c.camera_angle,
        }
        .with_height_scale(height);
        let position = camera.sample(ctx.rng, Vector3::ZERO);
        commands.extend(aim_camera(position, Vector3::new(0.0, 0.5 * height, 0.0)));

        ctx.record("target_type", ScenarioValue::Str(target.name.clone()));
        ctx.record("drop_type", ScenarioValue::Str(dropped.name.clone()));
        ctx.record("drop_position", ScenarioValue::Vec3(drop_position));
        ctx.record("drop_rotation", ScenarioValue::Vec3(drop_rotation));
        ctx.record("target_rotation", ScenarioValue::Vec3(target_rotation));

        self.tracker.track(target_id);
        Ok(commands)
    }

    fn is_done(&mut self, _batch: &ResponseBatch, frame: u32) -> bool {
        frame > 300
    }

    fn accepts_sleep_hint(&self, frame: u32) -> bool {
        frame < 300
    }

    fn frame_labels(&mut self, batch: &ResponseBatch, _frame: u32) -> Vec<(String, LabelValue)> {
        self.tracker.labels(batch)
    }
}
