//! Flex: drag an object by pulling on a corner of the cloth it rests on.

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord, FLEX_LIBRARY, SPECIAL_LIBRARY};
use physgen_protocol::{Command, FlexContainer, ResponseBatch};
use physgen_types::{ObjectId, PhysgenError, PhysgenResult, Vector3};
use physgen_writer::{PhysicsBackend, ScenarioValue};

use crate::context::{FlexPlacement, SolidParams, TrialContext};
use crate::presets::draping::{sample_cloth, validate_cloth, CLOTH_MODEL};
use crate::presets::{choose, resolve_models};
use crate::sampling::{AvatarPlacement, Range};
use crate::scenario::Scenario;
use crate::scene::flex_room;

const CORNERS: [Vec3; 4] = [
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, -1.0),
    Vec3::new(-1.0, 0.0, -1.0),
    Vec3::new(-1.0, 0.0, 1.0),
];
const CLOTH_POSITION: Vector3 = Vector3::new(0.0, 1.0, 0.0);
const OBJECT_POSITION: Vector3 = Vector3::new(0.0, 0.2, 0.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DraggingConfig {
    pub library: String,
    /// Objects placed on the cloth. Empty allows every model in the library.
    pub objects: Vec<String>,
    pub object_mass_scale: Range,
    pub particle_spacing: f32,
    pub cloth_mass_scale: f32,
    pub cloth_stiffness: Range,
    pub settle_frames: u32,
    /// Number of frames the drag force is applied for.
    pub min_force_frames: u32,
    pub max_force_frames: u32,
    /// Particles within this distance of the corner are pulled.
    pub corner_radius: Range,
    /// Force per particle per frame. Negative pulls toward the corner.
    pub force: Range,
    pub camera: AvatarPlacement,
    pub container: FlexContainer,
}

impl Default for DraggingConfig {
    fn default() -> Self {
        Self {
            library: FLEX_LIBRARY.to_string(),
            objects: Vec::new(),
            object_mass_scale: Range::new(0.25, 1.0),
            particle_spacing: 0.035,
            cloth_mass_scale: 10.0,
            cloth_stiffness: Range::new(0.5, 1.0),
            settle_frames: 100,
            min_force_frames: 5,
            max_force_frames: 10,
            corner_radius: Range::new(0.5, 0.85),
            force: Range::new(-55.0, -30.0),
            camera: AvatarPlacement {
                radius: Range::new(1.8, 2.1),
                height: Range::new(1.0, 1.3),
                angle: Range::new(0.0, 360.0),
            },
            container: FlexContainer {
                collision_distance: 0.001,
                static_friction: 1.0,
                dynamic_friction: 1.0,
                iteration_count: 5,
                substep_count: 8,
                radius: 0.1875,
                solid_rest: Some(0.03),
                damping: 0.0,
                drag: 0.0,
            },
        }
    }
}

impl DraggingConfig {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        resolve_models(libraries, &self.library, &self.objects, "objects")?;
        validate_cloth(libraries, &self.cloth_stiffness, self.particle_spacing)?;
        self.object_mass_scale.validate("object mass scale")?;
        if self.object_mass_scale.min <= 0.0 || self.cloth_mass_scale <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "mass scales must be positive".into(),
            ));
        }
        if self.min_force_frames > self.max_force_frames {
            return Err(PhysgenError::InvalidConfig(format!(
                "force frame range [{}, {}] is invalid",
                self.min_force_frames, self.max_force_frames
            )));
        }
        self.corner_radius.validate("corner radius")?;
        self.force.validate("force")?;
        self.camera.validate()
    }
}

/// The drag sampled for one trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub cloth: ObjectId,
    pub corner: Vec3,
    pub radius: f32,
    pub force: f32,
    pub frames: u32,
}

impl Drag {
    /// Per-particle forces as `[fx, fy, fz, particle_index, ...]`.
    ///
    /// Only particles within `radius` of the corner are pulled; each is
    /// pushed along the corner-to-particle direction scaled by `force`.
    pub fn particle_forces(&self, particles: &[[f32; 4]]) -> Vec<f32> {
        let mut forces = Vec::new();
        for (index, p) in particles.iter().enumerate() {
            let offset = Vec3::new(p[0], p[1], p[2]) - self.corner;
            let distance = offset.length();
            if distance > self.radius || distance <= f32::EPSILON {
                continue;
            }
            let force = offset / distance * self.force;
            forces.extend_from_slice(&[force.x, force.y, force.z, index as f32]);
        }
        forces
    }
}

pub struct Dragging {
    config: DraggingConfig,
    objects: Vec<ModelRecord>,
    cloth: ModelRecord,
    drag: Option<Drag>,
}

impl Dragging {
    pub fn new(config: DraggingConfig, libraries: &LibrarySet) -> PhysgenResult<Self> {
        config.validate(libraries)?;
        Ok(Self {
            objects: resolve_models(libraries, &config.library, &config.objects, "objects")?,
            cloth: libraries.record(SPECIAL_LIBRARY, CLOTH_MODEL)?.clone(),
            config,
            drag: None,
        })
    }

    /// The drag of the current trial.
    pub fn drag(&self) -> Option<&Drag> {
        self.drag.as_ref()
    }
}

impl Scenario for Dragging {
    fn name(&self) -> &'static str {
        "dragging"
    }

    fn backend(&self) -> PhysicsBackend {
        PhysicsBackend::Flex
    }

    fn field_of_view(&self) -> f32 {
        65.0
    }

    fn scene_commands(&self) -> Vec<Command> {
        let mut commands = flex_room();
        commands.push(Command::CreateFlexContainer(self.config.container.clone()));
        commands
    }

    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>> {
        let c = &self.config;
        ctx.registry_mut().set_container(c.container.clone());

        let frames = ctx.rng.gen_range(c.min_force_frames..=c.max_force_frames);
        let corner = *CORNERS
            .choose(ctx.rng)
            .ok_or_else(|| PhysgenError::InvalidConfig("no cloth corners".into()))?;
        let radius = c.corner_radius.sample(ctx.rng);
        let force = c.force.sample(ctx.rng);

        let params = sample_cloth(ctx.rng, c.cloth_mass_scale, &c.cloth_stiffness);
        let (cloth_id, mut commands) = ctx.add_cloth_object(
            FlexPlacement {
                record: &self.cloth,
                position: CLOTH_POSITION,
                rotation: Vector3::ZERO,
                scale: None,
            },
            params,
        );
        commands.extend([
            Command::SetKinematicState {
                id: cloth_id,
                is_kinematic: true,
                use_gravity: false,
            },
            Command::StepPhysics {
                frames: c.settle_frames,
            },
        ]);

        let record = choose(ctx.rng, &self.objects)?;
        let rotation = Vector3::new(0.0, ctx.rng.gen_range(0.0..360.0), 0.0);
        let mass_scale = c.object_mass_scale.sample(ctx.rng);
        let (object_id, solid) = ctx.add_solid_object(
            FlexPlacement {
                record,
                position: OBJECT_POSITION,
                rotation,
                scale: None,
            },
            SolidParams {
                mass_scale,
                particle_spacing: c.particle_spacing,
                ..SolidParams::default()
            },
        );
        commands.extend(solid);
        commands.extend([
            Command::SetKinematicState {
                id: object_id,
                is_kinematic: true,
                use_gravity: false,
            },
            Command::StepPhysics {
                frames: c.settle_frames,
            },
            Command::TeleportAvatarTo {
                position: c.camera.sample(ctx.rng, Vector3::ZERO),
            },
            Command::LookAt {
                id: cloth_id,
                use_centroid: true,
            },
        ]);

        ctx.record("object_type", ScenarioValue::Str(record.name.clone()));
        ctx.record("drag_corner", ScenarioValue::Vec3(Vector3::from(corner)));
        ctx.record("drag_radius", ScenarioValue::F32(radius));
        ctx.record("drag_force", ScenarioValue::F32(force));
        ctx.record("drag_frames", ScenarioValue::I32(frames as i32));

        self.drag = Some(Drag {
            cloth: cloth_id,
            corner,
            radius,
            force,
            frames,
        });
        Ok(commands)
    }

    fn per_frame_commands(
        &mut self,
        batch: &ResponseBatch,
        frame: u32,
        _ctx: &mut TrialContext<'_>,
    ) -> Vec<Command> {
        let Some(drag) = self.drag else {
            return Vec::new();
        };
        if frame >= drag.frames {
            return Vec::new();
        }
        let Some(entry) = batch.particles_of(drag.cloth) else {
            tracing::debug!(frame, cloth = %drag.cloth, "No cloth particles this frame");
            return Vec::new();
        };
        let forces_and_ids = drag.particle_forces(&entry.particles);
        if forces_and_ids.is_empty() {
            return Vec::new();
        }
        vec![Command::ApplyForcesToFlexObject {
            id: drag.cloth,
            forces_and_ids,
        }]
    }

    fn is_done(&mut self, _batch: &ResponseBatch, frame: u32) -> bool {
        frame > 150
    }
}
