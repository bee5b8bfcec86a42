//! Flex: drape a cloth over a heavy solid object.

use rand::Rng;
use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord, FLEX_LIBRARY, SPECIAL_LIBRARY};
use physgen_protocol::{Command, FlexContainer, ResponseBatch};
use physgen_types::{ObjectId, PhysgenError, PhysgenResult, Vector3};
use physgen_writer::{PhysicsBackend, ScenarioValue};

use crate::context::{ClothParams, FlexPlacement, SolidParams, TrialContext};
use crate::presets::{choose, resolve_models};
use crate::sampling::Range;
use crate::scenario::Scenario;
use crate::scene::flex_room;

/// Model of the cloth sheet in the special library.
pub const CLOTH_MODEL: &str = "cloth_square";

const OBJECT_POSITION: Vector3 = Vector3::new(-1.2, 0.0, -1.6);
const CLOTH_POSITION: Vector3 = Vector3::new(-1.2, 2.0, -1.6);
const CAMERA_POSITION: Vector3 = Vector3::new(2.0, 1.0, 1.0);
const CAMERA_AIM: Vector3 = Vector3::new(-1.2, 0.5, -1.6);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrapingConfig {
    pub library: String,
    /// Objects to drape. Empty allows every model in the library.
    pub objects: Vec<String>,
    pub object_mass_scale: f32,
    pub particle_spacing: f32,
    /// Frames stepped to let the object settle before the cloth is added.
    pub settle_frames: u32,
    /// Range of the cloth's tether, bend and stretch stiffness.
    pub cloth_stiffness: Range,
    pub container: FlexContainer,
    pub time_step: f32,
}

impl Default for DrapingConfig {
    fn default() -> Self {
        Self {
            library: FLEX_LIBRARY.to_string(),
            objects: Vec::new(),
            object_mass_scale: 500.0,
            particle_spacing: 0.035,
            settle_frames: 100,
            cloth_stiffness: Range::new(0.5, 1.0),
            container: FlexContainer {
                collision_distance: 0.001,
                static_friction: 1.0,
                dynamic_friction: 1.0,
                iteration_count: 12,
                substep_count: 12,
                radius: 0.1875,
                solid_rest: None,
                damping: 0.25,
                drag: 0.0,
            },
            time_step: 0.03,
        }
    }
}

/// Checks the cloth stiffness range and the solid actor settings shared by
/// the cloth presets.
pub(crate) fn validate_cloth(
    libraries: &LibrarySet,
    stiffness: &Range,
    particle_spacing: f32,
) -> PhysgenResult<()> {
    libraries.record(SPECIAL_LIBRARY, CLOTH_MODEL)?;
    stiffness.validate("cloth stiffness")?;
    if stiffness.min < 0.0 || stiffness.max > 1.0 {
        return Err(PhysgenError::InvalidConfig(
            "cloth stiffness must lie in [0, 1]".into(),
        ));
    }
    if particle_spacing <= 0.0 {
        return Err(PhysgenError::InvalidConfig(
            "particle spacing must be positive".into(),
        ));
    }
    Ok(())
}

/// Cloth parameters with sampled stiffnesses.
pub(crate) fn sample_cloth<R: Rng + ?Sized>(rng: &mut R, mass_scale: f32, stiffness: &Range) -> ClothParams {
    ClothParams {
        mass_scale,
        tether_stiffness: stiffness.sample(rng),
        bend_stiffness: stiffness.sample(rng),
        stretch_stiffness: stiffness.sample(rng),
        ..ClothParams::default()
    }
}

impl DrapingConfig {
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        resolve_models(libraries, &self.library, &self.objects, "objects")?;
        validate_cloth(libraries, &self.cloth_stiffness, self.particle_spacing)?;
        if self.object_mass_scale <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "object mass scale must be positive".into(),
            ));
        }
        if self.time_step <= 0.0 {
            return Err(PhysgenError::InvalidConfig(
                "time step must be positive".into(),
            ));
        }
        Ok(())
    }
}

pub struct Draping {
    config: DrapingConfig,
    objects: Vec<ModelRecord>,
    cloth: ModelRecord,
    cloth_id: Option<ObjectId>,
}

impl Draping {
    pub fn new(config: DrapingConfig, libraries: &LibrarySet) -> PhysgenResult<Self> {
        config.validate(libraries)?;
        Ok(Self {
            objects: resolve_models(libraries, &config.library, &config.objects, "objects")?,
            cloth: libraries.record(SPECIAL_LIBRARY, CLOTH_MODEL)?.clone(),
            config,
            cloth_id: None,
        })
    }
}

impl Scenario for Draping {
    fn name(&self) -> &'static str {
        "draping"
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
        commands.push(Command::SetTimeStep {
            time_step: self.config.time_step,
        });
        commands
    }

    fn trial_commands(&mut self, ctx: &mut TrialContext<'_>) -> PhysgenResult<Vec<Command>> {
        let c = &self.config;
        ctx.registry_mut().set_container(c.container.clone());

        let mut commands = vec![
            Command::TeleportAvatarTo {
                position: CAMERA_POSITION,
            },
            Command::LookAtPosition {
                position: CAMERA_AIM,
            },
        ];

        let record = choose(ctx.rng, &self.objects)?;
        let rotation = Vector3::new(0.0, ctx.rng.gen_range(0.0..360.0), 0.0);
        let (_, solid) = ctx.add_solid_object(
            FlexPlacement {
                record,
                position: OBJECT_POSITION,
                rotation,
                scale: None,
            },
            SolidParams {
                mass_scale: c.object_mass_scale,
                particle_spacing: c.particle_spacing,
                ..SolidParams::default()
            },
        );
        commands.extend(solid);
        commands.push(Command::StepPhysics {
            frames: c.settle_frames,
        });

        let params = sample_cloth(ctx.rng, 1.0, &c.cloth_stiffness);
        let (cloth_id, cloth) = ctx.add_cloth_object(
            FlexPlacement {
                record: &self.cloth,
                position: CLOTH_POSITION,
                rotation: Vector3::ZERO,
                scale: None,
            },
            params,
        );
        commands.extend(cloth);

        ctx.record("object_type", ScenarioValue::Str(record.name.clone()));
        ctx.record("object_rotation", ScenarioValue::Vec3(rotation));
        self.cloth_id = Some(cloth_id);
        Ok(commands)
    }

    fn per_frame_commands(
        &mut self,
        _batch: &ResponseBatch,
        _frame: u32,
        _ctx: &mut TrialContext<'_>,
    ) -> Vec<Command> {
        self.cloth_id
            .map(|object_id| vec![Command::FocusOnObject { object_id }])
            .unwrap_or_default()
    }

    fn is_done(&mut self, _batch: &ResponseBatch, frame: u32) -> bool {
        frame > 150
    }
}
