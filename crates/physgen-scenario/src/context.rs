//! Per-trial state.
//!
//! A [`TrialContext`] is created fresh at the start of every trial. It owns
//! the [`ObjectRegistry`] for that trial and borrows the process-scoped RNG,
//! ID allocator and catalogs, so nothing leaks from one trial to the next
//! except the allocator's position.

use rand_chacha::ChaCha8Rng;

use physgen_catalog::{LibrarySet, ModelRecord, PhysicsCatalog};
use physgen_protocol::{Command, FlexContainer};
use physgen_types::{Color, IdAllocator, ObjectId, Vector3};
use physgen_writer::{FlexActor, ObjectStatic, RigidParams, ScenarioValue, StaticSection};

/// Objects and metadata of the running trial, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    objects: Vec<ObjectStatic>,
    flex_actors: Vec<FlexActor>,
    container: Option<FlexContainer>,
    scenario: Vec<(String, ScenarioValue)>,
}

impl ObjectRegistry {
    pub fn register(&mut self, object: ObjectStatic) {
        self.objects.push(object);
    }

    /// Marks an already registered object as a Flex actor.
    pub fn attach_flex(&mut self, actor: FlexActor) {
        self.flex_actors.push(actor);
    }

    /// Forgets an object. Returns false if it was not registered.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.id != id);
        self.flex_actors.retain(|a| a.id() != id);
        self.objects.len() != before
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.iter().any(|o| o.id == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectStatic> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn is_flex(&self, id: ObjectId) -> bool {
        self.flex_actors.iter().any(|a| a.id() == id)
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn set_container(&mut self, container: FlexContainer) {
        self.container = Some(container);
    }

    /// Adds a scenario-specific value to the static section.
    pub fn record(&mut self, key: impl Into<String>, value: ScenarioValue) {
        self.scenario.push((key.into(), value));
    }

    /// One destroy command per object, matching its physics type.
    pub fn destroy_commands(&self) -> Vec<Command> {
        self.objects
            .iter()
            .map(|o| {
                if self.is_flex(o.id) {
                    Command::DestroyFlexObject { id: o.id }
                } else {
                    Command::DestroyObject { id: o.id }
                }
            })
            .collect()
    }

    pub fn to_static_section(&self) -> StaticSection {
        StaticSection {
            objects: self.objects.clone(),
            flex_actors: self.flex_actors.clone(),
            container: self.container.clone(),
            scenario: self.scenario.clone(),
        }
    }
}

/// A rigid object to add.
#[derive(Debug, Clone)]
pub struct RigidSpec<'r> {
    pub record: &'r ModelRecord,
    pub position: Vector3,
    /// Euler angles in degrees.
    pub rotation: Vector3,
    pub scale: Vector3,
    pub color: Option<Color>,
    pub params: RigidParams,
}

/// Where and how large a Flex actor is.
#[derive(Debug, Clone)]
pub struct FlexPlacement<'r> {
    pub record: &'r ModelRecord,
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: Option<Vector3>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidParams {
    pub mass_scale: f32,
    pub mesh_expansion: f32,
    pub particle_spacing: f32,
}

impl Default for SolidParams {
    fn default() -> Self {
        Self {
            mass_scale: 1.0,
            mesh_expansion: 0.0,
            particle_spacing: 0.125,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftParams {
    pub mass_scale: f32,
    pub volume_sampling: f32,
    pub surface_sampling: f32,
    pub cluster_spacing: f32,
    pub cluster_radius: f32,
    pub cluster_stiffness: f32,
    pub link_radius: f32,
    pub link_stiffness: f32,
    pub particle_spacing: f32,
}

impl Default for SoftParams {
    fn default() -> Self {
        Self {
            mass_scale: 1.0,
            volume_sampling: 2.0,
            surface_sampling: 0.0,
            cluster_spacing: 0.2,
            cluster_radius: 0.2,
            cluster_stiffness: 0.2,
            link_radius: 0.1,
            link_stiffness: 0.5,
            particle_spacing: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClothParams {
    pub mass_scale: f32,
    pub mesh_tesselation: u32,
    pub stretch_stiffness: f32,
    pub bend_stiffness: f32,
    pub tether_stiffness: f32,
    pub tether_give: f32,
    pub pressure: f32,
}

impl Default for ClothParams {
    fn default() -> Self {
        Self {
            mass_scale: 1.0,
            mesh_tesselation: 1,
            stretch_stiffness: 0.1,
            bend_stiffness: 0.1,
            tether_stiffness: 0.0,
            tether_give: 0.0,
            pressure: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluidParams {
    pub fluid_type: String,
    pub position: Vector3,
    pub rotation: Vector3,
    pub mass_scale: f32,
    pub particle_spacing: f32,
}

/// Physics steps the host runs after loading a fluid so it can settle.
const FLUID_SETTLE_STEPS: u32 = 500;

/// Everything a scenario may touch while building one trial.
pub struct TrialContext<'a> {
    pub rng: &'a mut ChaCha8Rng,
    ids: &'a mut IdAllocator,
    libraries: &'a LibrarySet,
    physics: &'a PhysicsCatalog,
    trial: u32,
    registry: ObjectRegistry,
    placement_fallbacks: u32,
}

impl<'a> TrialContext<'a> {
    pub fn new(
        rng: &'a mut ChaCha8Rng,
        ids: &'a mut IdAllocator,
        libraries: &'a LibrarySet,
        physics: &'a PhysicsCatalog,
        trial: u32,
    ) -> Self {
        Self {
            rng,
            ids,
            libraries,
            physics,
            trial,
            registry: ObjectRegistry::default(),
            placement_fallbacks: 0,
        }
    }

    pub fn libraries(&self) -> &'a LibrarySet {
        self.libraries
    }

    pub fn physics(&self) -> &'a PhysicsCatalog {
        self.physics
    }

    pub fn trial(&self) -> u32 {
        self.trial
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }

    /// Issues an ID without registering an object.
    pub fn next_id(&mut self) -> ObjectId {
        self.ids.next_id()
    }

    /// Counts a placement that ran out of attempts.
    pub fn note_placement_fallback(&mut self) {
        self.placement_fallbacks += 1;
    }

    pub fn placement_fallbacks(&self) -> u32 {
        self.placement_fallbacks
    }

    pub fn record(&mut self, key: impl Into<String>, value: ScenarioValue) {
        self.registry.record(key, value);
    }

    /// Catalog physics for `record`, if the catalog knows the model.
    pub fn default_params(&self, record: &ModelRecord) -> Option<RigidParams> {
        self.physics.get(&record.name).map(|info| RigidParams {
            mass: info.mass,
            static_friction: info.static_friction,
            dynamic_friction: info.dynamic_friction,
            bounciness: info.bounciness,
        })
    }

    /// Adds a rigid body and registers its static data.
    ///
    /// Returns `[add_object, set_mass, set_physic_material, set_color?, scale_object]`.
    pub fn add_rigid_object(&mut self, spec: RigidSpec<'_>) -> (ObjectId, Vec<Command>) {
        let id = self.ids.next_id();
        let mut commands = vec![
            add_object(spec.record, id, spec.position, spec.rotation),
            Command::SetMass {
                id,
                mass: spec.params.mass,
            },
            Command::SetPhysicMaterial {
                id,
                dynamic_friction: spec.params.dynamic_friction,
                static_friction: spec.params.static_friction,
                bounciness: spec.params.bounciness,
            },
        ];
        if let Some(color) = spec.color {
            commands.push(Command::SetColor { color, id });
        }
        commands.push(Command::ScaleObject {
            scale_factor: spec.scale,
            id,
        });
        self.registry.register(ObjectStatic {
            id,
            model: spec.record.name.clone(),
            scale: spec.scale,
            color: spec.color,
            rigid: Some(spec.params),
        });
        (id, commands)
    }

    /// Adds a Flex solid actor.
    pub fn add_solid_object(
        &mut self,
        placement: FlexPlacement<'_>,
        params: SolidParams,
    ) -> (ObjectId, Vec<Command>) {
        let (id, mut commands) = self.add_flex_object(&placement);
        commands.extend([
            Command::SetFlexSolidActor {
                id,
                mesh_expansion: params.mesh_expansion,
                particle_spacing: params.particle_spacing,
                mass_scale: params.mass_scale,
            },
            assign_container(id),
        ]);
        self.registry.attach_flex(FlexActor::Solid {
            id,
            mass_scale: params.mass_scale,
            mesh_expansion: params.mesh_expansion,
            particle_spacing: params.particle_spacing,
        });
        (id, commands)
    }

    /// Adds a Flex soft actor.
    pub fn add_soft_object(
        &mut self,
        placement: FlexPlacement<'_>,
        params: SoftParams,
    ) -> (ObjectId, Vec<Command>) {
        let (id, mut commands) = self.add_flex_object(&placement);
        commands.extend([
            Command::SetFlexSoftActor {
                id,
                volume_sampling: params.volume_sampling,
                surface_sampling: params.surface_sampling,
                cluster_spacing: params.cluster_spacing,
                cluster_radius: params.cluster_radius,
                cluster_stiffness: params.cluster_stiffness,
                link_radius: params.link_radius,
                link_stiffness: params.link_stiffness,
                particle_spacing: params.particle_spacing,
                mass_scale: params.mass_scale,
            },
            assign_container(id),
        ]);
        self.registry.attach_flex(FlexActor::Soft {
            id,
            mass_scale: params.mass_scale,
            volume_sampling: params.volume_sampling,
            surface_sampling: params.surface_sampling,
            cluster_spacing: params.cluster_spacing,
            cluster_radius: params.cluster_radius,
            cluster_stiffness: params.cluster_stiffness,
            link_radius: params.link_radius,
            link_stiffness: params.link_stiffness,
            particle_spacing: params.particle_spacing,
        });
        (id, commands)
    }

    /// Adds a Flex cloth actor.
    pub fn add_cloth_object(
        &mut self,
        placement: FlexPlacement<'_>,
        params: ClothParams,
    ) -> (ObjectId, Vec<Command>) {
        let (id, mut commands) = self.add_flex_object(&placement);
        commands.extend([
            Command::SetFlexClothActor {
                id,
                mesh_tesselation: params.mesh_tesselation,
                stretch_stiffness: params.stretch_stiffness,
                bend_stiffness: params.bend_stiffness,
                tether_stiffness: params.tether_stiffness,
                tether_give: params.tether_give,
                pressure: params.pressure,
                mass_scale: params.mass_scale,
            },
            assign_container(id),
        ]);
        self.registry.attach_flex(FlexActor::Cloth {
            id,
            mass_scale: params.mass_scale,
            mesh_tesselation: params.mesh_tesselation,
            stretch_stiffness: params.stretch_stiffness,
            bend_stiffness: params.bend_stiffness,
            tether_stiffness: params.tether_stiffness,
            tether_give: params.tether_give,
            pressure: params.pressure,
        });
        (id, commands)
    }

    /// Loads a fluid into a fluid container and lets it settle.
    pub fn add_fluid_object(&mut self, params: FluidParams) -> (ObjectId, Vec<Command>) {
        let id = self.ids.next_id();
        let commands = vec![
            Command::LoadFlexFluidFromResources {
                id,
                orientation: params.rotation,
                position: params.position,
            },
            Command::SetFlexFluidActor {
                id,
                mass_scale: params.mass_scale,
                particle_spacing: params.particle_spacing,
            },
            Command::AssignFlexContainer {
                id,
                container_id: 0,
                fluid_container: Some(true),
                fluid_type: Some(params.fluid_type.clone()),
            },
            Command::StepPhysics {
                frames: FLUID_SETTLE_STEPS,
            },
        ];
        self.registry.register(ObjectStatic {
            id,
            model: params.fluid_type,
            scale: Vector3::ONE,
            color: None,
            rigid: None,
        });
        self.registry.attach_flex(FlexActor::Fluid {
            id,
            mass_scale: params.mass_scale,
            particle_spacing: params.particle_spacing,
        });
        (id, commands)
    }

    fn add_flex_object(&mut self, placement: &FlexPlacement<'_>) -> (ObjectId, Vec<Command>) {
        let id = self.ids.next_id();
        let mut commands = vec![add_object(
            placement.record,
            id,
            placement.position,
            placement.rotation,
        )];
        if let Some(scale) = placement.scale {
            commands.push(Command::ScaleObject {
                scale_factor: scale,
                id,
            });
        }
        self.registry.register(ObjectStatic {
            id,
            model: placement.record.name.clone(),
            scale: placement.scale.unwrap_or(Vector3::ONE),
            color: None,
            rigid: None,
        });
        (id, commands)
    }

    /// Removes an object from the trial and returns the command that
    /// destroys it on the host.
    pub fn destroy_object(&mut self, id: ObjectId) -> Option<Command> {
        let command = if self.registry.is_flex(id) {
            Command::DestroyFlexObject { id }
        } else {
            Command::DestroyObject { id }
        };
        self.registry.remove(id).then_some(command)
    }

    /// Consumes the context, keeping only the trial's registry.
    pub fn into_registry(self) -> ObjectRegistry {
        self.registry
    }
}

fn add_object(record: &ModelRecord, id: ObjectId, position: Vector3, rotation: Vector3) -> Command {
    Command::AddObject {
        name: record.name.clone(),
        url: record.url.clone(),
        scale_factor: record.scale_factor,
        position,
        rotation,
        id,
    }
}

fn assign_container(id: ObjectId) -> Command {
    Command::AssignFlexContainer {
        id,
        container_id: 0,
        fluid_container: None,
        fluid_type: None,
    }
}

