//! Commands sent to the Simulation Host.
//!
//! Each variant serializes to one JSON object tagged by `"$type"`, e.g.
//! `{"$type": "set_mass", "id": 3, "mass": 2.5}`. Only the commands this
//! generator actually issues are modeled.

use serde::{Deserialize, Serialize};

use physgen_types::{Color, ObjectId, Vector3};

/// How often the host should send a given kind of output data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Always,
    Never,
}

/// Parameters of the process-wide Flex container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexContainer {
    pub collision_distance: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub iteration_count: u32,
    pub substep_count: u32,
    pub radius: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solid_rest: Option<f32>,
    pub damping: f32,
    pub drag: f32,
}

impl FlexContainer {
    /// Flattened `(name, value)` pairs, in a stable order, for the archive.
    pub fn params(&self) -> Vec<(&'static str, f32)> {
        let mut params = vec![
            ("collision_distance", self.collision_distance),
            ("static_friction", self.static_friction),
            ("dynamic_friction", self.dynamic_friction),
            ("iteration_count", self.iteration_count as f32),
            ("substep_count", self.substep_count as f32),
            ("radius", self.radius),
            ("damping", self.damping),
            ("drag", self.drag),
        ];
        if let Some(solid_rest) = self.solid_rest {
            params.push(("solid_rest", solid_rest));
        }
        params
    }
}

/// A single command for the Simulation Host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case")]
pub enum Command {
    // ─── Scene & rendering ────────────────────────────────────
    SetScreenSize {
        width: u32,
        height: u32,
    },
    SetRenderQuality {
        render_quality: u32,
    },
    SetPhysicsSolverIterations {
        iterations: u32,
    },
    SetVignette {
        enabled: bool,
    },
    SetShadowStrength {
        strength: f32,
    },
    SetSleepThreshold {
        sleep_threshold: f32,
    },
    AddScene {
        name: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        url: String,
    },
    LoadScene {
        scene_name: String,
    },
    CreateEmptyEnvironment,
    SetAperture {
        aperture: f32,
    },
    SetPostExposure {
        post_exposure: f32,
    },
    SetAmbientOcclusionIntensity {
        intensity: f32,
    },
    SetAmbientOcclusionThicknessModifier {
        thickness: f32,
    },
    SetFocusDistance {
        focus_distance: f32,
    },
    SetTimeStep {
        time_step: f32,
    },

    // ─── Avatar ───────────────────────────────────────────────
    CreateAvatar {
        #[serde(rename = "type")]
        avatar_type: String,
        id: String,
    },
    SetPassMasks {
        pass_masks: Vec<String>,
    },
    SetFieldOfView {
        field_of_view: f32,
    },
    TeleportAvatarTo {
        position: Vector3,
    },
    LookAtPosition {
        position: Vector3,
    },
    LookAt {
        id: ObjectId,
        use_centroid: bool,
    },
    FocusOnObject {
        object_id: ObjectId,
    },
    RotateSensorContainerBy {
        axis: String,
        angle: f32,
    },

    // ─── Objects ──────────────────────────────────────────────
    AddObject {
        name: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        url: String,
        scale_factor: f32,
        position: Vector3,
        rotation: Vector3,
        id: ObjectId,
    },
    SetMass {
        id: ObjectId,
        mass: f32,
    },
    SetPhysicMaterial {
        id: ObjectId,
        dynamic_friction: f32,
        static_friction: f32,
        bounciness: f32,
    },
    SetColor {
        color: Color,
        id: ObjectId,
    },
    ScaleObject {
        scale_factor: Vector3,
        id: ObjectId,
    },
    SetKinematicState {
        id: ObjectId,
        is_kinematic: bool,
        use_gravity: bool,
    },
    ApplyForceToObject {
        force: Vector3,
        id: ObjectId,
    },
    ApplyForceAtPosition {
        force: Vector3,
        position: Vector3,
        id: ObjectId,
    },
    DestroyObject {
        id: ObjectId,
    },
    DestroyFlexObject {
        id: ObjectId,
    },
    DestroyAllObjects,
    UnloadAssetBundles,
    StepPhysics {
        frames: u32,
    },

    // ─── Flex ─────────────────────────────────────────────────
    CreateFlexContainer(FlexContainer),
    SetFlexSolidActor {
        id: ObjectId,
        mesh_expansion: f32,
        particle_spacing: f32,
        mass_scale: f32,
    },
    SetFlexSoftActor {
        id: ObjectId,
        volume_sampling: f32,
        surface_sampling: f32,
        cluster_spacing: f32,
        cluster_radius: f32,
        cluster_stiffness: f32,
        link_radius: f32,
        link_stiffness: f32,
        particle_spacing: f32,
        mass_scale: f32,
    },
    SetFlexClothActor {
        id: ObjectId,
        mesh_tesselation: u32,
        stretch_stiffness: f32,
        bend_stiffness: f32,
        tether_stiffness: f32,
        tether_give: f32,
        pressure: f32,
        mass_scale: f32,
    },
    SetFlexFluidActor {
        id: ObjectId,
        mass_scale: f32,
        particle_spacing: f32,
    },
    LoadFlexFluidFromResources {
        id: ObjectId,
        orientation: Vector3,
        position: Vector3,
    },
    AssignFlexContainer {
        id: ObjectId,
        container_id: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fluid_container: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fluid_type: Option<String>,
    },
    /// Per-particle forces, flattened as `[fx, fy, fz, particle_id, ...]`.
    ApplyForcesToFlexObject {
        id: ObjectId,
        forces_and_ids: Vec<f32>,
    },

    // ─── Output data requests ────────────────────────────────
    SendImages {
        frequency: Frequency,
    },
    SendTransforms {
        frequency: Frequency,
    },
    SendCameraMatrices {
        frequency: Frequency,
    },
    SendRigidbodies {
        frequency: Frequency,
    },
    SendFlexParticles {
        frequency: Frequency,
    },
    SendVolumes {
        frequency: Frequency,
    },
    SendCollisions {
        enter: bool,
        exit: bool,
        stay: bool,
        collision_types: Vec<String>,
    },

    Terminate,
}

impl Command {
    /// The `"$type"` name of this command.
    pub fn type_name(&self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("$type").and_then(|t| t.as_str()).map(str::to_owned))
            .unwrap_or_default()
    }

    /// Encodes a command list as the JSON array the host expects.
    pub fn encode_list(commands: &[Command]) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(commands)
    }
}
