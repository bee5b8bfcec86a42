//! The per-trial static section.
//!
//! Built from the trial context once the setup commands are known, then
//! written under `static/` before the first frame.

use physgen_archive::{ArchiveWriter, Dataset};
use physgen_protocol::FlexContainer;
use physgen_types::{Color, ObjectId, PhysgenResult, Vector3};

use crate::layout::static_path;

/// Rigid-body material parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidParams {
    pub mass: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub bounciness: f32,
}

/// Fixed data for one object of the trial.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStatic {
    pub id: ObjectId,
    pub model: String,
    pub scale: Vector3,
    pub color: Option<Color>,
    pub rigid: Option<RigidParams>,
}

/// Flex actor parameters, one variant per actor kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FlexActor {
    Solid {
        id: ObjectId,
        mass_scale: f32,
        mesh_expansion: f32,
        particle_spacing: f32,
    },
    Soft {
        id: ObjectId,
        mass_scale: f32,
        volume_sampling: f32,
        surface_sampling: f32,
        cluster_spacing: f32,
        cluster_radius: f32,
        cluster_stiffness: f32,
        link_radius: f32,
        link_stiffness: f32,
        particle_spacing: f32,
    },
    Cloth {
        id: ObjectId,
        mass_scale: f32,
        mesh_tesselation: u32,
        stretch_stiffness: f32,
        bend_stiffness: f32,
        tether_stiffness: f32,
        tether_give: f32,
        pressure: f32,
    },
    Fluid {
        id: ObjectId,
        mass_scale: f32,
        particle_spacing: f32,
    },
}

impl FlexActor {
    pub fn id(&self) -> ObjectId {
        match self {
            FlexActor::Solid { id, .. }
            | FlexActor::Soft { id, .. }
            | FlexActor::Cloth { id, .. }
            | FlexActor::Fluid { id, .. } => *id,
        }
    }

    /// Group name under `static/`.
    pub fn group(&self) -> &'static str {
        match self {
            FlexActor::Solid { .. } => "solid_actors",
            FlexActor::Soft { .. } => "soft_actors",
            FlexActor::Cloth { .. } => "cloth_actors",
            FlexActor::Fluid { .. } => "fluid_actors",
        }
    }

    /// Numeric parameters in a stable order (object ID first).
    pub fn params(&self) -> Vec<(&'static str, f32)> {
        let mut params = vec![("object_id", self.id().raw() as f32)];
        match *self {
            FlexActor::Solid {
                mass_scale,
                mesh_expansion,
                particle_spacing,
                ..
            } => params.extend([
                ("mass_scale", mass_scale),
                ("mesh_expansion", mesh_expansion),
                ("particle_spacing", particle_spacing),
            ]),
            FlexActor::Soft {
                mass_scale,
                volume_sampling,
                surface_sampling,
                cluster_spacing,
                cluster_radius,
                cluster_stiffness,
                link_radius,
                link_stiffness,
                particle_spacing,
                ..
            } => params.extend([
                ("mass_scale", mass_scale),
                ("volume_sampling", volume_sampling),
                ("surface_sampling", surface_sampling),
                ("cluster_spacing", cluster_spacing),
                ("cluster_radius", cluster_radius),
                ("cluster_stiffness", cluster_stiffness),
                ("link_radius", link_radius),
                ("link_stiffness", link_stiffness),
                ("particle_spacing", particle_spacing),
            ]),
            FlexActor::Cloth {
                mass_scale,
                mesh_tesselation,
                stretch_stiffness,
                bend_stiffness,
                tether_stiffness,
                tether_give,
                pressure,
                ..
            } => params.extend([
                ("mass_scale", mass_scale),
                ("mesh_tesselation", mesh_tesselation as f32),
                ("stretch_stiffness", stretch_stiffness),
                ("bend_stiffness", bend_stiffness),
                ("tether_stiffness", tether_stiffness),
                ("tether_give", tether_give),
                ("pressure", pressure),
            ]),
            FlexActor::Fluid {
                mass_scale,
                particle_spacing,
                ..
            } => params.extend([
                ("mass_scale", mass_scale),
                ("particle_spacing", particle_spacing),
            ]),
        }
        params
    }
}

/// A scenario-specific static scalar or vector.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioValue {
    F32(f32),
    I32(i32),
    Bool(bool),
    Str(String),
    Vec3(Vector3),
    F32s(Vec<f32>),
}

impl ScenarioValue {
    pub fn to_dataset(&self) -> Dataset {
        match self {
            ScenarioValue::F32(v) => Dataset::scalar_f32(*v),
            ScenarioValue::I32(v) => Dataset::scalar_i32(*v),
            ScenarioValue::Bool(v) => Dataset::scalar_bool(*v),
            ScenarioValue::Str(s) => Dataset::string(s.clone()),
            ScenarioValue::Vec3(v) => Dataset::f32s(v.to_array().to_vec()),
            ScenarioValue::F32s(v) => Dataset::f32s(v.clone()),
        }
    }
}

/// Everything written under `static/` for one trial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticSection {
    pub objects: Vec<ObjectStatic>,
    pub flex_actors: Vec<FlexActor>,
    pub container: Option<FlexContainer>,
    pub scenario: Vec<(String, ScenarioValue)>,
}

impl StaticSection {
    /// Object IDs in registration order. This order indexes every
    /// per-object frame array.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn write_to(&self, archive: &mut ArchiveWriter) -> PhysgenResult<()> {
        let ids = self.objects.iter().map(|o| o.id.raw()).collect();
        archive.write(&static_path("object_ids"), &Dataset::i32s(ids))?;
        archive.write(
            &static_path("model_names"),
            &Dataset::strings(self.objects.iter().map(|o| o.model.clone()).collect()),
        )?;

        if self.objects.iter().any(|o| o.rigid.is_some()) {
            let column = |f: fn(&RigidParams) -> f32| -> Vec<f32> {
                self.objects
                    .iter()
                    .map(|o| o.rigid.as_ref().map_or(f32::NAN, f))
                    .collect()
            };
            archive.write(&static_path("mass"), &Dataset::f32s(column(|p| p.mass)))?;
            archive.write(
                &static_path("static_friction"),
                &Dataset::f32s(column(|p| p.static_friction)),
            )?;
            archive.write(
                &static_path("dynamic_friction"),
                &Dataset::f32s(column(|p| p.dynamic_friction)),
            )?;
            archive.write(
                &static_path("bounciness"),
                &Dataset::f32s(column(|p| p.bounciness)),
            )?;
        }

        if self.objects.iter().any(|o| o.color.is_some()) {
            let colors = self
                .objects
                .iter()
                .flat_map(|o| o.color.map_or([f32::NAN; 3], |c| c.to_rgb_array()))
                .collect();
            archive.write(&static_path("color"), &Dataset::f32_rows(3, colors)?)?;
        }

        let scales: [(&str, Vec<f32>); 3] = [
            ("scale_x", self.objects.iter().map(|o| o.scale.x).collect()),
            ("scale_y", self.objects.iter().map(|o| o.scale.y).collect()),
            ("scale_z", self.objects.iter().map(|o| o.scale.z).collect()),
        ];
        for (axis, values) in scales {
            archive.write(&static_path(axis), &Dataset::f32s(values))?;
        }

        if let Some(container) = &self.container {
            for (key, value) in container.params() {
                archive.write(
                    &static_path(&format!("container/{key}")),
                    &Dataset::scalar_f32(value),
                )?;
            }
        }

        self.write_actors(archive)?;

        for (key, value) in &self.scenario {
            archive.write(&static_path(key), &value.to_dataset())?;
        }
        Ok(())
    }

    /// Flattens actors per kind into one column per parameter.
    fn write_actors(&self, archive: &mut ArchiveWriter) -> PhysgenResult<()> {
        for group in ["solid_actors", "soft_actors", "cloth_actors", "fluid_actors"] {
            let actors: Vec<&FlexActor> = self
                .flex_actors
                .iter()
                .filter(|a| a.group() == group)
                .collect();
            let Some(first) = actors.first() else {
                continue;
            };
            for (col, (key, _)) in first.params().iter().enumerate() {
                let values = actors.iter().map(|a| a.params()[col].1).collect();
                archive.write(
                    &static_path(&format!("{group}/{key}")),
                    &Dataset::f32s(values),
                )?;
            }
        }
        Ok(())
    }
}
