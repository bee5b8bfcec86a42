//! Offline tool that derives physics values for a model.
//!
//! Adds the model to an empty scene, asks the host for its volume, then
//! applies the material heuristics: `mass = volume × density`.

use std::path::PathBuf;

use physgen_protocol::{Command, Frequency, SimulationHost};
use physgen_types::{IdAllocator, PhysgenError, PhysgenResult, Vector3};

use crate::material::SemanticMaterial;
use crate::model::ModelRecord;
use crate::physics::{PhysicsCatalog, PhysicsInfo};

/// Computes and records physics info using a live host.
pub struct PhysicsInfoCalculator<H: SimulationHost> {
    host: H,
    catalog: PhysicsCatalog,
    output: Option<PathBuf>,
    ids: IdAllocator,
}

impl<H: SimulationHost> PhysicsInfoCalculator<H> {
    /// Prepares an empty scene on `host`.
    pub fn new(mut host: H, catalog: PhysicsCatalog) -> PhysgenResult<Self> {
        host.communicate(&[
            Command::LoadScene {
                scene_name: "ProcGenScene".into(),
            },
            Command::CreateEmptyEnvironment,
        ])?;
        Ok(Self {
            host,
            catalog,
            output: None,
            ids: IdAllocator::default(),
        })
    }

    /// Rewrite this catalog file after every calculation.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn catalog(&self) -> &PhysicsCatalog {
        &self.catalog
    }

    /// Computes physics info for `record`, stores it and returns it.
    pub fn calculate(
        &mut self,
        record: &ModelRecord,
        material: SemanticMaterial,
    ) -> PhysgenResult<PhysicsInfo> {
        let id = self.ids.next_id();
        let resp = self.host.communicate(&[
            Command::AddObject {
                name: record.name.clone(),
                url: record.url.clone(),
                scale_factor: record.scale_factor,
                position: Vector3::ZERO,
                rotation: Vector3::ZERO,
                id,
            },
            Command::SendVolumes {
                frequency: Frequency::Once,
            },
        ])?;
        let volume = resp
            .volumes()
            .find(|v| v.id == id)
            .map(|v| v.volume)
            .ok_or(PhysgenError::MissingRecord("volu"))?;

        let info = PhysicsInfo {
            name: record.name.clone(),
            library: record.library.clone(),
            mass: volume * material.density(),
            dynamic_friction: material.dynamic_friction(),
            static_friction: material.static_friction(),
            bounciness: material.bounciness(),
        };
        tracing::info!(
            model = %info.name,
            %material,
            volume,
            mass = info.mass,
            "calculated physics info"
        );

        self.catalog.insert(info.clone());
        if let Some(path) = &self.output {
            self.catalog.save(path)?;
        }

        self.host.communicate(&[
            Command::DestroyAllObjects,
            Command::UnloadAssetBundles,
        ])?;
        Ok(info)
    }

    /// Sends `terminate` and returns the catalog.
    pub fn finish(mut self) -> PhysgenResult<PhysicsCatalog> {
        self.host.communicate(&[Command::Terminate])?;
        Ok(self.catalog)
    }
}
