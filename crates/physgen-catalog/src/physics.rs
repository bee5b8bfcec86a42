//! Default physics values per model.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use physgen_types::{PhysgenError, PhysgenResult};

const PHYSICS_INFO_JSON: &str = include_str!("../data/physics_info.json");

/// Default physical parameters for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsInfo {
    pub name: String,
    /// Library file the model lives in.
    pub library: String,
    pub mass: f32,
    pub dynamic_friction: f32,
    pub static_friction: f32,
    pub bounciness: f32,
}

/// Model name → default physics values.
///
/// Serialized as a JSON object keyed by model name, sorted, so that files
/// rewritten by the calculator diff cleanly.
#[derive(Debug, Clone, Default)]
pub struct PhysicsCatalog {
    entries: BTreeMap<String, PhysicsInfo>,
}

impl PhysicsCatalog {
    /// The embedded catalog for the primitives library.
    pub fn with_defaults() -> PhysgenResult<Self> {
        Self::from_json_str(PHYSICS_INFO_JSON)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> PhysgenResult<Self> {
        let entries = serde_json::from_str(json)
            .map_err(|e| PhysgenError::InvalidConfig(format!("bad physics info: {e}")))?;
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> PhysgenResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Writes the catalog as pretty, key-sorted JSON.
    pub fn save(&self, path: &Path) -> PhysgenResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn to_json(&self) -> PhysgenResult<String> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|e| PhysgenError::Serialization(e.to_string()))
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, info: PhysicsInfo) {
        self.entries.insert(info.name.clone(), info);
    }

    pub fn get(&self, name: &str) -> Option<&PhysicsInfo> {
        self.entries.get(name)
    }

    pub fn require(&self, name: &str) -> PhysgenResult<&PhysicsInfo> {
        self.get(name).ok_or_else(|| PhysgenError::UnknownModel {
            name: name.to_string(),
            library: "physics info catalog".into(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
