//! Model libraries.
//!
//! A library file looks like:
//!
//! ```json
//! { "library": "models_flex.json",
//!   "records": [ { "name": "cube", "url": "", "scale_factor": 1.0, "bounds": { ... } } ] }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use physgen_types::{PhysgenError, PhysgenResult};

use crate::model::ModelRecord;

/// Name of the embedded primitives library.
pub const FLEX_LIBRARY: &str = "models_flex.json";
/// Name of the embedded special-asset library (cloth).
pub const SPECIAL_LIBRARY: &str = "models_special.json";

const FLEX_JSON: &str = include_str!("../data/models_flex.json");
const SPECIAL_JSON: &str = include_str!("../data/models_special.json");

#[derive(Deserialize)]
struct LibraryFile {
    library: String,
    records: Vec<ModelRecord>,
}

/// An ordered, name-indexed collection of model records.
#[derive(Debug, Clone)]
pub struct ModelLibrary {
    name: String,
    records: Vec<ModelRecord>,
    index: HashMap<String, usize>,
}

impl ModelLibrary {
    /// Parses a library from JSON text.
    pub fn from_json_str(json: &str) -> PhysgenResult<Self> {
        let file: LibraryFile = serde_json::from_str(json)
            .map_err(|e| PhysgenError::InvalidConfig(format!("bad model library: {e}")))?;
        Ok(Self::new(file.library, file.records))
    }

    /// Loads a library from a JSON file.
    pub fn load(path: &Path) -> PhysgenResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn new(name: impl Into<String>, records: Vec<ModelRecord>) -> Self {
        let name = name.into();
        let mut records = records;
        for record in &mut records {
            record.library = name.clone();
        }
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self {
            name,
            records,
            index,
        }
    }

    /// The embedded primitives library.
    pub fn models_flex() -> PhysgenResult<Self> {
        Self::from_json_str(FLEX_JSON)
    }

    /// The embedded special-asset library.
    pub fn models_special() -> PhysgenResult<Self> {
        Self::from_json_str(SPECIAL_JSON)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[ModelRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&ModelRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// Looks up a record, failing with [`PhysgenError::UnknownModel`].
    pub fn require(&self, name: &str) -> PhysgenResult<&ModelRecord> {
        self.get(name).ok_or_else(|| PhysgenError::UnknownModel {
            name: name.to_string(),
            library: self.name.clone(),
        })
    }

    /// Resolves an allow-list of names, in the given order.
    ///
    /// An empty list selects every record in the library.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> PhysgenResult<Vec<ModelRecord>> {
        if names.is_empty() {
            return Ok(self.records.clone());
        }
        names
            .iter()
            .map(|n| self.require(n.as_ref()).cloned())
            .collect()
    }

    /// Record names in library order.
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// All libraries known to the process, by file name.
#[derive(Debug, Clone)]
pub struct LibrarySet {
    libraries: HashMap<String, ModelLibrary>,
}

impl LibrarySet {
    /// Creates a set with the two embedded libraries.
    pub fn with_defaults() -> PhysgenResult<Self> {
        let mut set = Self::empty();
        set.register(ModelLibrary::models_flex()?);
        set.register(ModelLibrary::models_special()?);
        Ok(set)
    }

    pub fn empty() -> Self {
        Self {
            libraries: HashMap::new(),
        }
    }

    /// Registers a library. Overwrites if the name already exists.
    pub fn register(&mut self, library: ModelLibrary) {
        self.libraries.insert(library.name().to_string(), library);
    }

    /// Loads a library file and registers it under its declared name.
    pub fn load_file(&mut self, path: &Path) -> PhysgenResult<&ModelLibrary> {
        let library = ModelLibrary::load(path)?;
        let name = library.name().to_string();
        tracing::info!(library = %name, records = library.len(), "loaded model library");
        self.register(library);
        self.require(&name)
    }

    pub fn get(&self, name: &str) -> Option<&ModelLibrary> {
        self.libraries.get(name)
    }

    pub fn require(&self, name: &str) -> PhysgenResult<&ModelLibrary> {
        self.get(name)
            .ok_or_else(|| PhysgenError::InvalidConfig(format!("unknown model library '{name}'")))
    }

    /// Looks up a record in a named library.
    pub fn record(&self, library: &str, name: &str) -> PhysgenResult<&ModelRecord> {
        self.require(library)?.require(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.libraries.keys().map(|s| s.as_str()).collect()
    }
}
