//! Scenario presets.
//!
//! Each preset is an independent configuration struct (serde + `Default`,
//! validated before the first trial) and a [`Scenario`] built from it.

pub mod dominoes;
pub mod dragging;
pub mod draping;
pub mod drop;
pub mod push;
pub mod stability;
pub mod towers;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use physgen_catalog::{LibrarySet, ModelRecord};
use physgen_protocol::Command;
use physgen_types::{Color, PhysgenError, PhysgenResult, Vector3};

use crate::sampling::XyzSpec;
use crate::scenario::Scenario;

pub use dominoes::{Dominoes, DominoesConfig};
pub use dragging::{Dragging, DraggingConfig};
pub use draping::{Draping, DrapingConfig};
pub use drop::{DropConfig, ObjectDrop};
pub use push::{Push, PushConfig};
pub use stability::{Stability, StabilityConfig};
pub use towers::{Towers, TowersConfig};

/// Which preset to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Drop,
    Dominoes,
    Towers,
    Stability,
    Push,
    Draping,
    Dragging,
}

impl ScenarioKind {
    pub fn all() -> &'static [ScenarioKind] {
        &[
            ScenarioKind::Drop,
            ScenarioKind::Dominoes,
            ScenarioKind::Towers,
            ScenarioKind::Stability,
            ScenarioKind::Push,
            ScenarioKind::Draping,
            ScenarioKind::Dragging,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Drop => "drop",
            ScenarioKind::Dominoes => "dominoes",
            ScenarioKind::Towers => "towers",
            ScenarioKind::Stability => "stability",
            ScenarioKind::Push => "push",
            ScenarioKind::Draping => "draping",
            ScenarioKind::Dragging => "dragging",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = PhysgenError;

    fn from_str(s: &str) -> PhysgenResult<Self> {
        ScenarioKind::all()
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ScenarioKind::all().iter().map(|k| k.name()).collect();
                PhysgenError::InvalidConfig(format!(
                    "unknown scenario '{s}'. Available: {}",
                    names.join(", ")
                ))
            })
    }
}

/// The configuration of one preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum ScenarioConfig {
    Drop(DropConfig),
    Dominoes(DominoesConfig),
    Towers(TowersConfig),
    Stability(StabilityConfig),
    Push(PushConfig),
    Draping(DrapingConfig),
    Dragging(DraggingConfig),
}

/// A config file holds one table per preset; missing tables use defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    drop: DropConfig,
    dominoes: DominoesConfig,
    towers: TowersConfig,
    stability: StabilityConfig,
    push: PushConfig,
    draping: DrapingConfig,
    dragging: DraggingConfig,
}

impl ScenarioConfig {
    /// Default configuration of `kind`.
    pub fn default_for(kind: ScenarioKind) -> Self {
        match kind {
            ScenarioKind::Drop => ScenarioConfig::Drop(DropConfig::default()),
            ScenarioKind::Dominoes => ScenarioConfig::Dominoes(DominoesConfig::default()),
            ScenarioKind::Towers => ScenarioConfig::Towers(TowersConfig::default()),
            ScenarioKind::Stability => ScenarioConfig::Stability(StabilityConfig::default()),
            ScenarioKind::Push => ScenarioConfig::Push(PushConfig::default()),
            ScenarioKind::Draping => ScenarioConfig::Draping(DrapingConfig::default()),
            ScenarioKind::Dragging => ScenarioConfig::Dragging(DraggingConfig::default()),
        }
    }

    /// Reads the `[kind]` table of a TOML document.
    pub fn from_toml_str(kind: ScenarioKind, text: &str) -> PhysgenResult<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| PhysgenError::InvalidConfig(format!("bad config: {e}")))?;
        Ok(match kind {
            ScenarioKind::Drop => ScenarioConfig::Drop(file.drop),
            ScenarioKind::Dominoes => ScenarioConfig::Dominoes(file.dominoes),
            ScenarioKind::Towers => ScenarioConfig::Towers(file.towers),
            ScenarioKind::Stability => ScenarioConfig::Stability(file.stability),
            ScenarioKind::Push => ScenarioConfig::Push(file.push),
            ScenarioKind::Draping => ScenarioConfig::Draping(file.draping),
            ScenarioKind::Dragging => ScenarioConfig::Dragging(file.dragging),
        })
    }

    pub fn load(kind: ScenarioKind, path: &Path) -> PhysgenResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(kind, &text)
    }

    /// Parses every table of a config file and validates all of them.
    pub fn validate_file(text: &str, libraries: &LibrarySet) -> PhysgenResult<Vec<ScenarioKind>> {
        for kind in ScenarioKind::all() {
            Self::from_toml_str(*kind, text)?.validate(libraries)?;
        }
        let table: toml::Table = toml::from_str(text)
            .map_err(|e| PhysgenError::InvalidConfig(format!("bad config: {e}")))?;
        let present = table
            .keys()
            .filter_map(|key| key.parse::<ScenarioKind>().ok())
            .collect();
        Ok(present)
    }

    pub fn kind(&self) -> ScenarioKind {
        match self {
            ScenarioConfig::Drop(_) => ScenarioKind::Drop,
            ScenarioConfig::Dominoes(_) => ScenarioKind::Dominoes,
            ScenarioConfig::Towers(_) => ScenarioKind::Towers,
            ScenarioConfig::Stability(_) => ScenarioKind::Stability,
            ScenarioConfig::Push(_) => ScenarioKind::Push,
            ScenarioConfig::Draping(_) => ScenarioKind::Draping,
            ScenarioConfig::Dragging(_) => ScenarioKind::Dragging,
        }
    }

    /// Checks ranges and resolves model names.
    pub fn validate(&self, libraries: &LibrarySet) -> PhysgenResult<()> {
        match self {
            ScenarioConfig::Drop(c) => c.validate(libraries),
            ScenarioConfig::Dominoes(c) => c.validate(libraries),
            ScenarioConfig::Towers(c) => c.validate(libraries),
            ScenarioConfig::Stability(c) => c.validate(libraries),
            ScenarioConfig::Push(c) => c.validate(libraries),
            ScenarioConfig::Draping(c) => c.validate(libraries),
            ScenarioConfig::Dragging(c) => c.validate(libraries),
        }
    }

    /// Validates and builds the scenario.
    pub fn build(&self, libraries: &LibrarySet) -> PhysgenResult<Box<dyn Scenario>> {
        Ok(match self {
            ScenarioConfig::Drop(c) => Box::new(ObjectDrop::new(c.clone(), libraries)?),
            ScenarioConfig::Dominoes(c) => Box::new(Dominoes::new(c.clone(), libraries)?),
            ScenarioConfig::Towers(c) => Box::new(Towers::new(c.clone(), libraries)?),
            ScenarioConfig::Stability(c) => Box::new(Stability::new(c.clone(), libraries)?),
            ScenarioConfig::Push(c) => Box::new(Push::new(c.clone(), libraries)?),
            ScenarioConfig::Draping(c) => Box::new(Draping::new(c.clone(), libraries)?),
            ScenarioConfig::Dragging(c) => Box::new(Dragging::new(c.clone(), libraries)?),
        })
    }

    /// JSON form for run metadata.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ─── Helpers shared by the presets ────────────────────────────

/// Resolves an allow-list against a library. Empty selects everything.
pub(crate) fn resolve_models(
    libraries: &LibrarySet,
    library: &str,
    names: &[String],
    what: &str,
) -> PhysgenResult<Vec<ModelRecord>> {
    let records = libraries.require(library)?.select(names)?;
    if records.is_empty() {
        return Err(PhysgenError::InvalidConfig(format!(
            "{what}: no models selected from '{library}'"
        )));
    }
    Ok(records)
}

pub(crate) fn choose<'r, R: Rng + ?Sized>(
    rng: &mut R,
    records: &'r [ModelRecord],
) -> PhysgenResult<&'r ModelRecord> {
    records
        .choose(rng)
        .ok_or_else(|| PhysgenError::InvalidConfig("empty model list".into()))
}

/// `spec` if given, else a random yaw.
pub(crate) fn sample_rotation<R: Rng + ?Sized>(spec: Option<&XyzSpec>, rng: &mut R) -> Vector3 {
    match spec {
        Some(spec) => spec.sample(rng),
        None => Vector3::new(0.0, rng.gen_range(0.0..360.0), 0.0),
    }
}

pub(crate) fn rgb(c: [f32; 3]) -> Color {
    Color::rgb(c[0], c[1], c[2])
}

pub(crate) fn validate_rgb(c: Option<[f32; 3]>, what: &str) -> PhysgenResult<()> {
    match c {
        Some(c) if c.iter().any(|v| !(0.0..=1.0).contains(v)) => Err(
            PhysgenError::InvalidConfig(format!("{what}: color channels must be in [0, 1]")),
        ),
        _ => Ok(()),
    }
}

/// Teleports the avatar, aims it and focuses on the aim point.
pub(crate) fn aim_camera(position: Vector3, aim: Vector3) -> Vec<Command> {
    vec![
        Command::TeleportAvatarTo { position },
        Command::LookAtPosition { position: aim },
        Command::SetFocusDistance {
            focus_distance: position.distance(aim),
        },
    ]
}
