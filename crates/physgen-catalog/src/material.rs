//! Semantic material heuristics used to guess physics values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use physgen_types::PhysgenError;

/// Coarse material class of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticMaterial {
    Ceramic,
    Concrete,
    Fabric,
    Glass,
    Leather,
    Metal,
    Plastic,
    Rubber,
    Stone,
    Wood,
    Paper,
    Organic,
}

impl SemanticMaterial {
    pub fn all() -> &'static [SemanticMaterial] {
        use SemanticMaterial::*;
        &[
            Ceramic, Concrete, Fabric, Glass, Leather, Metal, Plastic, Rubber, Stone, Wood, Paper,
            Organic,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            SemanticMaterial::Ceramic => "ceramic",
            SemanticMaterial::Concrete => "concrete",
            SemanticMaterial::Fabric => "fabric",
            SemanticMaterial::Glass => "glass",
            SemanticMaterial::Leather => "leather",
            SemanticMaterial::Metal => "metal",
            SemanticMaterial::Plastic => "plastic",
            SemanticMaterial::Rubber => "rubber",
            SemanticMaterial::Stone => "stone",
            SemanticMaterial::Wood => "wood",
            SemanticMaterial::Paper => "paper",
            SemanticMaterial::Organic => "organic",
        }
    }

    /// Density in kg/m³ as used by the mass heuristic.
    pub fn density(self) -> f32 {
        match self {
            SemanticMaterial::Ceramic => 218.0,
            SemanticMaterial::Concrete => 200.0,
            SemanticMaterial::Fabric => 42.0,
            SemanticMaterial::Glass => 250.0,
            SemanticMaterial::Leather => 860.0,
            SemanticMaterial::Metal => 845.0,
            SemanticMaterial::Organic => 100.0,
            SemanticMaterial::Paper => 70.0,
            SemanticMaterial::Plastic => 145.0,
            SemanticMaterial::Rubber => 119.0,
            SemanticMaterial::Stone => 246.0,
            SemanticMaterial::Wood => 690.0,
        }
    }

    pub fn bounciness(self) -> f32 {
        match self {
            SemanticMaterial::Ceramic => 0.625,
            SemanticMaterial::Concrete => 0.2,
            SemanticMaterial::Fabric => 0.05,
            SemanticMaterial::Glass => 0.5,
            SemanticMaterial::Leather => 0.1,
            SemanticMaterial::Metal => 0.35,
            SemanticMaterial::Organic => 0.1,
            SemanticMaterial::Paper => 0.05,
            SemanticMaterial::Plastic => 0.7,
            SemanticMaterial::Rubber => 0.7,
            SemanticMaterial::Stone => 0.2,
            SemanticMaterial::Wood => 0.58,
        }
    }

    pub fn static_friction(self) -> f32 {
        match self {
            SemanticMaterial::Ceramic => 0.47,
            SemanticMaterial::Concrete => 0.56,
            SemanticMaterial::Fabric => 0.48,
            SemanticMaterial::Glass => 0.65,
            SemanticMaterial::Leather => 0.47,
            SemanticMaterial::Metal => 0.52,
            SemanticMaterial::Organic => 0.47,
            SemanticMaterial::Paper => 0.47,
            SemanticMaterial::Plastic => 0.48,
            SemanticMaterial::Rubber => 0.47,
            SemanticMaterial::Stone => 0.48,
            SemanticMaterial::Wood => 0.4,
        }
    }

    pub fn dynamic_friction(self) -> f32 {
        match self {
            SemanticMaterial::Ceramic => 0.47,
            SemanticMaterial::Concrete => 0.49,
            SemanticMaterial::Fabric => 0.48,
            SemanticMaterial::Glass => 0.45,
            SemanticMaterial::Leather => 0.47,
            SemanticMaterial::Metal => 0.43,
            SemanticMaterial::Organic => 0.47,
            SemanticMaterial::Paper => 0.47,
            SemanticMaterial::Plastic => 0.44,
            SemanticMaterial::Rubber => 0.47,
            SemanticMaterial::Stone => 0.48,
            SemanticMaterial::Wood => 0.35,
        }
    }
}

impl fmt::Display for SemanticMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SemanticMaterial {
    type Err = PhysgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        SemanticMaterial::all()
            .iter()
            .copied()
            .find(|m| m.name() == lower)
            .ok_or_else(|| PhysgenError::InvalidConfig(format!("unknown material '{s}'")))
    }
}
