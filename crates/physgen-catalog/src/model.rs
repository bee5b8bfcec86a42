//! Model records.

use serde::{Deserialize, Serialize};

use physgen_types::Vector3;

/// Extreme points of a model at scale 1, in model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top: Vector3,
    pub bottom: Vector3,
    pub left: Vector3,
    pub right: Vector3,
    pub front: Vector3,
    pub back: Vector3,
    pub center: Vector3,
}

impl Bounds {
    pub fn height(&self) -> f32 {
        self.top.y - self.bottom.y
    }

    pub fn width(&self) -> f32 {
        self.right.x - self.left.x
    }

    pub fn depth(&self) -> f32 {
        self.front.z - self.back.z
    }

    /// Largest extent along any axis.
    pub fn max_extent(&self) -> f32 {
        self.height().max(self.width()).max(self.depth())
    }
}

/// Metadata for one named asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub name: String,
    /// Asset bundle location; empty for assets the host resolves by name.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_scale")]
    pub scale_factor: f32,
    pub bounds: Bounds,
    /// Library file this record came from. Filled in on load.
    #[serde(default, skip_serializing)]
    pub library: String,
}

fn default_scale() -> f32 {
    1.0
}

impl ModelRecord {
    /// Scale that makes the model's largest extent equal to 1.
    pub fn unit_scale(&self) -> f32 {
        let extent = self.bounds.max_extent();
        if extent > 0.0 {
            1.0 / extent
        } else {
            1.0
        }
    }
}
