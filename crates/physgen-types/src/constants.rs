//! Trial life-cycle constants and dataset defaults.

/// Hard cap on frames per trial if no termination predicate fires.
pub const DEFAULT_FRAME_CAP: u32 = 1000;

/// Send `unload_asset_bundles` every N trials to bound host memory growth.
pub const DEFAULT_UNLOAD_INTERVAL: u32 = 100;

/// Consecutive malformed responses tolerated before a trial fails.
pub const DEFAULT_MAX_FRAME_RETRIES: u32 = 10;

/// Objects below this height have fallen out of the world and are
/// excluded from the sleep check.
pub const FLOOR_EXCLUSION_Y: f32 = -1.0;

/// Attempt budget for placement routines that avoid overlap.
pub const PLACEMENT_ATTEMPTS: u32 = 1000;

/// Width of zero-padded trial and frame names ("0042").
pub const ZERO_PAD_WIDTH: usize = 4;

/// Largest frame cap whose frame names all fit in [`ZERO_PAD_WIDTH`] digits.
pub const MAX_FRAME_CAP: u32 = 10_000;

/// File extension of trial archives.
pub const ARCHIVE_EXTENSION: &str = "phga";

/// Default screen size in pixels.
pub const DEFAULT_SCREEN_SIZE: u32 = 256;

/// Default engine port.
pub const DEFAULT_PORT: u16 = 1071;

/// Render passes requested from the avatar.
pub const PASS_MASKS: [&str; 5] = ["_img", "_id", "_depth", "_normals", "_flow"];
