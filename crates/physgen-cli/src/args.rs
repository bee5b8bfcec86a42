//! Command-line flags and their mapping onto scenario configurations.
//!
//! Scenario flags are strings parsed after clap so that a malformed range
//! or model list is reported as a configuration error.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use physgen_scenario::presets::stability::StackType;
use physgen_scenario::presets::{
    DominoesConfig, DraggingConfig, DrapingConfig, DropConfig, PushConfig, StabilityConfig,
    TowersConfig,
};
use physgen_scenario::sampling::{parse_floats, parse_model_list, AvatarPlacement, RigidParamRanges};
use physgen_scenario::{Range, ScenarioConfig, ScenarioKind, XyzSpec};
use physgen_types::constants::{
    DEFAULT_FRAME_CAP, DEFAULT_MAX_FRAME_RETRIES, DEFAULT_PORT, DEFAULT_SCREEN_SIZE,
    DEFAULT_UNLOAD_INTERVAL, MAX_FRAME_CAP,
};
use physgen_types::{PhysgenError, PhysgenResult, Vector3};

/// Flags shared by every scenario.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Output directory for trial archives.
    #[arg(long, default_value = "output")]
    pub dir: PathBuf,

    /// Number of trials.
    #[arg(long, default_value_t = 100)]
    pub num: u32,

    /// Temp path each trial is written to before it is published.
    #[arg(long, default_value = "temp.phga")]
    pub temp: PathBuf,

    #[arg(long, default_value_t = DEFAULT_SCREEN_SIZE)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_SCREEN_SIZE)]
    pub height: u32,

    /// RNG seed.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Ignore --seed and draw one at random.
    #[arg(long)]
    pub random: bool,

    /// Simulation host address.
    #[arg(long, default_value_t = format!("localhost:{DEFAULT_PORT}"))]
    pub host: String,

    /// Frames after which a trial times out.
    #[arg(
        long,
        default_value_t = DEFAULT_FRAME_CAP,
        value_parser = clap::value_parser!(u32).range(1..=MAX_FRAME_CAP as i64)
    )]
    pub frame_cap: u32,

    /// Unload asset bundles every N trials (0 disables).
    #[arg(long, default_value_t = DEFAULT_UNLOAD_INTERVAL)]
    pub unload_interval: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_RETRIES)]
    pub max_frame_retries: u32,

    /// Extra model library files (JSON). Repeatable.
    #[arg(long)]
    pub library: Vec<PathBuf>,

    /// Model library the scenario draws from.
    #[arg(long)]
    pub model_library: Option<String>,

    /// Physics-info catalog (JSON). Defaults to the bundled one.
    #[arg(long)]
    pub physics_info: Option<PathBuf>,

    /// Scenario config (TOML). Flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 0 validates and prints the configuration without running trials.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub run: u8,

    /// Also write trial events as JSON lines to this file.
    #[arg(long)]
    pub events: Option<PathBuf>,
}

/// Rigid-body material ranges.
#[derive(Args, Debug, Clone, Default)]
pub struct PhysicsFlags {
    #[arg(long)]
    pub mass: Option<String>,
    #[arg(long)]
    pub static_friction: Option<String>,
    #[arg(long)]
    pub dynamic_friction: Option<String>,
    #[arg(long)]
    pub bounciness: Option<String>,
}

impl PhysicsFlags {
    fn apply(&self, physics: &mut RigidParamRanges) -> PhysgenResult<()> {
        set_range(&self.mass, &mut physics.mass)?;
        set_range(&self.static_friction, &mut physics.static_friction)?;
        set_range(&self.dynamic_friction, &mut physics.dynamic_friction)?;
        set_range(&self.bounciness, &mut physics.bounciness)
    }
}

/// Camera placement around the scene center.
#[derive(Args, Debug, Clone, Default)]
pub struct CameraFlags {
    #[arg(long)]
    pub camera_radius: Option<String>,
    #[arg(long)]
    pub camera_height: Option<String>,
    /// Camera yaw range in degrees.
    #[arg(long)]
    pub camera_angle: Option<String>,
}

impl CameraFlags {
    fn apply(&self, camera: &mut AvatarPlacement) -> PhysgenResult<()> {
        set_range(&self.camera_radius, &mut camera.radius)?;
        set_range(&self.camera_height, &mut camera.height)?;
        set_range(&self.camera_angle, &mut camera.angle)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct DropFlags {
    /// Comma-separated drop models.
    #[arg(long)]
    pub drop: Option<String>,
    /// Comma-separated target models.
    #[arg(long)]
    pub target: Option<String>,
    #[arg(long)]
    pub drop_height: Option<String>,
    #[arg(long)]
    pub drop_scale: Option<String>,
    #[arg(long)]
    pub target_scale: Option<String>,
    #[arg(long)]
    pub drop_rotation: Option<String>,
    #[arg(long)]
    pub target_rotation: Option<String>,
    #[arg(long)]
    pub jitter: Option<f32>,
    /// Target color as "r,g,b".
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub monochrome: bool,
    /// Use catalog physics values where available.
    #[arg(long)]
    pub catalog_physics: bool,
    #[arg(long)]
    pub camera_distance: Option<f32>,
    #[arg(long)]
    pub camera_angle: Option<String>,
    /// Camera height as a fraction of the drop height.
    #[arg(long)]
    pub camera_height: Option<String>,
    #[command(flatten)]
    pub physics: PhysicsFlags,
}

impl DropFlags {
    pub fn apply(&self, c: &mut DropConfig) -> PhysgenResult<()> {
        set_models(&self.drop, &mut c.drop_objects);
        set_models(&self.target, &mut c.target_objects);
        set_range(&self.drop_height, &mut c.height)?;
        set_xyz(&self.drop_scale, &mut c.drop_scale)?;
        set_xyz(&self.target_scale, &mut c.target_scale)?;
        if let Some(s) = &self.drop_rotation {
            c.drop_rotation = Some(XyzSpec::parse(s)?);
        }
        if let Some(s) = &self.target_rotation {
            c.target_rotation = Some(XyzSpec::parse(s)?);
        }
        set(self.jitter, &mut c.jitter);
        set_color(&self.color, &mut c.color)?;
        c.monochrome |= self.monochrome;
        c.catalog_physics |= self.catalog_physics;
        set(self.camera_distance, &mut c.camera_distance);
        set_range(&self.camera_angle, &mut c.camera_angle)?;
        set_range(&self.camera_height, &mut c.camera_height)?;
        self.physics.apply(&mut c.physics)
    }
}

/// Target, probe and push flags shared by dominoes and towers.
#[derive(Args, Debug, Clone, Default)]
pub struct CollisionFlags {
    #[arg(long)]
    pub target: Option<String>,
    #[arg(long)]
    pub probe: Option<String>,
    #[arg(long)]
    pub target_scale: Option<String>,
    #[arg(long)]
    pub target_rotation: Option<String>,
    #[arg(long)]
    pub probe_scale: Option<String>,
    #[arg(long)]
    pub probe_mass: Option<String>,
    /// Push magnitude as a multiple of the probe mass.
    #[arg(long)]
    pub force_scale: Option<String>,
    #[arg(long)]
    pub force_angle: Option<String>,
    /// Push point offset as "x,y,z".
    #[arg(long)]
    pub force_offset: Option<String>,
    #[arg(long)]
    pub force_offset_jitter: Option<f32>,
    #[arg(long)]
    pub collision_axis_length: Option<f32>,
    #[arg(long)]
    pub spacing_jitter: Option<f32>,
    #[arg(long)]
    pub remove_target: Option<bool>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub monochrome: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DominoesFlags {
    #[command(flatten)]
    pub collision: CollisionFlags,
    #[arg(long)]
    pub middle: Option<String>,
    #[arg(long)]
    pub num_middle_objects: Option<u32>,
    #[arg(long)]
    pub middle_scale: Option<String>,
    #[arg(long)]
    pub middle_rotation: Option<String>,
    #[arg(long)]
    pub middle_color: Option<String>,
    #[command(flatten)]
    pub physics: PhysicsFlags,
    #[command(flatten)]
    pub camera: CameraFlags,
}

impl DominoesFlags {
    pub fn apply(&self, c: &mut DominoesConfig) -> PhysgenResult<()> {
        let f = &self.collision;
        set_models(&f.target, &mut c.target_objects);
        set_models(&f.probe, &mut c.probe_objects);
        set_xyz(&f.target_scale, &mut c.target_scale)?;
        set_xyz(&f.target_rotation, &mut c.target_rotation)?;
        set_xyz(&f.probe_scale, &mut c.probe_scale)?;
        set_range(&f.probe_mass, &mut c.probe_mass)?;
        set_range(&f.force_scale, &mut c.force_scale)?;
        set_range(&f.force_angle, &mut c.force_angle)?;
        set_vector(&f.force_offset, &mut c.force_offset)?;
        set(f.force_offset_jitter, &mut c.force_offset_jitter);
        set(f.collision_axis_length, &mut c.collision_axis_length);
        set(f.spacing_jitter, &mut c.spacing_jitter);
        set(f.remove_target, &mut c.remove_target);
        set_color(&f.color, &mut c.color)?;
        c.monochrome |= f.monochrome;

        if let Some(s) = &self.middle {
            c.middle_objects = Some(parse_model_list(s));
        }
        set(self.num_middle_objects, &mut c.num_middle_objects);
        if let Some(s) = &self.middle_scale {
            c.middle_scale = Some(XyzSpec::parse(s)?);
        }
        set_range(&self.middle_rotation, &mut c.middle_rotation)?;
        set_color(&self.middle_color, &mut c.middle_color)?;
        self.physics.apply(&mut c.physics)?;
        self.camera.apply(&mut c.camera)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct TowersFlags {
    #[command(flatten)]
    pub collision: CollisionFlags,
    #[arg(long)]
    pub num_blocks: Option<u32>,
    #[arg(long)]
    pub block_scale: Option<String>,
    #[arg(long)]
    pub block_scale_gradient: Option<f32>,
    #[arg(long)]
    pub block_rotation: Option<String>,
    #[arg(long)]
    pub block_mass: Option<f32>,
    /// Comma-separated cap models. "none" builds uncapped towers.
    #[arg(long)]
    pub tower_cap: Option<String>,
    #[command(flatten)]
    pub physics: PhysicsFlags,
    #[command(flatten)]
    pub camera: CameraFlags,
}

impl TowersFlags {
    pub fn apply(&self, c: &mut TowersConfig) -> PhysgenResult<()> {
        let f = &self.collision;
        set_models(&f.target, &mut c.target_objects);
        set_models(&f.probe, &mut c.probe_objects);
        set_xyz(&f.target_scale, &mut c.target_scale)?;
        set_xyz(&f.target_rotation, &mut c.target_rotation)?;
        set_xyz(&f.probe_scale, &mut c.probe_scale)?;
        set_range(&f.probe_mass, &mut c.probe_mass)?;
        set_range(&f.force_scale, &mut c.force_scale)?;
        set_range(&f.force_angle, &mut c.force_angle)?;
        set_vector(&f.force_offset, &mut c.force_offset)?;
        set(f.force_offset_jitter, &mut c.force_offset_jitter);
        set(f.collision_axis_length, &mut c.collision_axis_length);
        set(f.spacing_jitter, &mut c.spacing_jitter);
        set(f.remove_target, &mut c.remove_target);
        set_color(&f.color, &mut c.color)?;
        c.monochrome |= f.monochrome;

        set(self.num_blocks, &mut c.num_blocks);
        set_range(&self.block_scale, &mut c.block_scale)?;
        set(self.block_scale_gradient, &mut c.block_scale_gradient);
        set_range(&self.block_rotation, &mut c.block_rotation)?;
        set(self.block_mass, &mut c.block_mass);
        match self.tower_cap.as_deref() {
            Some("none") => c.tower_cap.clear(),
            other => set_models(&other.map(str::to_string), &mut c.tower_cap),
        }
        self.physics.apply(&mut c.physics)?;
        self.camera.apply(&mut c.camera)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct StabilityFlags {
    /// Comma-separated stack types (stable, maybe_stable, base_stable, unstable).
    #[arg(long)]
    pub stack_types: Option<String>,
    #[arg(long)]
    pub min_objects: Option<u32>,
    #[arg(long)]
    pub max_objects: Option<u32>,
    #[arg(long)]
    pub object_scale: Option<String>,
    #[arg(long)]
    pub position_jitter: Option<f32>,
    #[arg(long)]
    pub base_force: Option<f32>,
    #[arg(long)]
    pub camera_jitter: Option<f32>,
    #[command(flatten)]
    pub physics: PhysicsFlags,
}

impl StabilityFlags {
    pub fn apply(&self, c: &mut StabilityConfig) -> PhysgenResult<()> {
        if let Some(s) = &self.stack_types {
            c.stack_types = parse_stack_types(s)?;
        }
        set(self.min_objects, &mut c.min_objects);
        set(self.max_objects, &mut c.max_objects);
        set_range(&self.object_scale, &mut c.object_scale)?;
        set(self.position_jitter, &mut c.position_jitter);
        set(self.base_force, &mut c.base_force);
        set(self.camera_jitter, &mut c.camera_jitter);
        self.physics.apply(&mut c.physics)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct PushFlags {
    #[arg(long)]
    pub objects: Option<String>,
    #[arg(long)]
    pub min_objects: Option<u32>,
    #[arg(long)]
    pub max_objects: Option<u32>,
    #[arg(long)]
    pub placement_radius: Option<f32>,
    #[arg(long)]
    pub scale: Option<String>,
    #[arg(long)]
    pub rotation: Option<String>,
    #[arg(long)]
    pub force: Option<String>,
    #[arg(long)]
    pub force_angle_jitter: Option<f32>,
    #[arg(long)]
    pub camera_jitter: Option<f32>,
    #[command(flatten)]
    pub physics: PhysicsFlags,
    #[command(flatten)]
    pub camera: CameraFlags,
}

impl PushFlags {
    pub fn apply(&self, c: &mut PushConfig) -> PhysgenResult<()> {
        set_models(&self.objects, &mut c.objects);
        set(self.min_objects, &mut c.min_objects);
        set(self.max_objects, &mut c.max_objects);
        set(self.placement_radius, &mut c.placement_radius);
        set_range(&self.scale, &mut c.scale)?;
        set_range(&self.rotation, &mut c.rotation)?;
        set_range(&self.force, &mut c.force)?;
        set(self.force_angle_jitter, &mut c.force_angle_jitter);
        set(self.camera_jitter, &mut c.camera_jitter);
        self.physics.apply(&mut c.physics)?;
        self.camera.apply(&mut c.camera)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct DrapingFlags {
    #[arg(long)]
    pub objects: Option<String>,
    #[arg(long)]
    pub object_mass_scale: Option<f32>,
    #[arg(long)]
    pub particle_spacing: Option<f32>,
    #[arg(long)]
    pub settle_frames: Option<u32>,
    #[arg(long)]
    pub cloth_stiffness: Option<String>,
    #[arg(long)]
    pub time_step: Option<f32>,
}

impl DrapingFlags {
    pub fn apply(&self, c: &mut DrapingConfig) -> PhysgenResult<()> {
        set_models(&self.objects, &mut c.objects);
        set(self.object_mass_scale, &mut c.object_mass_scale);
        set(self.particle_spacing, &mut c.particle_spacing);
        set(self.settle_frames, &mut c.settle_frames);
        set_range(&self.cloth_stiffness, &mut c.cloth_stiffness)?;
        set(self.time_step, &mut c.time_step);
        Ok(())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct DraggingFlags {
    #[arg(long)]
    pub objects: Option<String>,
    #[arg(long)]
    pub object_mass_scale: Option<String>,
    #[arg(long)]
    pub particle_spacing: Option<f32>,
    #[arg(long)]
    pub cloth_mass_scale: Option<f32>,
    #[arg(long)]
    pub cloth_stiffness: Option<String>,
    #[arg(long)]
    pub settle_frames: Option<u32>,
    #[arg(long)]
    pub min_force_frames: Option<u32>,
    #[arg(long)]
    pub max_force_frames: Option<u32>,
    #[arg(long)]
    pub corner_radius: Option<String>,
    /// Per-particle force; negative pulls toward the corner.
    #[arg(long, allow_hyphen_values = true)]
    pub force: Option<String>,
    #[command(flatten)]
    pub camera: CameraFlags,
}

impl DraggingFlags {
    pub fn apply(&self, c: &mut DraggingConfig) -> PhysgenResult<()> {
        set_models(&self.objects, &mut c.objects);
        set_range(&self.object_mass_scale, &mut c.object_mass_scale)?;
        set(self.particle_spacing, &mut c.particle_spacing);
        set(self.cloth_mass_scale, &mut c.cloth_mass_scale);
        set_range(&self.cloth_stiffness, &mut c.cloth_stiffness)?;
        set(self.settle_frames, &mut c.settle_frames);
        set(self.min_force_frames, &mut c.min_force_frames);
        set(self.max_force_frames, &mut c.max_force_frames);
        set_range(&self.corner_radius, &mut c.corner_radius)?;
        set_range(&self.force, &mut c.force)?;
        self.camera.apply(&mut c.camera)
    }
}

/// `physgen generate <scenario>`.
#[derive(Subcommand, Debug, Clone)]
pub enum ScenarioCommand {
    /// Drop an object onto a target.
    Drop {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        flags: DropFlags,
    },
    /// Push a probe into a target, optionally through a row of objects.
    Dominoes {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        flags: DominoesFlags,
    },
    /// Push a probe into a tower of blocks.
    Towers {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        flags: TowersFlags,
    },
    /// Stack objects and nudge the base.
    Stability {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        flags: StabilityFlags,
    },
    /// Push one object toward another.
    Push {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        flags: PushFlags,
    },
    /// Drape a cloth over an object (Flex).
    Draping {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        flags: DrapingFlags,
    },
    /// Drag an object by a corner of its cloth (Flex).
    Dragging {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        flags: DraggingFlags,
    },
}

impl ScenarioCommand {
    pub fn common(&self) -> &CommonArgs {
        match self {
            ScenarioCommand::Drop { common, .. }
            | ScenarioCommand::Dominoes { common, .. }
            | ScenarioCommand::Towers { common, .. }
            | ScenarioCommand::Stability { common, .. }
            | ScenarioCommand::Push { common, .. }
            | ScenarioCommand::Draping { common, .. }
            | ScenarioCommand::Dragging { common, .. } => common,
        }
    }

    pub fn kind(&self) -> ScenarioKind {
        match self {
            ScenarioCommand::Drop { .. } => ScenarioKind::Drop,
            ScenarioCommand::Dominoes { .. } => ScenarioKind::Dominoes,
            ScenarioCommand::Towers { .. } => ScenarioKind::Towers,
            ScenarioCommand::Stability { .. } => ScenarioKind::Stability,
            ScenarioCommand::Push { .. } => ScenarioKind::Push,
            ScenarioCommand::Draping { .. } => ScenarioKind::Draping,
            ScenarioCommand::Dragging { .. } => ScenarioKind::Dragging,
        }
    }

    /// The scenario configuration: `--config` (or the defaults) with the
    /// flags applied on top.
    pub fn resolve_config(&self) -> PhysgenResult<ScenarioConfig> {
        let kind = self.kind();
        let mut config = match &self.common().config {
            Some(path) => ScenarioConfig::load(kind, path)?,
            None => ScenarioConfig::default_for(kind),
        };
        self.apply(&mut config)?;
        Ok(config)
    }

    fn apply(&self, config: &mut ScenarioConfig) -> PhysgenResult<()> {
        let library = self.common().model_library.clone();
        match (self, config) {
            (ScenarioCommand::Drop { flags, .. }, ScenarioConfig::Drop(c)) => {
                set(library, &mut c.library);
                flags.apply(c)
            }
            (ScenarioCommand::Dominoes { flags, .. }, ScenarioConfig::Dominoes(c)) => {
                set(library, &mut c.library);
                flags.apply(c)
            }
            (ScenarioCommand::Towers { flags, .. }, ScenarioConfig::Towers(c)) => {
                set(library, &mut c.library);
                flags.apply(c)
            }
            (ScenarioCommand::Stability { flags, .. }, ScenarioConfig::Stability(c)) => {
                set(library, &mut c.library);
                flags.apply(c)
            }
            (ScenarioCommand::Push { flags, .. }, ScenarioConfig::Push(c)) => {
                set(library, &mut c.library);
                flags.apply(c)
            }
            (ScenarioCommand::Draping { flags, .. }, ScenarioConfig::Draping(c)) => {
                set(library, &mut c.library);
                flags.apply(c)
            }
            (ScenarioCommand::Dragging { flags, .. }, ScenarioConfig::Dragging(c)) => {
                set(library, &mut c.library);
                flags.apply(c)
            }
            (command, config) => Err(PhysgenError::InvalidConfig(format!(
                "'{}' flags cannot configure a '{}' scenario",
                command.kind(),
                config.kind()
            ))),
        }
    }
}

// ─── Flag parsing ─────────────────────────────────────────────

fn set<T>(value: Option<T>, target: &mut T) {
    if let Some(v) = value {
        *target = v;
    }
}

fn set_models(value: &Option<String>, target: &mut Vec<String>) {
    if let Some(s) = value {
        *target = parse_model_list(s);
    }
}

fn set_range(value: &Option<String>, target: &mut Range) -> PhysgenResult<()> {
    if let Some(s) = value {
        *target = Range::parse(s)?;
    }
    Ok(())
}

fn set_xyz(value: &Option<String>, target: &mut XyzSpec) -> PhysgenResult<()> {
    if let Some(s) = value {
        *target = XyzSpec::parse(s)?;
    }
    Ok(())
}

fn parse_triple(s: &str, what: &str) -> PhysgenResult<[f32; 3]> {
    match parse_floats(s)?.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(PhysgenError::InvalidConfig(format!(
            "malformed {what} '{s}': expected three comma-separated values"
        ))),
    }
}

fn set_vector(value: &Option<String>, target: &mut Vector3) -> PhysgenResult<()> {
    if let Some(s) = value {
        *target = Vector3::from(parse_triple(s, "vector")?);
    }
    Ok(())
}

fn set_color(value: &Option<String>, target: &mut Option<[f32; 3]>) -> PhysgenResult<()> {
    if let Some(s) = value {
        let rgb = parse_triple(s, "color")?;
        if rgb.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(PhysgenError::InvalidConfig(format!(
                "color '{s}' must have channels in [0, 1]"
            )));
        }
        *target = Some(rgb);
    }
    Ok(())
}

fn parse_stack_types(s: &str) -> PhysgenResult<Vec<StackType>> {
    parse_model_list(s)
        .iter()
        .map(|name| {
            StackType::all()
                .iter()
                .copied()
                .find(|t| t.name() == name)
                .ok_or_else(|| PhysgenError::InvalidConfig(format!("unknown stack type '{name}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::{Cli, Commands};

    fn scenario(args: &[&str]) -> ScenarioCommand {
        let mut argv = vec!["physgen", "generate"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Generate { scenario } => scenario,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn common_defaults() {
        let cmd = scenario(&["drop"]);
        let common = cmd.common();
        assert_eq!(common.num, 100);
        assert_eq!(common.width, 256);
        assert_eq!(common.frame_cap, 1000);
        assert_eq!(common.unload_interval, 100);
        assert_eq!(common.host, "localhost:1071");
        assert_eq!(common.run, 1);
        assert!(!common.random);
    }

    #[test]
    fn drop_flags_override_defaults() {
        let cmd = scenario(&[
            "drop",
            "--drop",
            "sphere,cone",
            "--drop-height",
            "[1.0,1.5]",
            "--drop-scale",
            r#"{"x":0.1,"y":[0.2,0.3],"z":0.1}"#,
            "--color",
            "1,0,0",
            "--mass",
            "3",
        ]);
        let ScenarioConfig::Drop(c) = cmd.resolve_config().unwrap() else {
            panic!("expected a drop config");
        };
        assert_eq!(c.drop_objects, vec!["sphere", "cone"]);
        assert_eq!(c.height, Range::new(1.0, 1.5));
        assert_eq!(
            c.drop_scale,
            XyzSpec::PerAxis {
                x: Range::fixed(0.1),
                y: Range::new(0.2, 0.3),
                z: Range::fixed(0.1),
            }
        );
        assert_eq!(c.color, Some([1.0, 0.0, 0.0]));
        assert_eq!(c.physics.mass, Range::fixed(3.0));
    }

    #[test]
    fn malformed_range_is_a_config_error() {
        let cmd = scenario(&["push", "--force", "20,abc"]);
        assert!(matches!(
            cmd.resolve_config(),
            Err(PhysgenError::InvalidConfig(_))
        ));
        let cmd = scenario(&["push", "--force", "60,20"]);
        assert!(cmd.resolve_config().is_err());
    }

    #[test]
    fn bad_color_is_rejected() {
        assert!(scenario(&["dominoes", "--color", "1,0"]).resolve_config().is_err());
        assert!(scenario(&["dominoes", "--color", "2,0,0"]).resolve_config().is_err());
    }

    #[test]
    fn towers_cap_none_clears_the_cap() {
        let cmd = scenario(&["towers", "--tower-cap", "none", "--num-blocks", "5"]);
        let ScenarioConfig::Towers(c) = cmd.resolve_config().unwrap() else {
            panic!("expected a towers config");
        };
        assert!(c.tower_cap.is_empty());
        assert_eq!(c.num_blocks, 5);
    }

    #[test]
    fn stack_types_parse_by_name() {
        let cmd = scenario(&["stability", "--stack-types", "stable,unstable"]);
        let ScenarioConfig::Stability(c) = cmd.resolve_config().unwrap() else {
            panic!("expected a stability config");
        };
        assert_eq!(c.stack_types, vec![StackType::Stable, StackType::Unstable]);
        assert!(scenario(&["stability", "--stack-types", "wobbly"])
            .resolve_config()
            .is_err());
    }

    #[test]
    fn negative_drag_force_parses() {
        let cmd = scenario(&["dragging", "--force", "-50,-40"]);
        let ScenarioConfig::Dragging(c) = cmd.resolve_config().unwrap() else {
            panic!("expected a dragging config");
        };
        assert_eq!(c.force, Range::new(-50.0, -40.0));
    }

    #[test]
    fn config_file_is_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push.toml");
        std::fs::write(&path, "[push]\nmin_objects = 3\nforce = [10.0, 20.0]\n").unwrap();
        let path = path.to_string_lossy().to_string();
        let cmd = scenario(&["push", "--config", &path, "--force", "30,40"]);
        let ScenarioConfig::Push(c) = cmd.resolve_config().unwrap() else {
            panic!("expected a push config");
        };
        assert_eq!(c.min_objects, 3);
        assert_eq!(c.force, Range::new(30.0, 40.0));
    }

    #[test]
    fn run_flag_is_bounded() {
        let argv = ["physgen", "generate", "drop", "--run", "2"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn frame_cap_must_fit_the_frame_names() {
        let parse = |cap: &str| {
            Cli::try_parse_from(["physgen", "generate", "drop", "--frame-cap", cap])
        };
        assert!(parse("10000").is_ok());
        assert!(parse("10001").is_err());
        assert!(parse("0").is_err());
    }
}
