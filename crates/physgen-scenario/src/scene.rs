//! Process-wide scene setup.

use physgen_protocol::{Command, Frequency};
use physgen_types::constants::PASS_MASKS;

const RENDER_QUALITY: u32 = 5;
const SOLVER_ITERATIONS: u32 = 32;
const SHADOW_STRENGTH: f32 = 1.0;
const SLEEP_THRESHOLD: f32 = 0.1;
const AVATAR_TYPE: &str = "A_Img_Caps_Kinematic";

/// ID of the single camera avatar.
pub const AVATAR_ID: &str = "a";

/// The commands sent once per driver process.
///
/// Global render and physics settings come first, then the scenario's
/// own scene commands, then the avatar and its image stream.
pub fn global_scene_commands(
    width: u32,
    height: u32,
    scenario_commands: Vec<Command>,
    field_of_view: f32,
) -> Vec<Command> {
    let mut commands = vec![
        Command::SetScreenSize { width, height },
        Command::SetRenderQuality {
            render_quality: RENDER_QUALITY,
        },
        Command::SetPhysicsSolverIterations {
            iterations: SOLVER_ITERATIONS,
        },
        Command::SetVignette { enabled: false },
        Command::SetShadowStrength {
            strength: SHADOW_STRENGTH,
        },
        Command::SetSleepThreshold {
            sleep_threshold: SLEEP_THRESHOLD,
        },
    ];
    commands.extend(scenario_commands);
    commands.extend([
        Command::CreateAvatar {
            avatar_type: AVATAR_TYPE.to_string(),
            id: AVATAR_ID.to_string(),
        },
        Command::SetPassMasks {
            pass_masks: PASS_MASKS.iter().map(|m| m.to_string()).collect(),
        },
        Command::SetFieldOfView { field_of_view },
        Command::SendImages {
            frequency: Frequency::Always,
        },
    ]);
    commands
}

/// Loads a named scene.
pub fn add_scene(name: &str) -> Command {
    Command::AddScene {
        name: name.to_string(),
        url: String::new(),
    }
}

/// The lighting and lens settings shared by the rigid-body presets.
pub fn box_room(aperture: f32) -> Vec<Command> {
    vec![
        add_scene("box_room_2018"),
        Command::SetAperture { aperture },
        Command::SetPostExposure { post_exposure: 0.4 },
        Command::SetAmbientOcclusionIntensity { intensity: 0.175 },
        Command::SetAmbientOcclusionThicknessModifier { thickness: 3.5 },
    ]
}

/// The room used by the Flex presets.
pub fn flex_room() -> Vec<Command> {
    vec![
        add_scene("tdw_room_2018"),
        Command::SetAperture { aperture: 3.0 },
        Command::SetFocusDistance {
            focus_distance: 2.25,
        },
        Command::SetPostExposure { post_exposure: 0.4 },
        Command::SetAmbientOcclusionIntensity { intensity: 0.25 },
        Command::SetAmbientOcclusionThicknessModifier { thickness: 4.0 },
    ]
}
