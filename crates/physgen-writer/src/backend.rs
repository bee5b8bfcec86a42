//! Physics back-ends and the output each one records.

use serde::{Deserialize, Serialize};

use physgen_protocol::{Command, Frequency, RecordKind};

/// Which physics engine simulates the trial's objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicsBackend {
    /// Rigid bodies: velocities, collisions and sleep state.
    Rigidbodies,
    /// Flex actors: per-object particles.
    Flex,
}

impl PhysicsBackend {
    pub fn name(self) -> &'static str {
        match self {
            PhysicsBackend::Rigidbodies => "rigidbodies",
            PhysicsBackend::Flex => "flex",
        }
    }

    /// Output requests appended to every trial's setup commands.
    pub fn send_data_commands(self) -> Vec<Command> {
        let mut commands = vec![
            Command::SendTransforms {
                frequency: Frequency::Always,
            },
            Command::SendCameraMatrices {
                frequency: Frequency::Always,
            },
        ];
        match self {
            PhysicsBackend::Rigidbodies => {
                commands.push(Command::SendCollisions {
                    enter: true,
                    exit: true,
                    stay: true,
                    collision_types: vec!["obj".into(), "env".into()],
                });
                commands.push(Command::SendRigidbodies {
                    frequency: Frequency::Always,
                });
            }
            PhysicsBackend::Flex => commands.push(Command::SendFlexParticles {
                frequency: Frequency::Always,
            }),
        }
        commands
    }

    /// Record kinds every frame must contain. A batch missing one is retried.
    pub fn expected_records(self) -> &'static [RecordKind] {
        match self {
            PhysicsBackend::Rigidbodies => &[
                RecordKind::Transforms,
                RecordKind::Images,
                RecordKind::CameraMatrices,
                RecordKind::Rigidbodies,
            ],
            PhysicsBackend::Flex => &[
                RecordKind::Transforms,
                RecordKind::Images,
                RecordKind::CameraMatrices,
                RecordKind::FlexParticles,
            ],
        }
    }
}
