//! Response records returned by the Simulation Host.
//!
//! On the wire every record is a 4-byte ASCII tag followed by a bincode
//! body. [`ResponseRecord::decode`] is the single place where tags are
//! inspected; the rest of the workspace works on the typed enum.

use serde::{Deserialize, Serialize};

use physgen_types::{ObjectId, PhysgenError, PhysgenResult};

/// The closed set of record kinds this generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Transforms,
    Rigidbodies,
    Collision,
    EnvironmentCollision,
    Images,
    CameraMatrices,
    FlexParticles,
    Volumes,
}

impl RecordKind {
    /// Returns all record kinds.
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::Transforms,
            RecordKind::Rigidbodies,
            RecordKind::Collision,
            RecordKind::EnvironmentCollision,
            RecordKind::Images,
            RecordKind::CameraMatrices,
            RecordKind::FlexParticles,
            RecordKind::Volumes,
        ]
    }

    /// The 4-byte wire tag.
    pub fn tag(self) -> &'static [u8; 4] {
        match self {
            RecordKind::Transforms => b"tran",
            RecordKind::Rigidbodies => b"rigi",
            RecordKind::Collision => b"coll",
            RecordKind::EnvironmentCollision => b"enco",
            RecordKind::Images => b"imag",
            RecordKind::CameraMatrices => b"cama",
            RecordKind::FlexParticles => b"flex",
            RecordKind::Volumes => b"volu",
        }
    }

    /// The tag as a string, for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            RecordKind::Transforms => "tran",
            RecordKind::Rigidbodies => "rigi",
            RecordKind::Collision => "coll",
            RecordKind::EnvironmentCollision => "enco",
            RecordKind::Images => "imag",
            RecordKind::CameraMatrices => "cama",
            RecordKind::FlexParticles => "flex",
            RecordKind::Volumes => "volu",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<RecordKind> {
        RecordKind::all().iter().copied().find(|k| k.tag().as_slice() == tag)
    }
}

// ─── Record bodies ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformEntry {
    pub id: ObjectId,
    pub position: [f32; 3],
    pub forward: [f32; 3],
    /// Quaternion (x, y, z, w).
    pub rotation: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transforms {
    pub entries: Vec<TransformEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidbodyEntry {
    pub id: ObjectId,
    pub velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
    pub sleeping: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rigidbodies {
    pub entries: Vec<RigidbodyEntry>,
}

/// Phase of a collision event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionState {
    Enter,
    Stay,
    Exit,
}

impl CollisionState {
    pub fn as_str(self) -> &'static str {
        match self {
            CollisionState::Enter => "enter",
            CollisionState::Stay => "stay",
            CollisionState::Exit => "exit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub normal: [f32; 3],
    pub point: [f32; 3],
}

/// Object-object collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub collider_id: ObjectId,
    pub collidee_id: ObjectId,
    pub state: CollisionState,
    pub relative_velocity: [f32; 3],
    pub contacts: Vec<Contact>,
}

/// Object-environment (floor, walls) collision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCollision {
    pub object_id: ObjectId,
    pub state: CollisionState,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePass {
    /// Pass name such as `_img` or `_depth`.
    pub pass_mask: String,
    /// Encoded image bytes exactly as produced by the host.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Images {
    pub avatar_id: String,
    pub width: u32,
    pub height: u32,
    pub passes: Vec<ImagePass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraMatrices {
    pub projection_matrix: [f32; 16],
    pub camera_matrix: [f32; 16],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexParticleEntry {
    pub id: ObjectId,
    /// Particle positions with inverse mass as the fourth component.
    pub particles: Vec<[f32; 4]>,
    pub velocities: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlexParticles {
    pub entries: Vec<FlexParticleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeEntry {
    pub id: ObjectId,
    pub volume: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Volumes {
    pub entries: Vec<VolumeEntry>,
}

// ─── Typed record ─────────────────────────────────────────────

/// One decoded response record.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseRecord {
    Transforms(Transforms),
    Rigidbodies(Rigidbodies),
    Collision(Collision),
    EnvironmentCollision(EnvironmentCollision),
    Images(Images),
    CameraMatrices(CameraMatrices),
    FlexParticles(FlexParticles),
    Volumes(Volumes),
}

fn body<T: for<'de> Deserialize<'de>>(kind: RecordKind, bytes: &[u8]) -> PhysgenResult<T> {
    bincode::deserialize(bytes)
        .map_err(|e| PhysgenError::Protocol(format!("malformed '{}' record: {e}", kind.name())))
}

impl ResponseRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ResponseRecord::Transforms(_) => RecordKind::Transforms,
            ResponseRecord::Rigidbodies(_) => RecordKind::Rigidbodies,
            ResponseRecord::Collision(_) => RecordKind::Collision,
            ResponseRecord::EnvironmentCollision(_) => RecordKind::EnvironmentCollision,
            ResponseRecord::Images(_) => RecordKind::Images,
            ResponseRecord::CameraMatrices(_) => RecordKind::CameraMatrices,
            ResponseRecord::FlexParticles(_) => RecordKind::FlexParticles,
            ResponseRecord::Volumes(_) => RecordKind::Volumes,
        }
    }

    /// Decodes one record. Returns `Ok(None)` for tags outside the known set.
    pub fn decode(bytes: &[u8]) -> PhysgenResult<Option<ResponseRecord>> {
        if bytes.len() < 4 {
            return Err(PhysgenError::Protocol(format!(
                "record of {} bytes is too short for a tag",
                bytes.len()
            )));
        }
        let (tag, rest) = bytes.split_at(4);
        let Some(kind) = RecordKind::from_tag(tag) else {
            tracing::debug!(tag = %String::from_utf8_lossy(tag), "skipping unknown record");
            return Ok(None);
        };
        let record = match kind {
            RecordKind::Transforms => ResponseRecord::Transforms(body(kind, rest)?),
            RecordKind::Rigidbodies => ResponseRecord::Rigidbodies(body(kind, rest)?),
            RecordKind::Collision => ResponseRecord::Collision(body(kind, rest)?),
            RecordKind::EnvironmentCollision => {
                ResponseRecord::EnvironmentCollision(body(kind, rest)?)
            }
            RecordKind::Images => ResponseRecord::Images(body(kind, rest)?),
            RecordKind::CameraMatrices => ResponseRecord::CameraMatrices(body(kind, rest)?),
            RecordKind::FlexParticles => ResponseRecord::FlexParticles(body(kind, rest)?),
            RecordKind::Volumes => ResponseRecord::Volumes(body(kind, rest)?),
        };
        Ok(Some(record))
    }

    /// Encodes as tag + bincode body. Used by in-process hosts and tests.
    pub fn encode(&self) -> PhysgenResult<Vec<u8>> {
        let body = match self {
            ResponseRecord::Transforms(r) => bincode::serialize(r),
            ResponseRecord::Rigidbodies(r) => bincode::serialize(r),
            ResponseRecord::Collision(r) => bincode::serialize(r),
            ResponseRecord::EnvironmentCollision(r) => bincode::serialize(r),
            ResponseRecord::Images(r) => bincode::serialize(r),
            ResponseRecord::CameraMatrices(r) => bincode::serialize(r),
            ResponseRecord::FlexParticles(r) => bincode::serialize(r),
            ResponseRecord::Volumes(r) => bincode::serialize(r),
        }
        .map_err(|e| PhysgenError::Serialization(e.to_string()))?;
        let mut bytes = Vec::with_capacity(4 + body.len());
        bytes.extend_from_slice(self.kind().tag());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }
}

// ─── Batch ────────────────────────────────────────────────────

/// Everything the host returned for one exchange.
///
/// Record order carries no meaning; consumers join by object ID.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseBatch {
    pub records: Vec<ResponseRecord>,
    /// Host frame counter from the trailing record.
    pub frame: u32,
}

impl ResponseBatch {
    pub fn new(records: Vec<ResponseRecord>, frame: u32) -> Self {
        Self { records, frame }
    }

    /// Decodes raw records; the last one must be the 4-byte frame trailer.
    ///
    /// A record whose body does not decode is dropped with a warning, so
    /// the batch reads as missing that kind and the frame can be retried.
    /// A bad trailer fails the whole batch.
    pub fn decode(raw: &[Vec<u8>]) -> PhysgenResult<Self> {
        let Some((trailer, body)) = raw.split_last() else {
            return Err(PhysgenError::Protocol("empty response".into()));
        };
        let frame_bytes: [u8; 4] = trailer.as_slice().try_into().map_err(|_| {
            PhysgenError::Protocol(format!(
                "trailer must be 4 bytes, got {}",
                trailer.len()
            ))
        })?;
        let mut records = Vec::with_capacity(body.len());
        for bytes in body {
            match ResponseRecord::decode(bytes) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => tracing::warn!(bytes = bytes.len(), "Dropping record: {err}"),
            }
        }
        Ok(Self {
            records,
            frame: u32::from_le_bytes(frame_bytes),
        })
    }

    /// Encodes records followed by the frame trailer.
    pub fn encode(&self) -> PhysgenResult<Vec<Vec<u8>>> {
        let mut raw = self
            .records
            .iter()
            .map(ResponseRecord::encode)
            .collect::<PhysgenResult<Vec<_>>>()?;
        raw.push(self.frame.to_le_bytes().to_vec());
        Ok(raw)
    }

    /// True if at least one record of `kind` is present.
    pub fn contains(&self, kind: RecordKind) -> bool {
        self.records.iter().any(|r| r.kind() == kind)
    }

    pub fn transforms(&self) -> impl Iterator<Item = &TransformEntry> {
        self.records.iter().flat_map(|r| match r {
            ResponseRecord::Transforms(t) => t.entries.as_slice(),
            _ => &[],
        })
    }

    pub fn rigidbodies(&self) -> impl Iterator<Item = &RigidbodyEntry> {
        self.records.iter().flat_map(|r| match r {
            ResponseRecord::Rigidbodies(t) => t.entries.as_slice(),
            _ => &[],
        })
    }

    pub fn flex_particles(&self) -> impl Iterator<Item = &FlexParticleEntry> {
        self.records.iter().flat_map(|r| match r {
            ResponseRecord::FlexParticles(t) => t.entries.as_slice(),
            _ => &[],
        })
    }

    pub fn volumes(&self) -> impl Iterator<Item = &VolumeEntry> {
        self.records.iter().flat_map(|r| match r {
            ResponseRecord::Volumes(t) => t.entries.as_slice(),
            _ => &[],
        })
    }

    pub fn collisions(&self) -> impl Iterator<Item = &Collision> {
        self.records.iter().filter_map(|r| match r {
            ResponseRecord::Collision(c) => Some(c),
            _ => None,
        })
    }

    pub fn environment_collisions(&self) -> impl Iterator<Item = &EnvironmentCollision> {
        self.records.iter().filter_map(|r| match r {
            ResponseRecord::EnvironmentCollision(c) => Some(c),
            _ => None,
        })
    }

    pub fn images(&self) -> Option<&Images> {
        self.records.iter().find_map(|r| match r {
            ResponseRecord::Images(i) => Some(i),
            _ => None,
        })
    }

    pub fn camera_matrices(&self) -> Option<&CameraMatrices> {
        self.records.iter().find_map(|r| match r {
            ResponseRecord::CameraMatrices(c) => Some(c),
            _ => None,
        })
    }

    /// Transform of one object, if reported this frame.
    pub fn transform_of(&self, id: ObjectId) -> Option<&TransformEntry> {
        self.transforms().find(|t| t.id == id)
    }

    /// Particles of one Flex object, if reported this frame.
    pub fn particles_of(&self, id: ObjectId) -> Option<&FlexParticleEntry> {
        self.flex_particles().find(|p| p.id == id)
    }
}
