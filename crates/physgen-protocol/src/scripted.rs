//! In-memory Simulation Host.
//!
//! `ScriptedHost` keeps a toy world (objects added, Flex actors, output
//! requests) and answers each exchange with the records that were asked for.
//! Objects never move on their own; tests shape behavior with
//! [`ScriptedHost::sleep_after`], [`ScriptedHost::drop_record_on_call`],
//! [`ScriptedHost::corrupt_record_on_call`] and
//! [`ScriptedHost::with_responder`].
//!
//! Every response goes through the wire encoding and
//! [`ResponseBatch::decode`], as a TCP response would.

use std::collections::{BTreeMap, HashSet};

use physgen_types::{ObjectId, PhysgenError, PhysgenResult, Vector3};

use crate::commands::{Command, Frequency};
use crate::host::SimulationHost;
use crate::records::{
    CameraMatrices, FlexParticleEntry, FlexParticles, ImagePass, Images, RecordKind,
    ResponseBatch, ResponseRecord, RigidbodyEntry, Rigidbodies, TransformEntry, Transforms,
    VolumeEntry, Volumes,
};

type Responder = Box<dyn FnMut(usize, &[Command]) -> Vec<ResponseRecord>>;

#[derive(Debug, Clone)]
struct WorldObject {
    position: Vector3,
    scale: Vector3,
    flex: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Off,
    Once,
    Always,
}

impl From<Frequency> for Output {
    fn from(f: Frequency) -> Self {
        match f {
            Frequency::Once => Output::Once,
            Frequency::Always => Output::Always,
            Frequency::Never => Output::Off,
        }
    }
}

/// A deterministic stand-in for the external engine.
pub struct ScriptedHost {
    objects: BTreeMap<ObjectId, WorldObject>,
    outputs: BTreeMap<&'static str, Output>,
    pass_masks: Vec<String>,
    frame: u32,
    calls: usize,
    steps_since_reset: u32,
    sleep_after: Option<u32>,
    dropped: Vec<(usize, RecordKind)>,
    corrupted: Vec<(usize, RecordKind)>,
    responder: Option<Responder>,
    sent: Vec<Vec<Command>>,
    terminated: bool,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            outputs: BTreeMap::new(),
            pass_masks: vec!["_img".to_string()],
            frame: 0,
            calls: 0,
            steps_since_reset: 0,
            sleep_after: None,
            dropped: Vec::new(),
            corrupted: Vec::new(),
            responder: None,
            sent: Vec::new(),
            terminated: false,
        }
    }

    /// Report every rigid body as sleeping once `frames` exchanges have
    /// passed since the last object was added.
    pub fn sleep_after(mut self, frames: u32) -> Self {
        self.sleep_after = Some(frames);
        self
    }

    /// Omit one record kind from the response to the `call`-th exchange (0-based).
    pub fn drop_record_on_call(mut self, call: usize, kind: RecordKind) -> Self {
        self.dropped.push((call, kind));
        self
    }

    /// Truncate the body of one record kind in the response to the
    /// `call`-th exchange (0-based), as a damaged transfer would.
    pub fn corrupt_record_on_call(mut self, call: usize, kind: RecordKind) -> Self {
        self.corrupted.push((call, kind));
        self
    }

    /// Append extra records produced by `f` to every response.
    pub fn with_responder<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, &[Command]) -> Vec<ResponseRecord> + 'static,
    {
        self.responder = Some(Box::new(f));
        self
    }

    /// Every command list received so far, in order.
    pub fn sent(&self) -> &[Vec<Command>] {
        &self.sent
    }

    /// All commands received so far, flattened.
    pub fn sent_commands(&self) -> impl Iterator<Item = &Command> {
        self.sent.iter().flatten()
    }

    /// Number of exchanges so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// IDs of objects currently alive in the world.
    pub fn live_objects(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn apply(&mut self, command: &Command) {
        match command {
            Command::AddObject {
                id,
                position,
                scale_factor,
                ..
            } => {
                self.objects.insert(
                    *id,
                    WorldObject {
                        position: *position,
                        scale: Vector3::splat(*scale_factor),
                        flex: false,
                    },
                );
                self.steps_since_reset = 0;
            }
            Command::ScaleObject { scale_factor, id } => {
                if let Some(obj) = self.objects.get_mut(id) {
                    obj.scale = *scale_factor;
                }
            }
            Command::SetFlexSolidActor { id, .. }
            | Command::SetFlexSoftActor { id, .. }
            | Command::SetFlexClothActor { id, .. }
            | Command::SetFlexFluidActor { id, .. } => {
                if let Some(obj) = self.objects.get_mut(id) {
                    obj.flex = true;
                }
            }
            Command::DestroyObject { id } | Command::DestroyFlexObject { id } => {
                self.objects.remove(id);
            }
            Command::DestroyAllObjects => self.objects.clear(),
            Command::SetPassMasks { pass_masks } => self.pass_masks = pass_masks.clone(),
            Command::SendTransforms { frequency } => {
                self.outputs.insert("tran", (*frequency).into());
            }
            Command::SendRigidbodies { frequency } => {
                self.outputs.insert("rigi", (*frequency).into());
            }
            Command::SendImages { frequency } => {
                self.outputs.insert("imag", (*frequency).into());
            }
            Command::SendCameraMatrices { frequency } => {
                self.outputs.insert("cama", (*frequency).into());
            }
            Command::SendFlexParticles { frequency } => {
                self.outputs.insert("flex", (*frequency).into());
            }
            Command::SendVolumes { frequency } => {
                self.outputs.insert("volu", (*frequency).into());
            }
            Command::Terminate => self.terminated = true,
            _ => {}
        }
    }

    fn wants(&mut self, key: &'static str) -> bool {
        match self.outputs.get(key).copied().unwrap_or(Output::Off) {
            Output::Off => false,
            Output::Always => true,
            Output::Once => {
                self.outputs.insert(key, Output::Off);
                true
            }
        }
    }

    fn build_records(&mut self) -> Vec<ResponseRecord> {
        let mut records = Vec::new();
        if self.wants("tran") {
            records.push(ResponseRecord::Transforms(Transforms {
                entries: self
                    .objects
                    .iter()
                    .map(|(id, obj)| TransformEntry {
                        id: *id,
                        position: obj.position.to_array(),
                        forward: [0.0, 0.0, 1.0],
                        rotation: [0.0, 0.0, 0.0, 1.0],
                    })
                    .collect(),
            }));
        }
        if self.wants("rigi") {
            let sleeping = self
                .sleep_after
                .is_some_and(|n| self.steps_since_reset >= n);
            records.push(ResponseRecord::Rigidbodies(Rigidbodies {
                entries: self
                    .objects
                    .iter()
                    .filter(|(_, obj)| !obj.flex)
                    .map(|(id, _)| RigidbodyEntry {
                        id: *id,
                        velocity: [0.0; 3],
                        angular_velocity: [0.0; 3],
                        sleeping,
                    })
                    .collect(),
            }));
        }
        if self.wants("flex") {
            records.push(ResponseRecord::FlexParticles(FlexParticles {
                entries: self
                    .objects
                    .iter()
                    .filter(|(_, obj)| obj.flex)
                    .map(|(id, obj)| square_particles(*id, obj))
                    .collect(),
            }));
        }
        if self.wants("volu") {
            records.push(ResponseRecord::Volumes(Volumes {
                entries: self
                    .objects
                    .iter()
                    .map(|(id, obj)| VolumeEntry {
                        id: *id,
                        volume: obj.scale.x * obj.scale.y * obj.scale.z,
                    })
                    .collect(),
            }));
        }
        if self.wants("imag") {
            records.push(ResponseRecord::Images(Images {
                avatar_id: "a".to_string(),
                width: 4,
                height: 4,
                passes: self
                    .pass_masks
                    .iter()
                    .map(|mask| ImagePass {
                        pass_mask: mask.clone(),
                        data: format!("{mask}:{}", self.frame).into_bytes(),
                    })
                    .collect(),
            }));
        }
        if self.wants("cama") {
            let mut identity = [0.0; 16];
            for i in 0..4 {
                identity[i * 5] = 1.0;
            }
            records.push(ResponseRecord::CameraMatrices(CameraMatrices {
                projection_matrix: identity,
                camera_matrix: identity,
            }));
        }
        records
    }
}

/// Four particles at the corners of the object's footprint.
fn square_particles(id: ObjectId, obj: &WorldObject) -> FlexParticleEntry {
    let p = obj.position;
    let hx = obj.scale.x * 0.5;
    let hz = obj.scale.z * 0.5;
    let particles = [(-hx, -hz), (hx, -hz), (-hx, hz), (hx, hz)]
        .iter()
        .map(|(dx, dz)| [p.x + dx, p.y, p.z + dz, 1.0])
        .collect::<Vec<_>>();
    let velocities = vec![[0.0; 3]; particles.len()];
    FlexParticleEntry {
        id,
        particles,
        velocities,
    }
}

impl SimulationHost for ScriptedHost {
    fn communicate(&mut self, commands: &[Command]) -> PhysgenResult<ResponseBatch> {
        if self.terminated {
            return Err(PhysgenError::Host("host has terminated".into()));
        }
        for command in commands {
            self.apply(command);
        }
        self.sent.push(commands.to_vec());

        let call = self.calls;
        let mut records = self.build_records();
        if let Some(responder) = self.responder.as_mut() {
            records.extend(responder(call, commands));
        }
        let dropped: HashSet<RecordKind> = self
            .dropped
            .iter()
            .filter(|(c, _)| *c == call)
            .map(|(_, kind)| *kind)
            .collect();
        records.retain(|r| !dropped.contains(&r.kind()));

        let mut raw = ResponseBatch::new(records, self.frame).encode()?;
        for (_, kind) in self.corrupted.iter().filter(|(c, _)| *c == call) {
            for bytes in raw.iter_mut().filter(|b| b.starts_with(kind.tag())) {
                bytes.truncate(bytes.len().min(6));
            }
        }
        let batch = ResponseBatch::decode(&raw)?;
        self.calls += 1;
        self.frame += 1;
        self.steps_since_reset += 1;
        Ok(batch)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
