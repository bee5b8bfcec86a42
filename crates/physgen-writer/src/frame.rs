//! Mapping one response batch onto the trial's object order.

use std::collections::{BTreeSet, HashMap};

use physgen_archive::{ArchiveWriter, Dataset};
use physgen_protocol::records::{CameraMatrices, ImagePass};
use physgen_protocol::ResponseBatch;
use physgen_types::constants::FLOOR_EXCLUSION_Y;
use physgen_types::{ObjectId, PhysgenResult};

use crate::layout::frame_path;

/// Particle data of one Flex object.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleData {
    pub id: ObjectId,
    /// `[n, 4]` flattened.
    pub particles: Vec<f32>,
    /// `[n, 3]` flattened.
    pub velocities: Vec<f32>,
}

/// One frame's records, joined to the static object order.
///
/// Per-object arrays are sized to the trial's object count up front. Rows
/// of objects the host did not report are NaN and the object is listed in
/// `missing`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameData {
    pub object_count: usize,
    pub positions: Vec<f32>,
    pub forwards: Vec<f32>,
    pub rotations: Vec<f32>,
    pub velocities: Option<Vec<f32>>,
    pub angular_velocities: Option<Vec<f32>>,
    pub missing: Vec<ObjectId>,

    pub collision_ids: Vec<i32>,
    pub collision_relative_velocities: Vec<f32>,
    pub collision_contacts: Vec<f32>,
    pub collision_states: Vec<String>,

    pub env_collision_ids: Vec<i32>,
    pub env_collision_contacts: Vec<f32>,
    pub env_collision_states: Vec<String>,

    pub particles: Vec<ParticleData>,
    pub images: Vec<ImagePass>,
    pub camera: Option<CameraMatrices>,
}

fn put(dst: &mut [f32], row: usize, src: &[f32]) {
    let w = src.len();
    dst[row * w..(row + 1) * w].copy_from_slice(src);
}

impl FrameData {
    /// Extracts a frame. Records may arrive in any order.
    pub fn extract(object_ids: &[ObjectId], batch: &ResponseBatch) -> Self {
        let n = object_ids.len();
        let slot: HashMap<ObjectId, usize> =
            object_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut missing = BTreeSet::new();

        let mut positions = vec![f32::NAN; n * 3];
        let mut forwards = vec![f32::NAN; n * 3];
        let mut rotations = vec![f32::NAN; n * 4];
        let mut seen = vec![false; n];
        for t in batch.transforms() {
            if let Some(&i) = slot.get(&t.id) {
                put(&mut positions, i, &t.position);
                put(&mut forwards, i, &t.forward);
                put(&mut rotations, i, &t.rotation);
                seen[i] = true;
            }
        }
        missing.extend(
            object_ids
                .iter()
                .zip(&seen)
                .filter(|(_, s)| !**s)
                .map(|(id, _)| *id),
        );

        let (velocities, angular_velocities) = if batch.rigidbodies().next().is_some() {
            let mut vel = vec![f32::NAN; n * 3];
            let mut ang = vec![f32::NAN; n * 3];
            let mut seen = vec![false; n];
            for r in batch.rigidbodies() {
                if let Some(&i) = slot.get(&r.id) {
                    put(&mut vel, i, &r.velocity);
                    put(&mut ang, i, &r.angular_velocity);
                    seen[i] = true;
                }
            }
            missing.extend(
                object_ids
                    .iter()
                    .zip(&seen)
                    .filter(|(_, s)| !**s)
                    .map(|(id, _)| *id),
            );
            (Some(vel), Some(ang))
        } else {
            (None, None)
        };

        let mut frame = Self {
            object_count: n,
            positions,
            forwards,
            rotations,
            velocities,
            angular_velocities,
            missing: missing.into_iter().collect(),
            collision_ids: Vec::new(),
            collision_relative_velocities: Vec::new(),
            collision_contacts: Vec::new(),
            collision_states: Vec::new(),
            env_collision_ids: Vec::new(),
            env_collision_contacts: Vec::new(),
            env_collision_states: Vec::new(),
            particles: Vec::new(),
            images: batch.images().map(|i| i.passes.clone()).unwrap_or_default(),
            camera: batch.camera_matrices().cloned(),
        };

        for c in batch.collisions() {
            frame
                .collision_ids
                .extend([c.collider_id.raw(), c.collidee_id.raw()]);
            frame
                .collision_relative_velocities
                .extend_from_slice(&c.relative_velocity);
            for contact in &c.contacts {
                frame.collision_contacts.extend_from_slice(&contact.normal);
                frame.collision_contacts.extend_from_slice(&contact.point);
            }
            frame.collision_states.push(c.state.as_str().to_string());
        }
        for c in batch.environment_collisions() {
            frame.env_collision_ids.push(c.object_id.raw());
            for contact in &c.contacts {
                frame.env_collision_contacts.extend_from_slice(&contact.normal);
                frame.env_collision_contacts.extend_from_slice(&contact.point);
            }
            frame.env_collision_states.push(c.state.as_str().to_string());
        }

        // Only trial objects, in static order.
        for id in object_ids {
            if let Some(p) = batch.particles_of(*id) {
                frame.particles.push(ParticleData {
                    id: *id,
                    particles: p.particles.iter().flatten().copied().collect(),
                    velocities: p.velocities.iter().flatten().copied().collect(),
                });
            }
        }
        frame
    }

    /// Writes the frame's datasets under `frames/NNNN/`.
    pub(crate) fn write_to(
        &self,
        archive: &mut ArchiveWriter,
        frame: u32,
        with_collisions: bool,
    ) -> PhysgenResult<()> {
        let path = |rel: &str| frame_path(frame, rel);

        for pass in &self.images {
            archive.write(
                &path(&format!("images/{}", pass.pass_mask)),
                &Dataset::bytes(pass.data.clone()),
            )?;
        }
        if let Some(cam) = &self.camera {
            archive.write(
                &path("camera_matrices/projection_matrix"),
                &Dataset::f32s(cam.projection_matrix.to_vec()),
            )?;
            archive.write(
                &path("camera_matrices/camera_matrix"),
                &Dataset::f32s(cam.camera_matrix.to_vec()),
            )?;
        }

        archive.write(
            &path("objects/positions"),
            &Dataset::f32_shaped(vec![self.object_count, 3], self.positions.clone())?,
        )?;
        archive.write(
            &path("objects/forwards"),
            &Dataset::f32_shaped(vec![self.object_count, 3], self.forwards.clone())?,
        )?;
        archive.write(
            &path("objects/rotations"),
            &Dataset::f32_shaped(vec![self.object_count, 4], self.rotations.clone())?,
        )?;
        if let Some(vel) = &self.velocities {
            archive.write(
                &path("objects/velocities"),
                &Dataset::f32_shaped(vec![self.object_count, 3], vel.clone())?,
            )?;
        }
        if let Some(ang) = &self.angular_velocities {
            archive.write(
                &path("objects/angular_velocities"),
                &Dataset::f32_shaped(vec![self.object_count, 3], ang.clone())?,
            )?;
        }
        if !self.missing.is_empty() {
            archive.write(
                &path("missing_object_ids"),
                &Dataset::i32s(self.missing.iter().map(|id| id.raw()).collect()),
            )?;
        }

        if with_collisions {
            let k = self.collision_states.len();
            archive.write(
                &path("collisions/object_ids"),
                &Dataset::new(
                    vec![k, 2],
                    physgen_archive::Data::I32(self.collision_ids.clone()),
                )?,
            )?;
            archive.write(
                &path("collisions/relative_velocities"),
                &Dataset::f32_shaped(vec![k, 3], self.collision_relative_velocities.clone())?,
            )?;
            archive.write(
                &path("collisions/contacts"),
                &Dataset::f32_shaped(
                    vec![self.collision_contacts.len() / 6, 2, 3],
                    self.collision_contacts.clone(),
                )?,
            )?;
            archive.write(
                &path("collisions/states"),
                &Dataset::strings(self.collision_states.clone()),
            )?;

            archive.write(
                &path("env_collisions/object_ids"),
                &Dataset::i32s(self.env_collision_ids.clone()),
            )?;
            archive.write(
                &path("env_collisions/contacts"),
                &Dataset::f32_shaped(
                    vec![self.env_collision_contacts.len() / 6, 2, 3],
                    self.env_collision_contacts.clone(),
                )?,
            )?;
            archive.write(
                &path("env_collisions/states"),
                &Dataset::strings(self.env_collision_states.clone()),
            )?;
        }

        for p in &self.particles {
            archive.write(
                &path(&format!("particles/{}", p.id)),
                &Dataset::f32_shaped(vec![p.particles.len() / 4, 4], p.particles.clone())?,
            )?;
            archive.write(
                &path(&format!("velocities/{}", p.id)),
                &Dataset::f32_shaped(vec![p.velocities.len() / 3, 3], p.velocities.clone())?,
            )?;
        }
        Ok(())
    }
}

/// The "everything has stopped moving" heuristic.
///
/// True when every rigid body the host reports is sleeping, ignoring bodies
/// whose y-position is below [`FLOOR_EXCLUSION_Y`]. A body without a
/// transform this frame counts as awake. Without any rigid-body entries
/// the hint is false.
pub fn sleep_hint(batch: &ResponseBatch) -> bool {
    let mut any = false;
    for body in batch.rigidbodies() {
        any = true;
        if body.sleeping {
            continue;
        }
        match batch.transform_of(body.id) {
            Some(t) if t.position[1] < FLOOR_EXCLUSION_Y => continue,
            _ => return false,
        }
    }
    any
}
