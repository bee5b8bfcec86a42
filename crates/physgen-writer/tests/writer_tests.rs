//! Integration tests for physgen-writer.

use physgen_archive::Archive;
use physgen_protocol::records::{
    CameraMatrices, Collision, CollisionState, Contact, FlexParticleEntry, FlexParticles,
    ImagePass, Images, RigidbodyEntry, Rigidbodies, TransformEntry, Transforms,
};
use physgen_protocol::{FlexContainer, RecordKind, ResponseBatch, ResponseRecord};
use physgen_types::{Color, ObjectId, PhysgenError, Vector3};
use physgen_writer::{
    sleep_hint, FlexActor, FrameData, FrameLabels, LabelValue, ObjectStatic, PhysicsBackend,
    RigidParams, ScenarioValue, StaticSection, TrialLabels, TrialWriter,
};

fn object(id: i32, rigid: bool) -> ObjectStatic {
    ObjectStatic {
        id: ObjectId(id),
        model: format!("model_{id}"),
        scale: Vector3::new(0.5, 1.0, 2.0),
        color: Some(Color::rgb(0.1, 0.2, 0.3)),
        rigid: rigid.then_some(RigidParams {
            mass: 2.0,
            static_friction: 0.3,
            dynamic_friction: 0.4,
            bounciness: 0.5,
        }),
    }
}

fn section(ids: &[i32]) -> StaticSection {
    StaticSection {
        objects: ids.iter().map(|&id| object(id, true)).collect(),
        ..Default::default()
    }
}

fn transforms(entries: &[(i32, f32)]) -> ResponseRecord {
    ResponseRecord::Transforms(Transforms {
        entries: entries
            .iter()
            .map(|&(id, y)| TransformEntry {
                id: ObjectId(id),
                position: [id as f32, y, 0.0],
                forward: [0.0, 0.0, 1.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
            })
            .collect(),
    })
}

fn rigidbodies(entries: &[(i32, bool)]) -> ResponseRecord {
    ResponseRecord::Rigidbodies(Rigidbodies {
        entries: entries
            .iter()
            .map(|&(id, sleeping)| RigidbodyEntry {
                id: ObjectId(id),
                velocity: [0.0, -1.0, 0.0],
                angular_velocity: [0.0; 3],
                sleeping,
            })
            .collect(),
    })
}

fn images() -> ResponseRecord {
    ResponseRecord::Images(Images {
        avatar_id: "a".into(),
        width: 2,
        height: 2,
        passes: vec![ImagePass {
            pass_mask: "_img".into(),
            data: vec![1, 2, 3],
        }],
    })
}

fn camera() -> ResponseRecord {
    ResponseRecord::CameraMatrices(CameraMatrices {
        projection_matrix: [1.0; 16],
        camera_matrix: [2.0; 16],
    })
}

fn rigid_batch(ids: &[i32]) -> ResponseBatch {
    let t: Vec<(i32, f32)> = ids.iter().map(|&id| (id, 1.0)).collect();
    let r: Vec<(i32, bool)> = ids.iter().map(|&id| (id, false)).collect();
    ResponseBatch::new(vec![images(), transforms(&t), camera(), rigidbodies(&r)], 0)
}

// ─── Backend Tests ────────────────────────────────────────────

#[test]
fn backends_request_their_records() {
    let rigid = PhysicsBackend::Rigidbodies.expected_records();
    assert!(rigid.contains(&RecordKind::Rigidbodies));
    assert!(!rigid.contains(&RecordKind::FlexParticles));

    let flex = PhysicsBackend::Flex.expected_records();
    assert!(flex.contains(&RecordKind::FlexParticles));
    assert_eq!(PhysicsBackend::Flex.send_data_commands().len(), 3);
}

// ─── Ordering Tests ───────────────────────────────────────────

#[test]
fn frame_before_static_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    let err = writer.write_frame(0, &rigid_batch(&[1])).unwrap_err();
    assert!(matches!(err, PhysgenError::Writer(_)));
}

#[test]
fn static_section_is_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    writer.write_static(&section(&[1, 2])).unwrap();
    assert!(writer.write_static(&section(&[1, 2])).is_err());
    assert_eq!(writer.object_count(), 2);
}

#[test]
fn frames_must_be_contiguous() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    writer.write_static(&section(&[1])).unwrap();
    assert!(writer.write_frame(1, &rigid_batch(&[1])).is_err());
    writer.write_frame(0, &rigid_batch(&[1])).unwrap();
    assert!(writer.write_frame(0, &rigid_batch(&[1])).is_err());
    writer.write_frame(1, &rigid_batch(&[1])).unwrap();
    assert_eq!(writer.frames_written(), 2);
}

#[test]
fn labels_only_for_last_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    writer.write_static(&section(&[1])).unwrap();
    assert!(writer.write_labels(0, &FrameLabels::default()).is_err());
    writer.write_frame(0, &rigid_batch(&[1])).unwrap();
    writer.write_labels(0, &FrameLabels::default()).unwrap();
    assert!(writer.write_labels(0, &FrameLabels::default()).is_err());
}

// ─── Layout Tests ─────────────────────────────────────────────

#[test]
fn static_and_frame_object_counts_agree() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    writer.write_static(&section(&[4, 7, 9])).unwrap();
    for f in 0..3 {
        writer.write_frame(f, &rigid_batch(&[9, 4, 7])).unwrap();
    }
    let path = writer.finish().unwrap();
    let archive = Archive::open(&path).unwrap();

    assert_eq!(archive.require("static/object_ids").unwrap().as_i32(), Some(&[4, 7, 9][..]));
    assert_eq!(
        archive.children("frames"),
        vec!["0000".to_string(), "0001".into(), "0002".into()]
    );
    let positions = archive.require("frames/0002/objects/positions").unwrap();
    assert_eq!(positions.shape(), &[3, 3]);
    // Rows follow the static order, not the record order.
    assert_eq!(positions.f32_row(0), Some(&[4.0, 1.0, 0.0][..]));
    assert_eq!(positions.f32_row(2), Some(&[9.0, 1.0, 0.0][..]));
    assert_eq!(
        archive.require("frames/0000/objects/rotations").unwrap().shape(),
        &[3, 4]
    );
    assert!(archive.contains("frames/0000/images/_img"));
    assert!(archive.contains("frames/0000/camera_matrices/projection_matrix"));
    assert!(archive.contains("frames/0000/collisions/states"));
}

#[test]
fn missing_object_is_nan_and_listed() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    writer.write_static(&section(&[1, 2])).unwrap();
    writer.write_frame(0, &rigid_batch(&[1])).unwrap();
    let archive = Archive::open(&writer.finish().unwrap()).unwrap();

    let positions = archive.require("frames/0000/objects/positions").unwrap();
    assert!(positions.f32_row(1).unwrap().iter().all(|v| v.is_nan()));
    assert_eq!(
        archive.require("frames/0000/missing_object_ids").unwrap().as_i32(),
        Some(&[2][..])
    );
}

#[test]
fn static_section_columns() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    let mut s = StaticSection {
        objects: vec![object(1, true), object(2, false)],
        flex_actors: vec![FlexActor::Cloth {
            id: ObjectId(2),
            mass_scale: 1.0,
            mesh_tesselation: 1,
            stretch_stiffness: 0.1,
            bend_stiffness: 0.1,
            tether_stiffness: 0.0,
            tether_give: 0.0,
            pressure: 0.0,
        }],
        container: Some(FlexContainer {
            collision_distance: 0.001,
            static_friction: 1.0,
            dynamic_friction: 1.0,
            iteration_count: 12,
            substep_count: 12,
            radius: 0.1875,
            solid_rest: None,
            damping: 0.25,
            drag: 0.0,
        }),
        scenario: Vec::new(),
    };
    s.scenario
        .push(("drop_type".into(), ScenarioValue::Str("cube".into())));
    writer.write_static(&s).unwrap();
    let archive = Archive::open(&writer.finish().unwrap()).unwrap();

    let mass = archive.require("static/mass").unwrap().as_f32().unwrap();
    assert_eq!(mass[0], 2.0);
    assert!(mass[1].is_nan());
    assert_eq!(archive.require("static/color").unwrap().shape(), &[2, 3]);
    assert_eq!(
        archive.require("static/scale_z").unwrap().as_f32(),
        Some(&[2.0, 2.0][..])
    );
    assert_eq!(
        archive.require("static/cloth_actors/object_id").unwrap().as_f32(),
        Some(&[2.0][..])
    );
    assert!(archive.has_group("static/container"));
    assert_eq!(
        archive.require("static/drop_type").unwrap().as_strings(),
        Some(&["cube".to_string()][..])
    );
}

#[test]
fn collisions_and_particles_are_written() {
    let ids = [ObjectId(1), ObjectId(2)];
    let batch = ResponseBatch::new(
        vec![
            transforms(&[(1, 0.0), (2, 0.0)]),
            ResponseRecord::Collision(Collision {
                collider_id: ObjectId(1),
                collidee_id: ObjectId(2),
                state: CollisionState::Enter,
                relative_velocity: [1.0, 0.0, 0.0],
                contacts: vec![Contact {
                    normal: [0.0, 1.0, 0.0],
                    point: [0.5, 0.0, 0.0],
                }],
            }),
            ResponseRecord::FlexParticles(FlexParticles {
                entries: vec![FlexParticleEntry {
                    id: ObjectId(2),
                    particles: vec![[0.0, 1.0, 0.0, 1.0]; 3],
                    velocities: vec![[0.0; 3]; 3],
                }],
            }),
        ],
        0,
    );
    let data = FrameData::extract(&ids, &batch);
    assert_eq!(data.collision_ids, vec![1, 2]);
    assert_eq!(data.collision_contacts.len(), 6);
    assert_eq!(data.collision_states, vec!["enter".to_string()]);
    assert_eq!(data.particles.len(), 1);
    assert_eq!(data.particles[0].particles.len(), 12);
    assert!(data.velocities.is_none());
    assert!(data.missing.is_empty());
}

// ─── Sleep Heuristic Tests ────────────────────────────────────

#[test]
fn sleep_hint_requires_rigidbodies() {
    let batch = ResponseBatch::new(vec![transforms(&[(1, 0.0)])], 0);
    assert!(!sleep_hint(&batch));
}

#[test]
fn sleep_hint_when_all_sleeping() {
    let batch = ResponseBatch::new(
        vec![
            transforms(&[(1, 0.0), (2, 0.0)]),
            rigidbodies(&[(1, true), (2, true)]),
        ],
        0,
    );
    assert!(sleep_hint(&batch));
}

#[test]
fn sleep_hint_false_when_one_awake() {
    let batch = ResponseBatch::new(
        vec![
            transforms(&[(1, 0.0), (2, 0.0)]),
            rigidbodies(&[(1, true), (2, false)]),
        ],
        0,
    );
    assert!(!sleep_hint(&batch));
}

#[test]
fn sleep_hint_ignores_fallen_objects() {
    let batch = ResponseBatch::new(
        vec![
            transforms(&[(1, 0.0), (2, -5.0)]),
            rigidbodies(&[(1, true), (2, false)]),
        ],
        0,
    );
    assert!(sleep_hint(&batch));
}

#[test]
fn sleep_hint_treats_untracked_body_as_awake() {
    let batch = ResponseBatch::new(
        vec![transforms(&[(1, 0.0)]), rigidbodies(&[(1, true), (2, false)])],
        0,
    );
    assert!(!sleep_hint(&batch));
}

// ─── Trial Label Tests ────────────────────────────────────────

fn labelled_trial(moves: &[bool]) -> Archive {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    writer.write_static(&section(&[1])).unwrap();
    for (f, moved) in moves.iter().enumerate() {
        let f = f as u32;
        writer.write_frame(f, &rigid_batch(&[1])).unwrap();
        let last = f as usize == moves.len() - 1;
        let labels = FrameLabels {
            trial_end: last,
            trial_complete: last,
            ..Default::default()
        }
        .with("target_has_moved", LabelValue::Bool(*moved))
        .with(
            "target_delta_position",
            LabelValue::Vec3(Vector3::new(0.12345 * f as f32, 0.0, -0.0004)),
        );
        writer.write_labels(f, &labels).unwrap();
    }
    Archive::open(&writer.finish().unwrap()).unwrap()
}

#[test]
fn trial_labels_from_archive() {
    let archive = labelled_trial(&[false, false, true, true]);
    let labels = TrialLabels::from_archive(&archive).unwrap();
    assert_eq!(labels.num_frames, 4);
    assert_eq!(labels.is_trial_valid, Some(true));
    assert_eq!(labels.is_trial_timeout, Some(false));
    assert_eq!(labels.is_trial_complete, Some(true));
    assert_eq!(labels.does_target_move, Some(true));
    assert_eq!(labels.first_target_move_frame, Some(2));
    let disp = labels.final_target_displacement.unwrap();
    assert_eq!(disp.x, 0.37);
    assert_eq!(disp.y, 0.0);
    assert_eq!(disp.z, 0.0);
}

#[test]
fn trial_labels_absent_without_frame_labels() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrialWriter::create(&dir.path().join("t.phga")).unwrap();
    writer.write_static(&section(&[1])).unwrap();
    writer.write_frame(0, &rigid_batch(&[1])).unwrap();
    let archive = Archive::open(&writer.finish().unwrap()).unwrap();

    let labels = TrialLabels::from_archive(&archive).unwrap();
    assert_eq!(labels.num_frames, 1);
    assert_eq!(labels.is_trial_valid, None);
    assert_eq!(labels.does_target_move, None);
    assert_eq!(labels.final_target_displacement, None);
}

#[test]
fn trial_labels_serialize_to_json() {
    let labels = TrialLabels {
        num_frames: 3,
        ..Default::default()
    };
    let json = serde_json::to_value(&labels).unwrap();
    assert_eq!(json["num_frames"], 3);
    assert!(json["is_trial_valid"].is_null());
}
