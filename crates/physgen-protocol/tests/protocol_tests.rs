//! Integration tests for physgen-protocol.

use std::io::Cursor;

use physgen_protocol::framing::{read_request, read_response, write_request, write_response};
use physgen_protocol::records::{
    Collision, CollisionState, Contact, RigidbodyEntry, Rigidbodies, TransformEntry, Transforms,
};
use physgen_protocol::{
    Command, Frequency, RecordKind, ResponseBatch, ResponseRecord, ScriptedHost, SimulationHost,
};
use physgen_types::{ObjectId, Vector3};

fn transforms(ids: &[i32]) -> ResponseRecord {
    ResponseRecord::Transforms(Transforms {
        entries: ids
            .iter()
            .map(|&id| TransformEntry {
                id: ObjectId(id),
                position: [id as f32, 0.0, 0.0],
                forward: [0.0, 0.0, 1.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
            })
            .collect(),
    })
}

// ─── Command Tests ────────────────────────────────────────────

#[test]
fn command_is_tagged_by_type() {
    let json = serde_json::to_value(Command::SetMass {
        id: ObjectId(3),
        mass: 2.5,
    })
    .unwrap();
    assert_eq!(json["$type"], "set_mass");
    assert_eq!(json["id"], 3);
    assert_eq!(json["mass"], 2.5);
}

#[test]
fn unit_command_has_only_type() {
    let json = serde_json::to_string(&Command::Terminate).unwrap();
    assert_eq!(json, r#"{"$type":"terminate"}"#);
}

#[test]
fn add_object_skips_empty_url() {
    let json = serde_json::to_value(Command::AddObject {
        name: "cube".into(),
        url: String::new(),
        scale_factor: 1.0,
        position: Vector3::ZERO,
        rotation: Vector3::ZERO,
        id: ObjectId(1),
    })
    .unwrap();
    assert!(json.get("url").is_none());
    assert_eq!(json["position"]["y"], 0.0);
}

#[test]
fn frequency_is_lowercase() {
    let json = serde_json::to_value(Command::SendTransforms {
        frequency: Frequency::Always,
    })
    .unwrap();
    assert_eq!(json["frequency"], "always");
}

#[test]
fn type_name_matches_tag() {
    assert_eq!(Command::UnloadAssetBundles.type_name(), "unload_asset_bundles");
    assert_eq!(
        Command::DestroyFlexObject { id: ObjectId(1) }.type_name(),
        "destroy_flex_object"
    );
}

// ─── Record Tests ─────────────────────────────────────────────

#[test]
fn record_tag_lookup() {
    for kind in RecordKind::all() {
        assert_eq!(RecordKind::from_tag(kind.tag()), Some(*kind));
    }
    assert_eq!(RecordKind::from_tag(b"zzzz"), None);
}

#[test]
fn unknown_record_is_skipped() {
    let mut raw = b"zzzz".to_vec();
    raw.extend_from_slice(&[1, 2, 3]);
    assert!(ResponseRecord::decode(&raw).unwrap().is_none());
}

#[test]
fn truncated_record_is_an_error() {
    assert!(ResponseRecord::decode(b"tr").is_err());
    let mut raw = b"tran".to_vec();
    raw.extend_from_slice(&[9, 9]);
    assert!(ResponseRecord::decode(&raw).is_err());
}

#[test]
fn batch_decodes_trailer_frame() {
    let batch = ResponseBatch::new(vec![transforms(&[1, 2])], 17);
    let raw = batch.encode().unwrap();
    assert_eq!(raw.last().unwrap(), &17u32.to_le_bytes().to_vec());
    let decoded = ResponseBatch::decode(&raw).unwrap();
    assert_eq!(decoded, batch);
}

#[test]
fn batch_drops_undecodable_record() {
    let batch = ResponseBatch::new(
        vec![
            transforms(&[1, 2]),
            ResponseRecord::Rigidbodies(Rigidbodies { entries: vec![] }),
        ],
        5,
    );
    let mut raw = batch.encode().unwrap();
    raw[0].truncate(7);

    let decoded = ResponseBatch::decode(&raw).unwrap();
    assert_eq!(decoded.frame, 5);
    assert!(!decoded.contains(RecordKind::Transforms));
    assert!(decoded.contains(RecordKind::Rigidbodies));
}

#[test]
fn batch_without_trailer_is_rejected() {
    assert!(ResponseBatch::decode(&[]).is_err());
    assert!(ResponseBatch::decode(&[vec![1, 2, 3]]).is_err());
}

#[test]
fn batch_lookup_by_id() {
    let batch = ResponseBatch::new(
        vec![
            transforms(&[4, 7]),
            ResponseRecord::Rigidbodies(Rigidbodies {
                entries: vec![RigidbodyEntry {
                    id: ObjectId(7),
                    velocity: [1.0, 0.0, 0.0],
                    angular_velocity: [0.0; 3],
                    sleeping: false,
                }],
            }),
            ResponseRecord::Collision(Collision {
                collider_id: ObjectId(4),
                collidee_id: ObjectId(7),
                state: CollisionState::Enter,
                relative_velocity: [0.0; 3],
                contacts: vec![Contact {
                    normal: [0.0, 1.0, 0.0],
                    point: [0.0; 3],
                }],
            }),
        ],
        0,
    );
    assert!(batch.contains(RecordKind::Transforms));
    assert!(!batch.contains(RecordKind::Images));
    assert_eq!(batch.transform_of(ObjectId(7)).unwrap().position[0], 7.0);
    assert!(batch.transform_of(ObjectId(9)).is_none());
    assert_eq!(batch.rigidbodies().count(), 1);
    assert_eq!(batch.collisions().next().unwrap().state.as_str(), "enter");
}

// ─── Framing Tests ────────────────────────────────────────────

#[test]
fn request_frame_round_trip() {
    let commands = vec![
        Command::StepPhysics { frames: 1 },
        Command::DestroyObject { id: ObjectId(2) },
    ];
    let mut buf = Vec::new();
    write_request(&mut buf, &commands).unwrap();
    let len = u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize;
    assert_eq!(len, buf.len() - 4);
    let decoded = read_request(&mut Cursor::new(buf)).unwrap();
    assert_eq!(decoded, commands);
}

#[test]
fn response_frame_round_trip() {
    let raw = ResponseBatch::new(vec![transforms(&[1])], 3).encode().unwrap();
    let mut buf = Vec::new();
    write_response(&mut buf, &raw).unwrap();
    let read = read_response(&mut Cursor::new(buf)).unwrap();
    assert_eq!(read, raw);
}

#[test]
fn oversized_record_count_rejected() {
    let buf = u32::MAX.to_le_bytes().to_vec();
    assert!(read_response(&mut Cursor::new(buf)).is_err());
}

// ─── Scripted Host Tests ──────────────────────────────────────

#[test]
fn scripted_host_reports_requested_outputs() {
    let mut host = ScriptedHost::new();
    let batch = host
        .communicate(&[
            Command::AddObject {
                name: "cube".into(),
                url: String::new(),
                scale_factor: 1.0,
                position: Vector3::new(0.0, 2.0, 0.0),
                rotation: Vector3::ZERO,
                id: ObjectId(5),
            },
            Command::SendTransforms {
                frequency: Frequency::Always,
            },
            Command::SendVolumes {
                frequency: Frequency::Once,
            },
        ])
        .unwrap();
    assert_eq!(batch.frame, 0);
    assert_eq!(batch.transform_of(ObjectId(5)).unwrap().position[1], 2.0);
    assert_eq!(batch.volumes().count(), 1);

    let next = host.communicate(&[]).unwrap();
    assert_eq!(next.frame, 1);
    assert!(next.contains(RecordKind::Transforms));
    assert!(!next.contains(RecordKind::Volumes));
}

#[test]
fn scripted_host_drops_records_on_request() {
    let mut host = ScriptedHost::new().drop_record_on_call(1, RecordKind::Transforms);
    host.communicate(&[Command::SendTransforms {
        frequency: Frequency::Always,
    }])
    .unwrap();
    assert!(!host.communicate(&[]).unwrap().contains(RecordKind::Transforms));
    assert!(host.communicate(&[]).unwrap().contains(RecordKind::Transforms));
}

#[test]
fn scripted_host_corrupts_records_on_request() {
    let mut host = ScriptedHost::new().corrupt_record_on_call(1, RecordKind::Transforms);
    host.communicate(&[
        Command::SendTransforms {
            frequency: Frequency::Always,
        },
        Command::SendRigidbodies {
            frequency: Frequency::Always,
        },
    ])
    .unwrap();
    let damaged = host.communicate(&[]).unwrap();
    assert!(!damaged.contains(RecordKind::Transforms));
    assert!(damaged.contains(RecordKind::Rigidbodies));
    assert!(host.communicate(&[]).unwrap().contains(RecordKind::Transforms));
}

#[test]
fn scripted_host_rejects_after_terminate() {
    let mut host = ScriptedHost::new();
    host.communicate(&[Command::Terminate]).unwrap();
    assert!(host.is_terminated());
    assert!(host.communicate(&[]).is_err());
    assert_eq!(host.sent().len(), 1);
}
