//! Integration tests for physgen-archive.

use physgen_archive::{Archive, ArchiveWriter, Data, Dataset, FORMAT_VERSION, MAGIC};

// ─── Dataset Tests ────────────────────────────────────────────

#[test]
fn shape_must_match_length() {
    assert!(Dataset::new(vec![2, 3], Data::F32(vec![0.0; 6])).is_ok());
    assert!(Dataset::new(vec![2, 3], Data::F32(vec![0.0; 5])).is_err());
}

#[test]
fn empty_table_keeps_trailing_dims() {
    let ds = Dataset::f32_shaped(vec![0, 2, 3], Vec::new()).unwrap();
    assert_eq!(ds.shape(), &[0, 2, 3]);
    assert!(ds.is_empty());
}

#[test]
fn rows_of_f32_table() {
    let ds = Dataset::f32_rows(3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(ds.rows(), 2);
    assert_eq!(ds.f32_row(1).unwrap(), &[4.0, 5.0, 6.0]);
    assert!(ds.f32_row(2).is_none());
}

#[test]
fn scalar_has_empty_shape() {
    let ds = Dataset::scalar_bool(true);
    assert!(ds.shape().is_empty());
    assert_eq!(ds.as_bool().unwrap(), &[true]);
    assert!(ds.as_f32().is_none());
}

#[test]
fn bool_list_is_one_dimensional() {
    let ds = Dataset::bools(vec![true, false, true]);
    assert_eq!(ds.shape(), &[3]);
    assert_eq!(ds.as_bool().unwrap(), &[true, false, true]);
}

// ─── Writer / Reader Tests ────────────────────────────────────

fn sample_archive(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("0000.phga");
    let mut w = ArchiveWriter::create(&path).unwrap();
    w.write("static/object_ids", &Dataset::i32s(vec![1, 2])).unwrap();
    w.write("static/drop_type", &Dataset::string("cube")).unwrap();
    w.write(
        "frames/0000/objects/positions",
        &Dataset::f32_rows(3, vec![0.0; 6]).unwrap(),
    )
    .unwrap();
    w.write(
        "frames/0001/objects/positions",
        &Dataset::f32_rows(3, vec![1.0; 6]).unwrap(),
    )
    .unwrap();
    w.write("frames/0000/images/_img", &Dataset::bytes(vec![0xFF, 0xD8]))
        .unwrap();
    assert_eq!(w.len(), 5);
    w.finish().unwrap()
}

#[test]
fn written_archive_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.len(), 5);
    assert_eq!(
        archive.require("static/object_ids").unwrap().as_i32().unwrap(),
        &[1, 2]
    );
    assert_eq!(
        archive.get("frames/0000/images/_img").unwrap().as_bytes().unwrap(),
        &[0xFF, 0xD8]
    );
    assert!(archive.get("frames/0002/objects/positions").is_none());
}

#[test]
fn hierarchy_is_rebuilt_from_paths() {
    let dir = tempfile::tempdir().unwrap();
    let archive = Archive::open(&sample_archive(dir.path())).unwrap();
    assert_eq!(archive.children(""), vec!["frames", "static"]);
    assert_eq!(archive.children("frames"), vec!["0000", "0001"]);
    assert_eq!(archive.children("frames/0000"), vec!["images", "objects"]);
    assert!(archive.has_group("static"));
    assert!(!archive.has_group("stat"));
}

#[test]
fn duplicate_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = ArchiveWriter::create(&dir.path().join("a.phga")).unwrap();
    w.write("static/x", &Dataset::scalar_f32(1.0)).unwrap();
    assert!(w.write("static/x", &Dataset::scalar_f32(2.0)).is_err());
    assert!(w.write("/abs", &Dataset::scalar_f32(2.0)).is_err());
    assert!(w.write("a//b", &Dataset::scalar_f32(2.0)).is_err());
}

#[test]
fn foreign_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.phga");
    std::fs::write(&path, b"HDF5....").unwrap();
    assert!(Archive::open(&path).is_err());
}

#[test]
fn truncated_entry_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
    assert!(Archive::open(&path).is_err());
}

#[test]
fn partial_length_prefix_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_archive(dir.path());
    let mut bytes = std::fs::read(&path).unwrap();
    assert!(Archive::open(&path).is_ok());

    for _ in 0..3 {
        bytes.push(0);
        std::fs::write(&path, &bytes).unwrap();
        let err = Archive::open(&path).unwrap_err();
        assert!(err.to_string().contains("truncated entry length"), "{err}");
    }
}

#[test]
fn oversized_entry_length_is_rejected() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    let err = Archive::from_reader(bytes.as_slice()).unwrap_err();
    assert!(err.to_string().contains("exceeds"), "{err}");
}
