//! Integration tests for physgen-runner.

use std::fs;
use std::path::Path;

use physgen_archive::Archive;
use physgen_catalog::{LibrarySet, PhysicsCatalog};
use physgen_protocol::{Command, RecordKind, ScriptedHost, SimulationHost};
use physgen_runner::{
    existing_trials, publish, publish_by_copy, trial_file_name, DatasetDriver, DriverOptions,
    RunMetadata, RunnerSettings, TrialRunner, METADATA_FILE,
};
use physgen_scenario::{global_scene_commands, Scenario, ScenarioConfig, ScenarioKind};
use physgen_telemetry::{EventKind, VecSink};
use physgen_types::constants::MAX_FRAME_CAP;
use physgen_types::PhysgenError;
use physgen_writer::layout::{frame_path, static_path};
use physgen_writer::TrialLabels;

fn runner(settings: RunnerSettings) -> TrialRunner {
    TrialRunner::seeded(
        settings,
        7,
        LibrarySet::with_defaults().unwrap(),
        PhysicsCatalog::with_defaults().unwrap(),
    )
}

fn scenario(kind: ScenarioKind) -> Box<dyn Scenario> {
    let libraries = LibrarySet::with_defaults().unwrap();
    ScenarioConfig::default_for(kind).build(&libraries).unwrap()
}

/// Sends the scene setup so the host streams images. Uses call 0.
fn setup(host: &mut ScriptedHost, scenario: &dyn Scenario) {
    host.communicate(&global_scene_commands(
        8,
        8,
        scenario.scene_commands(),
        scenario.field_of_view(),
    ))
    .unwrap();
}

fn metadata() -> RunMetadata {
    RunMetadata {
        scenario: "drop".into(),
        config: serde_json::Value::Null,
        seed: 7,
        random: false,
        num_trials: 0,
        width: 8,
        height: 8,
        version: "test".into(),
    }
}

fn label_bool(archive: &Archive, frame: u32, key: &str) -> bool {
    archive
        .require(&frame_path(frame, &format!("labels/{key}")))
        .unwrap()
        .as_bool()
        .unwrap()[0]
}

fn label_i32(archive: &Archive, frame: u32, key: &str) -> i32 {
    archive
        .require(&frame_path(frame, &format!("labels/{key}")))
        .unwrap()
        .as_i32()
        .unwrap()[0]
}

// ─── Trial runner ─────────────────────────────────────────────

#[test]
fn sleeping_objects_end_the_trial() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(5);
    setup(&mut host, drop.as_ref());

    let mut runner = runner(RunnerSettings::default());
    let summary = runner.run_trial(&mut host, drop.as_mut(), 0, &path).unwrap();

    assert_eq!(summary.frames, 6);
    assert_eq!(summary.object_count, 2);
    assert!(!summary.timed_out);
    assert_eq!(summary.retried_exchanges, 0);

    let archive = Archive::open(&path).unwrap();
    assert!(label_bool(&archive, 5, "trial_end"));
    assert!(label_bool(&archive, 5, "trial_complete"));
    assert!(!label_bool(&archive, 4, "trial_end"));
    assert!(!label_bool(&archive, 5, "trial_timeout"));
}

#[test]
fn static_section_matches_frame_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(3);
    setup(&mut host, drop.as_ref());

    runner(RunnerSettings::default())
        .run_trial(&mut host, drop.as_mut(), 1, &path)
        .unwrap();

    let archive = Archive::open(&path).unwrap();
    let ids = archive.require(&static_path("object_ids")).unwrap();
    assert_eq!(ids.len(), 2);
    for frame in 0..4 {
        let positions = archive
            .require(&frame_path(frame, "objects/positions"))
            .unwrap();
        assert_eq!(positions.rows(), 2);
    }
    let labels = TrialLabels::from_archive(&archive).unwrap();
    assert_eq!(labels.num_frames, 4);
    assert_eq!(labels.is_trial_valid, Some(true));
    assert_eq!(labels.is_trial_complete, Some(true));
}

#[test]
fn frame_cap_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new();
    setup(&mut host, drop.as_ref());

    let settings = RunnerSettings {
        frame_cap: 20,
        ..RunnerSettings::default()
    };
    let summary = runner(settings)
        .run_trial(&mut host, drop.as_mut(), 1, &path)
        .unwrap();

    assert_eq!(summary.frames, 20);
    assert!(summary.timed_out);
    let archive = Archive::open(&path).unwrap();
    assert!(label_bool(&archive, 19, "trial_timeout"));
    assert!(!label_bool(&archive, 19, "trial_complete"));
    let labels = TrialLabels::from_archive(&archive).unwrap();
    assert_eq!(labels.is_trial_timeout, Some(true));
}

#[test]
fn frame_cap_is_bounded_by_frame_name_width() {
    let ok = RunnerSettings {
        frame_cap: MAX_FRAME_CAP,
        ..RunnerSettings::default()
    };
    assert!(ok.validate().is_ok());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new();
    setup(&mut host, drop.as_ref());

    for frame_cap in [0, MAX_FRAME_CAP + 1] {
        let settings = RunnerSettings {
            frame_cap,
            ..RunnerSettings::default()
        };
        let err = runner(settings)
            .run_trial(&mut host, drop.as_mut(), 0, &path)
            .unwrap_err();
        assert!(matches!(err, PhysgenError::InvalidConfig(_)), "{err}");
    }
    assert!(!path.exists());
    // Only the scene setup reached the host.
    assert_eq!(host.calls(), 1);
}

#[test]
fn missing_record_retries_the_same_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    // Call 0 is the scene setup, call k + 1 answers frame k.
    let mut host = ScriptedHost::new()
        .sleep_after(6)
        .drop_record_on_call(3, RecordKind::Images);
    setup(&mut host, drop.as_ref());

    let sink = VecSink::new();
    let mut runner = runner(RunnerSettings::default());
    runner.bus_mut().add_sink(Box::new(sink.clone()));
    let summary = runner.run_trial(&mut host, drop.as_mut(), 1, &path).unwrap();

    assert_eq!(summary.retried_exchanges, 1);
    let archive = Archive::open(&path).unwrap();
    assert_eq!(TrialLabels::from_archive(&archive).unwrap().num_frames, summary.frames as usize);
    assert_eq!(label_i32(&archive, 2, "retried_exchanges"), 1);
    assert_eq!(label_i32(&archive, 3, "retried_exchanges"), 0);

    let retries: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e.kind {
            EventKind::FrameRetry {
                frame,
                missing,
                attempt,
            } => Some((frame, missing, attempt)),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![(2, "imag".to_string(), 1)]);
}

#[test]
fn corrupt_record_retries_the_same_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new()
        .sleep_after(6)
        .corrupt_record_on_call(3, RecordKind::Transforms);
    setup(&mut host, drop.as_ref());

    let summary = runner(RunnerSettings::default())
        .run_trial(&mut host, drop.as_mut(), 1, &path)
        .unwrap();

    assert_eq!(summary.retried_exchanges, 1);
    let archive = Archive::open(&path).unwrap();
    assert_eq!(label_i32(&archive, 2, "retried_exchanges"), 1);
    let positions = archive
        .require(&frame_path(2, "objects/positions"))
        .unwrap()
        .as_f32()
        .unwrap();
    assert!(positions.iter().all(|v| v.is_finite()));
}

#[test]
fn retries_are_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new()
        .drop_record_on_call(2, RecordKind::Rigidbodies)
        .drop_record_on_call(3, RecordKind::Rigidbodies)
        .drop_record_on_call(4, RecordKind::Rigidbodies);
    setup(&mut host, drop.as_ref());

    let settings = RunnerSettings {
        max_frame_retries: 2,
        ..RunnerSettings::default()
    };
    let sink = VecSink::new();
    let mut runner = runner(settings);
    runner.bus_mut().add_sink(Box::new(sink.clone()));
    let err = runner
        .run_trial(&mut host, drop.as_mut(), 1, &path)
        .unwrap_err();
    assert!(matches!(err, PhysgenError::MissingRecord("rigi")));

    // The failed trial's events are delivered without waiting for the run to end.
    assert_eq!(runner.bus().pending(), 0);
    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e.kind, EventKind::TrialBegin { object_count: 2 })));
    let retries = events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::FrameRetry { .. }))
        .count();
    assert_eq!(retries, 2);
}

#[test]
fn trial_events_are_delivered_when_the_trial_ends() {
    let dir = tempfile::tempdir().unwrap();
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(2);
    setup(&mut host, drop.as_ref());

    let sink = VecSink::new();
    let mut runner = runner(RunnerSettings::default());
    runner.bus_mut().add_sink(Box::new(sink.clone()));
    runner
        .run_trial(&mut host, drop.as_mut(), 0, &dir.path().join("a.phga"))
        .unwrap();
    let first = sink.events();
    assert!(!first.is_empty());
    assert!(first.iter().all(|e| e.trial == 0));

    runner
        .run_trial(&mut host, drop.as_mut(), 1, &dir.path().join("b.phga"))
        .unwrap();
    assert!(sink.events().iter().any(|e| e.trial == 1));
    assert!(!runner.bus().is_finalized());
}

#[test]
fn objects_are_destroyed_after_the_trial() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(2);
    setup(&mut host, drop.as_ref());

    runner(RunnerSettings::default())
        .run_trial(&mut host, drop.as_mut(), 1, &path)
        .unwrap();

    assert!(host.live_objects().is_empty());
    let last = host.sent().last().unwrap();
    assert_eq!(last.len(), 2);
    assert!(last
        .iter()
        .all(|c| matches!(c, Command::DestroyObject { .. })));
}

#[test]
fn flex_objects_use_flex_destroy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut draping = scenario(ScenarioKind::Draping);
    let mut host = ScriptedHost::new();
    setup(&mut host, draping.as_ref());

    let summary = runner(RunnerSettings::default())
        .run_trial(&mut host, draping.as_mut(), 1, &path)
        .unwrap();

    // Draping ends after frame 150.
    assert_eq!(summary.frames, 152);
    let last = host.sent().last().unwrap();
    assert!(last
        .iter()
        .all(|c| matches!(c, Command::DestroyFlexObject { .. })));
    assert!(host.live_objects().is_empty());
}

#[test]
fn unload_is_sent_every_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trial.phga");
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(1);
    setup(&mut host, drop.as_ref());

    let settings = RunnerSettings {
        unload_interval: 2,
        ..RunnerSettings::default()
    };
    let mut runner = runner(settings);
    let mut firsts = Vec::new();
    for trial in 0..3 {
        let before = host.calls();
        runner
            .run_trial(&mut host, drop.as_mut(), trial, &path)
            .unwrap();
        firsts.push(host.sent()[before][0].clone());
    }
    assert_eq!(firsts[0], Command::UnloadAssetBundles);
    assert_ne!(firsts[1], Command::UnloadAssetBundles);
    assert_eq!(firsts[2], Command::UnloadAssetBundles);
}

#[test]
fn ids_are_not_reused_across_trials() {
    let dir = tempfile::tempdir().unwrap();
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(1);
    setup(&mut host, drop.as_ref());

    let mut runner = runner(RunnerSettings::default());
    let mut ids = Vec::new();
    for trial in 1..3 {
        let path = dir.path().join(format!("{trial}.phga"));
        runner
            .run_trial(&mut host, drop.as_mut(), trial, &path)
            .unwrap();
        let archive = Archive::open(&path).unwrap();
        ids.extend_from_slice(
            archive
                .require(&static_path("object_ids"))
                .unwrap()
                .as_i32()
                .unwrap(),
        );
    }
    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
}

// ─── Driver ───────────────────────────────────────────────────

fn driver(dir: &Path, num: u32) -> DatasetDriver {
    let mut options = DriverOptions::new(dir.join("out"), dir.join("tmp/temp.phga"), num);
    options.width = 8;
    options.height = 8;
    DatasetDriver::new(options, runner(RunnerSettings::default()))
}

#[test]
fn trial_file_names_are_zero_padded() {
    assert_eq!(trial_file_name(0), "0000.phga");
    assert_eq!(trial_file_name(42), "0042.phga");
}

#[test]
fn existing_trials_ignores_other_files() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["0003.phga", "0001.phga", "temp.phga", "0002.txt", "metadata.json"] {
        fs::write(dir.path().join(name), b"x").unwrap();
    }
    assert_eq!(existing_trials(dir.path()).unwrap(), vec![1, 3]);
    assert!(existing_trials(&dir.path().join("absent")).unwrap().is_empty());
}

#[test]
fn publish_moves_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let temp = dir.path().join("temp.phga");
    let dest = dir.path().join("0000.phga");
    fs::write(&temp, b"archive").unwrap();
    publish(&temp, &dest).unwrap();
    assert!(!temp.exists());
    assert_eq!(fs::read(&dest).unwrap(), b"archive");
}

#[test]
fn publish_by_copy_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let temp = dir.path().join("temp.phga");
    let dest = dir.path().join("0004.phga");
    fs::write(&temp, b"archive").unwrap();

    publish_by_copy(&temp, &dest).unwrap();
    assert!(!temp.exists());
    assert_eq!(fs::read(&dest).unwrap(), b"archive");
    assert!(!dir.path().join("0004.phga.part").exists());

    // A failed copy leaves neither the final name nor the partial copy.
    let missing = dir.path().join("missing.phga");
    let dest = dir.path().join("0005.phga");
    assert!(publish_by_copy(&missing, &dest).is_err());
    assert!(!dest.exists());
    assert!(!dir.path().join("0005.phga.part").exists());
}

#[test]
fn driver_writes_all_trials_and_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(2);
    let mut driver = driver(dir.path(), 3);

    let summary = driver.run(&mut host, drop.as_mut(), &metadata()).unwrap();

    assert_eq!(summary.written, vec![0, 1, 2]);
    assert!(summary.skipped.is_empty());
    for trial in 0..3 {
        let archive = Archive::open(&driver.trial_path(trial)).unwrap();
        assert!(TrialLabels::from_archive(&archive).unwrap().num_frames > 0);
    }
    assert!(!dir.path().join("tmp/temp.phga").exists());
    assert!(host.is_terminated());
    assert!(matches!(host.sent()[0][0], Command::SetScreenSize { width: 8, height: 8 }));

    let json = fs::read_to_string(dir.path().join("out").join(METADATA_FILE)).unwrap();
    let parsed: RunMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, metadata());
}

#[test]
fn driver_resumes_after_highest_trial() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("0000.phga"), b"done").unwrap();
    fs::write(out.join("0002.phga"), b"done").unwrap();

    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(2);
    let sink = VecSink::new();
    let mut driver = driver(dir.path(), 4);
    driver.runner_mut().bus_mut().add_sink(Box::new(sink.clone()));

    let summary = driver.run(&mut host, drop.as_mut(), &metadata()).unwrap();

    assert_eq!(summary.written, vec![3]);
    assert_eq!(summary.skipped, vec![2]);
    assert!(!out.join("0001.phga").exists());
    assert_eq!(fs::read(out.join("0002.phga")).unwrap(), b"done");
    assert!(sink
        .events()
        .iter()
        .any(|e| e.trial == 2 && e.kind == EventKind::TrialSkipped));
}

#[test]
fn rerunning_a_finished_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut drop = scenario(ScenarioKind::Drop);

    let mut host = ScriptedHost::new().sleep_after(2);
    driver(dir.path(), 2)
        .run(&mut host, drop.as_mut(), &metadata())
        .unwrap();
    let first = fs::read(dir.path().join("out/0001.phga")).unwrap();

    let mut host = ScriptedHost::new().sleep_after(2);
    let summary = driver(dir.path(), 2)
        .run(&mut host, drop.as_mut(), &metadata())
        .unwrap();

    assert!(summary.written.is_empty());
    assert_eq!(summary.skipped, vec![1]);
    // Scene setup and terminate only.
    assert_eq!(host.calls(), 2);
    assert_eq!(fs::read(dir.path().join("out/0001.phga")).unwrap(), first);
}

#[test]
fn stale_temp_file_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("tmp")).unwrap();
    fs::write(dir.path().join("tmp/temp.phga"), b"partial").unwrap();

    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(2);
    let mut driver = driver(dir.path(), 1);
    driver.run(&mut host, drop.as_mut(), &metadata()).unwrap();

    assert!(!dir.path().join("tmp/temp.phga").exists());
    assert!(Archive::open(&driver.trial_path(0)).is_ok());
}

#[test]
fn driver_reports_run_events() {
    let dir = tempfile::tempdir().unwrap();
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(2);
    let sink = VecSink::new();
    let mut driver = driver(dir.path(), 2);
    driver.runner_mut().bus_mut().add_sink(Box::new(sink.clone()));
    driver.run(&mut host, drop.as_mut(), &metadata()).unwrap();

    let events = sink.events();
    assert!(matches!(
        events.first().map(|e| &e.kind),
        Some(EventKind::RunBegin { first_trial: 0, num_trials: 2, .. })
    ));
    let ends = events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::TrialEnd { .. }))
        .count();
    assert_eq!(ends, 2);
    assert_eq!(
        events.last().map(|e| &e.kind),
        Some(&EventKind::RunEnd { trials_written: 2 })
    );
}

#[test]
fn failed_trial_is_never_published() {
    let dir = tempfile::tempdir().unwrap();
    let mut drop = scenario(ScenarioKind::Drop);
    // Trial 0 sleeps after a few frames; every later response lacks rigid
    // bodies, so trial 1 exhausts its retries.
    let mut host = ScriptedHost::new().sleep_after(2);
    for call in 6..60 {
        host = host.drop_record_on_call(call, RecordKind::Rigidbodies);
    }
    let sink = VecSink::new();
    let mut driver = driver(dir.path(), 3);
    driver.runner_mut().bus_mut().add_sink(Box::new(sink.clone()));

    let err = driver.run(&mut host, drop.as_mut(), &metadata()).unwrap_err();
    assert!(matches!(err, PhysgenError::MissingRecord("rigi")));

    assert!(Archive::open(&driver.trial_path(0)).is_ok());
    assert!(!driver.trial_path(1).exists());
    assert!(!driver.trial_path(2).exists());
    assert_eq!(existing_trials(&dir.path().join("out")).unwrap(), vec![0]);
    assert!(!host.is_terminated());

    assert!(driver.runner_mut().bus().is_finalized());
    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| e.trial == 0 && matches!(e.kind, EventKind::TrialEnd { .. })));
    assert!(matches!(
        events.last().map(|e| (e.trial, &e.kind)),
        Some((1, EventKind::TrialFailed { .. }))
    ));
    assert!(!events
        .iter()
        .any(|e| matches!(e.kind, EventKind::RunEnd { .. })));
}

#[test]
fn partial_copies_are_removed_at_start() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("0000.phga.part"), b"half").unwrap();

    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new().sleep_after(2);
    let mut driver = driver(dir.path(), 1);
    driver.run(&mut host, drop.as_mut(), &metadata()).unwrap();

    assert!(!out.join("0000.phga.part").exists());
    assert!(Archive::open(&driver.trial_path(0)).is_ok());
}

#[test]
fn oversized_frame_cap_fails_before_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = DriverOptions::new(dir.path().join("out"), dir.path().join("t.phga"), 1);
    options.width = 8;
    options.height = 8;
    let settings = RunnerSettings {
        frame_cap: MAX_FRAME_CAP + 1,
        ..RunnerSettings::default()
    };
    let mut driver = DatasetDriver::new(options, runner(settings));
    let mut drop = scenario(ScenarioKind::Drop);
    let mut host = ScriptedHost::new();

    let err = driver.run(&mut host, drop.as_mut(), &metadata()).unwrap_err();
    assert!(matches!(err, PhysgenError::InvalidConfig(_)));
    assert_eq!(host.calls(), 0);
    assert!(!dir.path().join("out").join(METADATA_FILE).exists());
}
