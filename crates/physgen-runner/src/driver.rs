//! Multi-trial driver with resumability.
//!
//! A trial is complete exactly when its final `NNNN.phga` file exists.
//! Every trial is written to one shared temp path and then renamed into
//! place (or copied to a `.part` sibling and renamed), so an interrupted
//! run never leaves a partial final file.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use physgen_protocol::{Command, SimulationHost};
use physgen_scenario::{global_scene_commands, Scenario};
use physgen_telemetry::{EventKind, TrialEvent};
use physgen_types::constants::{ARCHIVE_EXTENSION, DEFAULT_SCREEN_SIZE};
use physgen_types::{zero_padding, PhysgenError, PhysgenResult};

use crate::trial::{TrialRunner, TrialSummary};

/// Name of the run metadata file in the output directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Suffix of an archive being copied into the output directory.
const PARTIAL_SUFFIX: &str = ".part";

/// Where and how many trials to write.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    pub output_dir: PathBuf,
    /// Shared temp path every trial is written to before publishing.
    pub temp_path: PathBuf,
    pub num_trials: u32,
    pub width: u32,
    pub height: u32,
    /// Send `terminate` to the host when the run ends.
    pub terminate: bool,
}

impl DriverOptions {
    pub fn new(output_dir: impl Into<PathBuf>, temp_path: impl Into<PathBuf>, num_trials: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            temp_path: temp_path.into(),
            num_trials,
            width: DEFAULT_SCREEN_SIZE,
            height: DEFAULT_SCREEN_SIZE,
            terminate: true,
        }
    }
}

/// Written to `metadata.json` at the start of every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub scenario: String,
    /// The resolved scenario configuration.
    pub config: serde_json::Value,
    /// Seed of the run's RNG. Drawn at random with `--random`.
    pub seed: u64,
    pub random: bool,
    pub num_trials: u32,
    pub width: u32,
    pub height: u32,
    pub version: String,
}

/// Trials written and skipped by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: Vec<u32>,
    pub skipped: Vec<u32>,
}

/// `NNNN.phga`.
pub fn trial_file_name(trial: u32) -> String {
    format!("{}.{ARCHIVE_EXTENSION}", zero_padding(trial))
}

/// Indices of the trial archives already in `dir`, ascending.
pub fn existing_trials(dir: &Path) -> PhysgenResult<Vec<u32>> {
    let mut trials = Vec::new();
    if !dir.is_dir() {
        return Ok(trials);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION) {
            continue;
        }
        if let Some(index) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u32>().ok())
        {
            trials.push(index);
        }
    }
    trials.sort_unstable();
    Ok(trials)
}

/// Moves `temp` to `dest`, falling back to [`publish_by_copy`] when a
/// rename is not possible (e.g. across filesystems).
pub fn publish(temp: &Path, dest: &Path) -> PhysgenResult<()> {
    if let Err(err) = fs::rename(temp, dest) {
        tracing::debug!(
            temp = %temp.display(),
            dest = %dest.display(),
            "Rename failed ({err}), copying instead"
        );
        publish_by_copy(temp, dest)?;
    }
    Ok(())
}

/// Copies `temp` to a `.part` sibling of `dest`, syncs it, renames it into
/// place and removes `temp`. `dest` never holds a partial copy.
pub fn publish_by_copy(temp: &Path, dest: &Path) -> PhysgenResult<()> {
    let part = partial_path(dest);
    let copied = fs::copy(temp, &part)
        .and_then(|_| OpenOptions::new().write(true).open(&part)?.sync_all())
        .and_then(|_| fs::rename(&part, dest));
    if let Err(err) = copied {
        if part.exists() {
            fs::remove_file(&part)?;
        }
        return Err(err.into());
    }
    fs::remove_file(temp)?;
    Ok(())
}

/// `NNNN.phga.part` next to `dest`.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// Runs a scenario for many trials, one archive per trial.
pub struct DatasetDriver {
    options: DriverOptions,
    runner: TrialRunner,
}

impl DatasetDriver {
    pub fn new(options: DriverOptions, runner: TrialRunner) -> Self {
        Self { options, runner }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    pub fn runner_mut(&mut self) -> &mut TrialRunner {
        &mut self.runner
    }

    /// Path of the final archive of `trial`.
    pub fn trial_path(&self, trial: u32) -> PathBuf {
        self.options.output_dir.join(trial_file_name(trial))
    }

    /// Runs trials `0..num_trials`, skipping those already on disk.
    ///
    /// Sends the scene setup once, resumes after the highest existing
    /// trial index and sends `terminate` at the end. Sinks receive each
    /// trial's events when the trial ends; the bus is finalized even when
    /// the run stops on an error.
    pub fn run<H: SimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
        scenario: &mut dyn Scenario,
        metadata: &RunMetadata,
    ) -> PhysgenResult<RunSummary> {
        let result = self.run_trials(host, scenario, metadata);
        if let Err(err) = &result {
            tracing::error!("Run stopped: {err}");
        }
        self.runner.bus_mut().finalize();
        result
    }

    fn run_trials<H: SimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
        scenario: &mut dyn Scenario,
        metadata: &RunMetadata,
    ) -> PhysgenResult<RunSummary> {
        self.prepare(metadata)?;

        let existing = existing_trials(&self.options.output_dir)?;
        let first = existing.last().copied().unwrap_or(0);
        let num = self.options.num_trials;
        tracing::info!(
            scenario = scenario.name(),
            host = host.name(),
            first,
            num,
            existing = existing.len(),
            "Starting run"
        );
        let bus = self.runner.bus_mut();
        bus.emit(TrialEvent::new(
            first,
            EventKind::RunBegin {
                scenario: scenario.name().to_string(),
                first_trial: first,
                num_trials: num,
            },
        ));
        bus.flush();

        host.communicate(&global_scene_commands(
            self.options.width,
            self.options.height,
            scenario.scene_commands(),
            scenario.field_of_view(),
        ))?;

        let mut summary = RunSummary::default();
        for trial in first..num {
            let dest = self.trial_path(trial);
            if dest.exists() {
                tracing::debug!(trial, "Trial already written, skipping");
                let bus = self.runner.bus_mut();
                bus.emit(TrialEvent::new(trial, EventKind::TrialSkipped));
                bus.flush();
                summary.skipped.push(trial);
                continue;
            }

            let result = match self.write_trial(&mut *host, scenario, trial, &dest) {
                Ok(result) => result,
                Err(err) => {
                    self.runner.bus_mut().emit(TrialEvent::new(
                        trial,
                        EventKind::TrialFailed {
                            error: err.to_string(),
                        },
                    ));
                    return Err(err);
                }
            };
            tracing::info!(
                trial,
                frames = result.frames,
                objects = result.object_count,
                path = %dest.display(),
                "Wrote trial {}/{num}",
                trial + 1
            );
            let bus = self.runner.bus_mut();
            bus.emit(TrialEvent::new(
                trial,
                EventKind::TrialEnd {
                    frames: result.frames,
                    timed_out: result.timed_out,
                    wall_time: result.wall_time,
                },
            ));
            bus.flush();
            summary.written.push(trial);
        }

        if self.options.terminate {
            host.communicate(&[Command::Terminate])?;
        }
        self.runner.bus_mut().emit(TrialEvent::new(
            num,
            EventKind::RunEnd {
                trials_written: summary.written.len() as u32,
            },
        ));
        Ok(summary)
    }

    /// Runs one trial into the temp path and publishes it to `dest`.
    fn write_trial<H: SimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
        scenario: &mut dyn Scenario,
        trial: u32,
        dest: &Path,
    ) -> PhysgenResult<TrialSummary> {
        let result = self
            .runner
            .run_trial(&mut *host, scenario, trial, &self.options.temp_path)?;
        publish(&result.path, dest)?;
        Ok(result)
    }

    /// Creates the output directory, clears a stale temp file and writes
    /// the run metadata.
    fn prepare(&self, metadata: &RunMetadata) -> PhysgenResult<()> {
        self.runner.settings().validate()?;
        fs::create_dir_all(&self.options.output_dir)?;
        if let Some(parent) = self.options.temp_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if self.options.temp_path.exists() {
            tracing::debug!(path = %self.options.temp_path.display(), "Removing stale temp file");
            fs::remove_file(&self.options.temp_path)?;
        }
        for entry in fs::read_dir(&self.options.output_dir)? {
            let path = entry?.path();
            let partial = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX));
            if partial {
                tracing::debug!(path = %path.display(), "Removing partial copy");
                fs::remove_file(&path)?;
            }
        }

        let json = serde_json::to_string_pretty(metadata)
            .map_err(|e| PhysgenError::Serialization(e.to_string()))?;
        fs::write(self.options.output_dir.join(METADATA_FILE), json)?;
        Ok(())
    }
}
