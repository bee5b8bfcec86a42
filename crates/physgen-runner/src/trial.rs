//! One trial: setup, frame loop, cleanup.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use physgen_catalog::{LibrarySet, PhysicsCatalog};
use physgen_protocol::{Command, ResponseBatch, SimulationHost};
use physgen_scenario::{Scenario, TrialContext};
use physgen_telemetry::{EventBus, EventKind, TrialEvent};
use physgen_types::constants::{
    DEFAULT_FRAME_CAP, DEFAULT_MAX_FRAME_RETRIES, DEFAULT_UNLOAD_INTERVAL, MAX_FRAME_CAP,
    PLACEMENT_ATTEMPTS,
};
use physgen_types::{IdAllocator, PhysgenError, PhysgenResult};
use physgen_writer::{FrameLabels, PhysicsBackend, TrialWriter};

/// Limits of the trial life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Frames after which a trial ends with `trial_timeout`.
    pub frame_cap: u32,
    /// Send `unload_asset_bundles` before every Nth trial. 0 disables it.
    pub unload_interval: u32,
    /// Consecutive incomplete responses tolerated for one frame.
    pub max_frame_retries: u32,
}

impl RunnerSettings {
    /// Rejects a frame cap of 0 or one whose frame names would outgrow the
    /// zero padding and stop sorting in frame order.
    pub fn validate(&self) -> PhysgenResult<()> {
        if self.frame_cap == 0 || self.frame_cap > MAX_FRAME_CAP {
            return Err(PhysgenError::InvalidConfig(format!(
                "frame cap must be in 1..={MAX_FRAME_CAP}, got {}",
                self.frame_cap
            )));
        }
        Ok(())
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            frame_cap: DEFAULT_FRAME_CAP,
            unload_interval: DEFAULT_UNLOAD_INTERVAL,
            max_frame_retries: DEFAULT_MAX_FRAME_RETRIES,
        }
    }
}

/// What happened in one trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub trial: u32,
    /// Archive written by the trial (the temp path).
    pub path: PathBuf,
    pub frames: u32,
    pub object_count: usize,
    pub timed_out: bool,
    /// Exchanges discarded over the whole trial.
    pub retried_exchanges: u32,
    /// Wall-clock time (seconds).
    pub wall_time: f64,
}

/// Runs trials against a host, owning the process-scoped RNG, ID allocator
/// and catalogs.
pub struct TrialRunner {
    settings: RunnerSettings,
    rng: ChaCha8Rng,
    ids: IdAllocator,
    libraries: LibrarySet,
    physics: PhysicsCatalog,
    bus: EventBus,
}

impl TrialRunner {
    pub fn new(
        settings: RunnerSettings,
        rng: ChaCha8Rng,
        libraries: LibrarySet,
        physics: PhysicsCatalog,
    ) -> Self {
        Self {
            settings,
            rng,
            ids: IdAllocator::default(),
            libraries,
            physics,
            bus: EventBus::new(),
        }
    }

    /// A runner seeded with `seed`.
    pub fn seeded(
        settings: RunnerSettings,
        seed: u64,
        libraries: LibrarySet,
        physics: PhysicsCatalog,
    ) -> Self {
        Self::new(settings, ChaCha8Rng::seed_from_u64(seed), libraries, physics)
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn libraries(&self) -> &LibrarySet {
        &self.libraries
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Runs trial `trial` and writes its archive to `path`.
    ///
    /// The static section is written before the first frame. A response
    /// missing one of the backend's expected records is discarded and the
    /// same frame is requested again, up to `max_frame_retries` times in a
    /// row. On exit every object of the trial is destroyed.
    ///
    /// The trial's events reach the bus sinks before this returns, whether
    /// the trial succeeded or not.
    pub fn run_trial<H: SimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
        scenario: &mut dyn Scenario,
        trial: u32,
        path: &Path,
    ) -> PhysgenResult<TrialSummary> {
        let result = self.play_trial(host, scenario, trial, path);
        self.bus.flush();
        result
    }

    fn play_trial<H: SimulationHost + ?Sized>(
        &mut self,
        host: &mut H,
        scenario: &mut dyn Scenario,
        trial: u32,
        path: &Path,
    ) -> PhysgenResult<TrialSummary> {
        self.settings.validate()?;
        let start = Instant::now();
        let backend = scenario.backend();
        let settings = self.settings;

        let mut ctx = TrialContext::new(
            &mut self.rng,
            &mut self.ids,
            &self.libraries,
            &self.physics,
            trial,
        );

        let mut commands = Vec::new();
        if settings.unload_interval > 0 && trial % settings.unload_interval == 0 {
            commands.push(Command::UnloadAssetBundles);
        }
        commands.extend(scenario.trial_commands(&mut ctx)?);
        commands.extend(backend.send_data_commands());

        for _ in 0..ctx.placement_fallbacks() {
            self.bus.emit(TrialEvent::new(
                trial,
                EventKind::PlacementFallback {
                    attempts: PLACEMENT_ATTEMPTS,
                },
            ));
        }

        let mut writer = TrialWriter::create(path)?;
        writer.write_static(&ctx.registry().to_static_section())?;
        let object_count = writer.object_count();
        self.bus
            .emit(TrialEvent::new(trial, EventKind::TrialBegin { object_count }));

        let mut batch = host.communicate(&commands)?;
        let mut frame = 0u32;
        let mut retries = 0u32;
        let mut total_retries = 0u32;
        let timed_out = loop {
            if let Err(err) = check_batch(backend, &batch) {
                if !err.is_transient() || retries >= settings.max_frame_retries {
                    tracing::error!(trial, frame, retries, "Giving up on frame: {err}");
                    return Err(err);
                }
                retries += 1;
                total_retries += 1;
                tracing::warn!(trial, frame, attempt = retries, "Retrying frame: {err}");
                self.bus.emit(TrialEvent::new(
                    trial,
                    EventKind::FrameRetry {
                        frame,
                        missing: missing_name(&err),
                        attempt: retries,
                    },
                ));
                let commands = scenario.per_frame_commands(&batch, frame, &mut ctx);
                batch = host.communicate(&commands)?;
                continue;
            }

            let sleeping = writer.write_frame(frame, &batch)?;
            let complete = scenario.is_done(&batch, frame)
                || (sleeping && scenario.accepts_sleep_hint(frame));
            let timeout = !complete && frame + 1 >= settings.frame_cap;
            let labels = FrameLabels {
                trial_end: complete || timeout,
                trial_timeout: timeout,
                trial_complete: complete,
                retried_exchanges: retries,
                extra: scenario.frame_labels(&batch, frame),
            };
            writer.write_labels(frame, &labels)?;
            retries = 0;

            if labels.trial_end {
                break timeout;
            }
            frame += 1;
            let commands = scenario.per_frame_commands(&batch, frame, &mut ctx);
            batch = host.communicate(&commands)?;
        };

        let registry = ctx.into_registry();
        let destroy = registry.destroy_commands();
        if !destroy.is_empty() {
            host.communicate(&destroy)?;
        }
        let frames = writer.frames_written();
        let path = writer.finish()?;

        Ok(TrialSummary {
            trial,
            path,
            frames,
            object_count,
            timed_out,
            retried_exchanges: total_retries,
            wall_time: start.elapsed().as_secs_f64(),
        })
    }
}

/// Fails with `MissingRecord` if `batch` lacks a record the backend needs.
fn check_batch(backend: PhysicsBackend, batch: &ResponseBatch) -> PhysgenResult<()> {
    match backend
        .expected_records()
        .iter()
        .find(|kind| !batch.contains(**kind))
    {
        Some(kind) => Err(PhysgenError::MissingRecord(kind.name())),
        None => Ok(()),
    }
}

fn missing_name(err: &PhysgenError) -> String {
    match err {
        PhysgenError::MissingRecord(name) => (*name).to_string(),
        other => other.to_string(),
    }
}
