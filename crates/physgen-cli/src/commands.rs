//! CLI command implementations.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use physgen_archive::Archive;
use physgen_catalog::{LibrarySet, PhysicsCatalog, PhysicsInfoCalculator, SemanticMaterial};
use physgen_protocol::TcpHost;
use physgen_runner::{
    existing_trials, trial_file_name, DatasetDriver, DriverOptions, RunMetadata, RunnerSettings,
    TrialRunner,
};
use physgen_scenario::ScenarioConfig;
use physgen_telemetry::{JsonLinesSink, TracingSink};
use physgen_types::{zero_padding, PhysgenError};
use physgen_writer::layout::{check_contiguous_frames, frame_names, frame_path, static_path, STATIC};
use physgen_writer::TrialLabels;

use crate::args::ScenarioCommand;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn load_libraries(extra: &[PathBuf]) -> Result<LibrarySet, PhysgenError> {
    let mut libraries = LibrarySet::with_defaults()?;
    for path in extra {
        libraries.load_file(path)?;
    }
    Ok(libraries)
}

/// Run a scenario for `--num` trials.
pub fn generate(command: &ScenarioCommand) -> CommandResult {
    let common = command.common();
    let libraries = load_libraries(&common.library)?;
    let physics = match &common.physics_info {
        Some(path) => PhysicsCatalog::load(path)?,
        None => PhysicsCatalog::with_defaults()?,
    };

    // Every configuration error surfaces here, before the host is contacted.
    let config = command.resolve_config()?;
    let mut scenario = config.build(&libraries)?;

    let seed = if common.random {
        rand::random::<u64>()
    } else {
        common.seed
    };
    let metadata = RunMetadata {
        scenario: scenario.name().to_string(),
        config: config.to_json(),
        seed,
        random: common.random,
        num_trials: common.num,
        width: common.width,
        height: common.height,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let settings = RunnerSettings {
        frame_cap: common.frame_cap,
        unload_interval: common.unload_interval,
        max_frame_retries: common.max_frame_retries,
    };
    settings.validate()?;

    if common.run == 0 {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        tracing::info!("--run 0: configuration is valid, no trials generated");
        return Ok(());
    }

    let mut runner = TrialRunner::seeded(settings, seed, libraries, physics);
    runner.bus_mut().add_sink(Box::new(TracingSink));
    if let Some(path) = &common.events {
        let file = BufWriter::new(File::create(path)?);
        runner.bus_mut().add_sink(Box::new(JsonLinesSink::new(file)));
    }

    let options = DriverOptions {
        width: common.width,
        height: common.height,
        ..DriverOptions::new(&common.dir, &common.temp, common.num)
    };
    let mut driver = DatasetDriver::new(options, runner);
    let mut host = TcpHost::connect(&common.host)?;
    let summary = driver.run(&mut host, scenario.as_mut(), &metadata)?;

    println!(
        "{}: wrote {} trial(s), skipped {} existing, output in {}",
        metadata.scenario,
        summary.written.len(),
        summary.skipped.len(),
        common.dir.display()
    );
    Ok(())
}

/// Archives to process: one trial, or every trial in `src`.
fn archives(src: &Path, trial: Option<u32>) -> Result<Vec<(u32, PathBuf)>, PhysgenError> {
    let trials = match trial {
        Some(t) => vec![t],
        None => existing_trials(src)?,
    };
    Ok(trials
        .into_iter()
        .map(|t| (t, src.join(trial_file_name(t))))
        .collect())
}

/// Write one render pass of every frame to `dest/NNNN/`.
pub fn extract_images(src: &Path, dest: &Path, trial: Option<u32>, pass: &str) -> CommandResult {
    let stem = pass.trim_start_matches('_');
    let mut written = 0usize;
    for (trial, path) in archives(src, trial)? {
        let archive = Archive::open(&path)?;
        let out = dest.join(zero_padding(trial));
        fs::create_dir_all(&out)?;
        for frame in frame_names(&archive) {
            let key = format!("frames/{frame}/images/{pass}");
            let Some(bytes) = archive.get(&key).and_then(|d| d.as_bytes()) else {
                tracing::warn!(trial, frame = %frame, pass, "Frame has no such pass");
                continue;
            };
            fs::write(out.join(format!("{stem}_{frame}.png")), bytes)?;
            written += 1;
        }
    }
    println!("Extracted {written} image(s) to {}", dest.display());
    Ok(())
}

/// Trial-level labels of every archive in `src`, as JSON keyed by trial.
pub fn labels(src: &Path, output: Option<&Path>) -> CommandResult {
    let mut all = BTreeMap::new();
    for (trial, path) in archives(src, None)? {
        let archive = Archive::open(&path)?;
        all.insert(zero_padding(trial), TrialLabels::from_archive(&archive)?);
    }
    let json = serde_json::to_string_pretty(&all)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            println!("Labels for {} trial(s) written to {}", all.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Compute and store physics values for one model.
pub fn calc_physics(
    name: &str,
    material: &str,
    library: &str,
    extra_libraries: &[PathBuf],
    catalog_path: &Path,
    host: &str,
) -> CommandResult {
    let libraries = load_libraries(extra_libraries)?;
    let record = libraries.record(library, name)?.clone();
    let material: SemanticMaterial = material.parse()?;
    let catalog = if catalog_path.exists() {
        PhysicsCatalog::load(catalog_path)?
    } else {
        PhysicsCatalog::with_defaults()?
    };

    let host = TcpHost::connect(host)?;
    let mut calculator = PhysicsInfoCalculator::new(host, catalog)?.with_output(catalog_path);
    let info = calculator.calculate(&record, material)?;
    calculator.finish()?;

    println!("Model:             {}", info.name);
    println!("Material:          {material}");
    println!("Mass:              {:.4}", info.mass);
    println!("Static friction:   {:.3}", info.static_friction);
    println!("Dynamic friction:  {:.3}", info.dynamic_friction);
    println!("Bounciness:        {:.3}", info.bounciness);
    println!("Catalog:           {}", catalog_path.display());
    Ok(())
}

/// Summarize a trial archive.
pub fn inspect(path: &Path) -> CommandResult {
    println!("physgen Archive Inspector");
    println!("─────────────────────────");
    println!();

    let archive = Archive::open(path)?;
    println!("Entries:      {}", archive.len());

    if let Some(ids) = archive.get(&static_path("object_ids")).and_then(|d| d.as_i32()) {
        println!("Objects:      {ids:?}");
    }
    if let Some(models) = archive
        .get(&static_path("model_names"))
        .and_then(|d| d.as_strings())
    {
        println!("Models:       {}", models.join(", "));
    }
    println!("Static:       {}", archive.children(STATIC).join(", "));

    let frames = check_contiguous_frames(&archive)?;
    println!("Frames:       {frames}");
    if frames > 0 {
        let first = archive.children(&frame_path(0, "images"));
        println!("Passes:       {}", first.join(", "));
    }

    let labels = TrialLabels::from_archive(&archive)?;
    println!();
    println!("Labels:");
    println!("  valid:      {:?}", labels.is_trial_valid);
    println!("  timeout:    {:?}", labels.is_trial_timeout);
    println!("  complete:   {:?}", labels.is_trial_complete);
    println!("  target moved:         {:?}", labels.does_target_move);
    println!("  first move frame:     {:?}", labels.first_target_move_frame);
    println!("  final displacement:   {:?}", labels.final_target_displacement);
    Ok(())
}

/// Validate every scenario table of a config file.
pub fn validate(path: &Path) -> CommandResult {
    println!("physgen Validator");
    println!("─────────────────");
    println!();

    let text = fs::read_to_string(path)?;
    let libraries = LibrarySet::with_defaults()?;
    let present = ScenarioConfig::validate_file(&text, &libraries)?;
    if present.is_empty() {
        println!("No scenario tables in {}; defaults are valid.", path.display());
    } else {
        let names: Vec<String> = present.iter().map(|k| k.to_string()).collect();
        println!("✅ Config is valid ({}).", names.join(", "));
    }
    Ok(())
}
