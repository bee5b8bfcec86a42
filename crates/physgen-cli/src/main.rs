//! physgen CLI: dataset generation, label extraction and inspection.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod args;
mod commands;

use args::ScenarioCommand;

#[derive(Parser, Debug)]
#[command(name = "physgen")]
#[command(version, about = "physgen: procedural physics video dataset generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate trials of a scenario against a simulation host.
    Generate {
        #[command(subcommand)]
        scenario: ScenarioCommand,
    },

    /// Write the image passes of trial archives to files.
    ExtractImages {
        /// Directory of trial archives.
        #[arg(long)]
        src: PathBuf,
        /// Output directory.
        #[arg(long)]
        dest: PathBuf,
        /// Only this trial.
        #[arg(long)]
        trial: Option<u32>,
        /// Render pass to extract.
        #[arg(long, default_value = "_img")]
        pass: String,
    },

    /// Compute trial-level labels for every archive in a directory.
    Labels {
        #[arg(long)]
        src: PathBuf,
        /// Output JSON file. Printed to stdout when unset.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compute physics values for one model with a live host.
    CalcPhysics {
        /// Model name.
        #[arg(long)]
        name: String,
        /// Semantic material (e.g. wood, metal, plastic).
        #[arg(long)]
        mat: String,
        /// Model library the model belongs to.
        #[arg(long, default_value = physgen_catalog::FLEX_LIBRARY)]
        lib: String,
        /// Extra model library files (JSON). Repeatable.
        #[arg(long)]
        library: Vec<PathBuf>,
        /// Catalog file to update.
        #[arg(long, default_value = "physics_info.json")]
        catalog: PathBuf,
        /// Simulation host address.
        #[arg(long, default_value = "localhost:1071")]
        host: String,
    },

    /// Summarize a trial archive.
    Inspect {
        /// Path to a .phga file.
        path: PathBuf,
    },

    /// Validate a scenario config file.
    Validate {
        /// Path to a TOML config.
        path: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate { scenario } => commands::generate(&scenario),
        Commands::ExtractImages {
            src,
            dest,
            trial,
            pass,
        } => commands::extract_images(&src, &dest, trial, &pass),
        Commands::Labels { src, output } => commands::labels(&src, output.as_deref()),
        Commands::CalcPhysics {
            name,
            mat,
            lib,
            library,
            catalog,
            host,
        } => commands::calc_physics(&name, &mat, &lib, &library, &catalog, &host),
        Commands::Inspect { path } => commands::inspect(&path),
        Commands::Validate { path } => commands::validate(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
