#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the monument survey pipeline.
//!
//! Each invocation runs exactly one phase against an output directory and
//! exits; an external driver loops `analyze` over increasing batch starts.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use monument_survey_core::{BatchRange, ChunkCoord, ProcessControl};
use monument_survey_system_environment::EnvironmentFilter;
use monument_survey_system_layout::LayoutIntrospector;
use monument_survey_system_pipeline::{
    analyze, discover, merge, run_phase, AnalyzeOutcome, DiscoverRequest, ResultStore,
};
use monument_survey_system_placement::{PlacementPredictor, SearchArea};
use monument_survey_world::SyntheticWorld;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ScanConfig;

#[derive(Debug, Parser)]
#[command(
    name = "monument-survey",
    about = "Locate ocean monuments and count their sponge rooms"
)]
struct Cli {
    /// Optional TOML file overriding placement, environment, layout and yield settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Predict candidate monuments and write the candidate file
    Discover {
        /// World seed
        #[arg(long, allow_hyphen_values = true)]
        seed: i64,
        /// Centre chunk x coordinate
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        center_x: i32,
        /// Centre chunk z coordinate
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        center_z: i32,
        /// Square search radius in chunks
        #[arg(long, default_value_t = 64)]
        radius: u32,
        /// Maximum number of candidates kept, nearest first
        #[arg(long, default_value_t = 5_000)]
        max_results: usize,
        /// Output directory shared by every phase
        #[arg(long)]
        out_dir: PathBuf,
        /// Candidate file; defaults to candidates.csv inside the output directory
        #[arg(long)]
        candidates: Option<PathBuf>,
    },
    /// Classify one batch of candidates and write its partial result file
    Analyze {
        /// World seed
        #[arg(long, allow_hyphen_values = true)]
        seed: i64,
        /// Index of the first candidate in the batch
        #[arg(long)]
        batch_start: usize,
        /// Number of candidates in the batch
        #[arg(long)]
        batch_size: usize,
        /// Output directory shared by every phase
        #[arg(long)]
        out_dir: PathBuf,
        /// Candidate file; defaults to candidates.csv inside the output directory
        #[arg(long)]
        candidates: Option<PathBuf>,
    },
    /// Merge partial result files into results.csv
    Merge {
        /// Output directory shared by every phase
        #[arg(long)]
        out_dir: PathBuf,
        /// Candidate file to clean up; defaults to candidates.csv inside the output directory
        #[arg(long)]
        candidates: Option<PathBuf>,
    },
}

impl Command {
    const fn phase(&self) -> &'static str {
        match self {
            Self::Discover { .. } => "discover",
            Self::Analyze { .. } => "analyze",
            Self::Merge { .. } => "merge",
        }
    }
}

/// Process control backed by the operating system process.
#[derive(Debug, Default)]
struct ProcessExit {
    stop_requested: bool,
}

impl ProcessControl for ProcessExit {
    fn request_graceful_stop(&mut self) {
        self.stop_requested = true;
    }

    fn force_halt(&mut self, exit_code: i32) {
        std::process::exit(exit_code);
    }
}

/// Entry point for the monument survey command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let phase = cli.command.phase();
    let mut control = ProcessExit::default();
    run_phase(&mut control, phase, || execute(cli))?;
    if control.stop_requested {
        info!(phase, "shutting down");
    }
    Ok(())
}

fn execute(cli: Cli) -> Result<()> {
    let config = ScanConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Discover {
            seed,
            center_x,
            center_z,
            radius,
            max_results,
            out_dir,
            candidates,
        } => {
            if max_results == 0 {
                bail!("--max-results must be positive");
            }
            let predictor = PlacementPredictor::new(config.placement_params())
                .context("invalid placement configuration")?;
            let store = open_store(&out_dir, candidates)?;
            let world = SyntheticWorld::new(seed);
            let filter = EnvironmentFilter::new(&world, config.filter_config());
            let request = DiscoverRequest {
                seed,
                area: SearchArea::new(ChunkCoord::new(center_x, center_z), radius),
                max_results,
            };
            let found = discover(request, &predictor, &filter, &store)?;
            println!(
                "{} candidates written to {}",
                found.len(),
                store.candidates_path().display()
            );
        }
        Command::Analyze {
            seed,
            batch_start,
            batch_size,
            out_dir,
            candidates,
        } => {
            if batch_size == 0 {
                bail!("--batch-size must be positive");
            }
            let store = open_store(&out_dir, candidates)?;
            let introspector = LayoutIntrospector::new(config.introspector_config());
            let outcome = analyze(
                &store,
                BatchRange::new(batch_start, batch_size),
                SyntheticWorld::new(seed),
                &introspector,
            )?;
            match outcome {
                AnalyzeOutcome::OutOfRange { start, candidates } => {
                    println!(
                        "batch start {start} is past the {candidates} candidates; nothing to do"
                    );
                }
                AnalyzeOutcome::Completed {
                    path,
                    results,
                    absent,
                } => {
                    println!(
                        "{} instances ({} absent) written to {}",
                        results.len(),
                        absent,
                        path.display()
                    );
                }
            }
        }
        Command::Merge {
            out_dir,
            candidates,
        } => {
            let store = open_store(&out_dir, candidates)?;
            match merge(&store, config.yield_model())? {
                Some(summary) => println!(
                    "{} instances merged into {} (estimated yield {:.1})",
                    summary.results.len(),
                    summary.path.display(),
                    summary.estimated_yield
                ),
                None => println!("no partial result files found in {}", out_dir.display()),
            }
        }
    }
    Ok(())
}

fn open_store(out_dir: &Path, candidates: Option<PathBuf>) -> Result<ResultStore> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    let store = ResultStore::new(out_dir);
    Ok(match candidates {
        Some(path) => store.with_candidates_file(path),
        None => store,
    })
}
