//! Data Cockpit CLI: find the ideal batch size for an object and browse stores.

mod command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dc_benchmark::{
    BenchmarkRange, EvaluationOutcome, IdealBatchSizeCache, SweepReport, WallClock,
};
use dc_data::{list_objects, Cockpit, CockpitConfig, DatasetSource, LocalObjectStore};
use dc_types::{BatchSize, ObjectId};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::command::CommandWorkload;

/// Data Cockpit: dataset selection and batch size benchmarking
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the log level (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Time a command for every batch size in a range and cache the fastest
    Sweep {
        /// Object identifier, e.g. s3://bucket/path/file.csv
        object: String,

        /// Smallest batch size (defaults to DATA_COCKPIT_MIN_BATCH or 1)
        #[arg(long)]
        min: Option<BatchSize>,

        /// Largest batch size (defaults to DATA_COCKPIT_MAX_BATCH or 100)
        #[arg(long)]
        max: Option<BatchSize>,

        /// Increment between batch sizes (defaults to DATA_COCKPIT_STEP or 10)
        #[arg(long)]
        step: Option<BatchSize>,

        /// Ideal batch size cache file
        #[arg(long)]
        cache_file: Option<PathBuf>,

        /// Command to time; `{object}` and `{batch_size}` are substituted
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Batch size that would be handed to processing for an object
    BatchSize {
        object: String,

        /// Fail unless a sweep has been run for the object
        #[arg(long)]
        require_benchmark: bool,

        /// Ideal batch size cache file
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },

    /// List objects of a container in a local directory store
    List {
        /// Directory whose subdirectories are containers
        root: PathBuf,

        container: String,

        #[arg(long, default_value = "")]
        prefix: String,

        /// Group keys into common prefixes at this delimiter
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Print the cached ideal batch sizes as JSON
    Cache {
        #[arg(long)]
        cache_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = CockpitConfig::from_env().context("failed to read configuration")?;

    match cli.command {
        Commands::Sweep {
            object,
            min,
            max,
            step,
            cache_file,
            command,
        } => {
            let defaults = config.benchmark_range;
            let range = BenchmarkRange::new(
                min.unwrap_or(defaults.min),
                max.unwrap_or(defaults.max),
                step.unwrap_or(defaults.step),
            )?;
            let workload = CommandWorkload::from_argv(&command).context("no command given")?;
            let cache_path = cache_file.unwrap_or_else(|| config.resolved_cache_path());

            // Each evaluation blocks on a child process.
            let (report, cache_path) = tokio::task::spawn_blocking(move || {
                let object = ObjectId::from(object);
                let mut out = io::stdout().lock();
                run_sweep(&mut out, config, object, range, workload, &cache_path)
                    .map(|report| (report, cache_path))
            })
            .await
            .context("sweep task did not complete")??;
            info!(sweep_id = %report.id, "cache written to {}", cache_path.display());
            Ok(())
        }
        Commands::BatchSize {
            object,
            require_benchmark,
            cache_file,
        } => {
            let cache_path = cache_file.unwrap_or_else(|| config.resolved_cache_path());
            print_batch_size(
                &mut io::stdout().lock(),
                config,
                ObjectId::from(object),
                require_benchmark,
                &cache_path,
            )
        }
        Commands::List {
            root,
            container,
            prefix,
            delimiter,
        } => {
            let store = LocalObjectStore::new(&root).with_page_size(config.page_size);
            let objects = list_objects(&store, &container, &prefix, delimiter.as_deref())
                .await
                .with_context(|| format!("failed to list {container} under {}", root.display()))?;
            let mut out = io::stdout().lock();
            for object in &objects {
                writeln!(out, "{object}")?;
            }
            info!("{} entries found in container '{}'", objects.len(), container);
            Ok(())
        }
        Commands::Cache { cache_file } => {
            let cache_path = cache_file.unwrap_or_else(|| config.resolved_cache_path());
            print_cache(&mut io::stdout().lock(), &cache_path)
        }
    }
}

fn load_cache(path: &Path) -> Result<IdealBatchSizeCache> {
    IdealBatchSizeCache::load_json(path)
        .with_context(|| format!("failed to load cache from {}", path.display()))
}

/// Time `workload` over `range`, report every batch size to `out` and persist
/// the updated cache at `cache_path`.
fn run_sweep<W: Write>(
    out: &mut W,
    config: CockpitConfig,
    object: ObjectId,
    range: BenchmarkRange,
    mut workload: CommandWorkload,
    cache_path: &Path,
) -> Result<SweepReport> {
    let cache = load_cache(cache_path)?;
    let mut cockpit = Cockpit::with_cache(config, cache);

    if let Some(existing) = cockpit.cache().get(&object) {
        writeln!(out, "Existing Ideal Batch Size: {existing}")?;
        writeln!(out, "Re-running Benchmarking will overwrite the existing Ideal Batch Size.")?;
    }

    cockpit.select(DatasetSource::Explorer, object);
    writeln!(out, "Initiating Benchmarking over {range} ({} batch sizes)...", range.len())?;

    let mut timing = WallClock::new(|object: &ObjectId, batch_size: BatchSize| {
        workload.run(object, batch_size)
    });
    let report = cockpit.run_benchmark(range, &mut timing)?;

    for evaluation in &report.evaluations {
        match &evaluation.outcome {
            EvaluationOutcome::Success { elapsed_seconds } => writeln!(
                out,
                "Batch Size {}: {:.4} seconds",
                evaluation.batch_size, elapsed_seconds
            )?,
            EvaluationOutcome::Failure { reason } => {
                writeln!(out, "Batch Size {}: failed: {}", evaluation.batch_size, reason)?
            }
        }
    }
    writeln!(out, "Ideal Batch Size determined: {}", report.ideal_batch_size)?;

    cockpit
        .cache()
        .save_json(cache_path)
        .with_context(|| format!("failed to save cache to {}", cache_path.display()))?;
    Ok(report)
}

/// Print the batch size processing would use for `object`.
fn print_batch_size<W: Write>(
    out: &mut W,
    config: CockpitConfig,
    object: ObjectId,
    require_benchmark: bool,
    cache_path: &Path,
) -> Result<()> {
    let cache = load_cache(cache_path)?;
    let mut cockpit = Cockpit::with_cache(config, cache);
    if require_benchmark {
        cockpit.set_benchmarking(true);
    }
    cockpit.select(DatasetSource::Explorer, object);

    let (object, batch_size) = cockpit.processing_batch_size()?;
    writeln!(out, "{object}: {batch_size}")?;
    Ok(())
}

fn print_cache<W: Write>(out: &mut W, cache_path: &Path) -> Result<()> {
    let cache = load_cache(cache_path)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&cache.to_snapshot())?)?;
    Ok(())
}
