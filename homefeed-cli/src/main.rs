//! Homefeed CLI: poll the public homefeed and export CSV snapshots.
//!
//! Commands:
//! - `run`: poll forever (sweep every page, export, wait, repeat)
//! - `sweep`: a single sweep with a printed summary
//! - `config`: print the effective configuration as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use homefeed_core::{run_sweep, HttpFeedProvider, PageStatus, ThreadPacer};
use homefeed_runner::{Clock, CycleExporter, ExportOutcome, Poller, PollerConfig, SystemClock};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "homefeed",
    about = "Homefeed poller for paginated market-event snapshots"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply to anything it omits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for CSV snapshots (overrides the config file).
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed on a fixed interval until the process is killed.
    Run {
        /// Stop after this many cycles instead of running forever.
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Seconds between cycles (overrides the config file).
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Run one sweep, export it, and print a per-page summary.
    Sweep {
        /// Skip writing the CSV snapshot.
        #[arg(long, default_value_t = false)]
        no_export: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PollerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PollerConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.export.output_dir = dir;
    }

    match cli.command {
        Commands::Run {
            max_cycles,
            interval_secs,
        } => {
            if let Some(secs) = interval_secs {
                config.timing.cycle_interval_secs = secs;
            }
            run_poller(&config, max_cycles)
        }
        Commands::Sweep { no_export } => run_single_sweep(&config, no_export),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn run_poller(config: &PollerConfig, max_cycles: Option<u64>) -> Result<()> {
    let provider = HttpFeedProvider::new(&config.client_config())?;
    let pacer = ThreadPacer;
    let clock = SystemClock;

    info!(
        url = provider.base_url(),
        interval_secs = config.timing.cycle_interval_secs,
        output_dir = %config.export.output_dir.display(),
        "Starting homefeed poller"
    );

    let mut poller = Poller::from_config(config, &provider, &pacer, &clock);
    let completed = poller.run(max_cycles, None);
    info!(completed, "Poller stopped");
    Ok(())
}

fn run_single_sweep(config: &PollerConfig, no_export: bool) -> Result<()> {
    let provider = HttpFeedProvider::new(&config.client_config())?;
    let sweep = run_sweep(&provider, &ThreadPacer, config.timing.page_delay())?;

    println!(
        "Feed reports {} records across {} pages",
        sweep.total_count, sweep.total_pages
    );
    for report in &sweep.pages {
        match &report.status {
            PageStatus::Fetched {
                validated,
                rejected,
            } => println!(
                "  page {:>3}: {validated} valid, {rejected} rejected",
                report.page
            ),
            PageStatus::Failed { reason } => {
                println!("  page {:>3}: FAILED ({reason})", report.page)
            }
        }
    }
    println!(
        "Total valid records collected: {} ({} pages failed, {} records rejected)",
        sweep.events.len(),
        sweep.pages_failed(),
        sweep.records_rejected()
    );

    if no_export {
        return Ok(());
    }

    let exporter = CycleExporter::from_config(&config.export);
    match exporter.export(SystemClock.now(), &sweep)? {
        ExportOutcome::Written(artifacts) => {
            println!("Data saved to {}", artifacts.csv.display());
            if let Some(manifest) = artifacts.manifest {
                println!("Manifest saved to {}", manifest.display());
            }
        }
        ExportOutcome::NoData => println!("No data extracted for this sweep."),
    }
    Ok(())
}
