use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use chrono::Utc;
use reingest::{ReingestConfig, run, telemetry, write_output};
use reingest_store::SqliteStore;
use tracing::info;
use uuid::Uuid;

/// Reconcile a package's METS document with pending reingest changes
///
/// Reads the package's prior METS document, applies the descriptive,
/// rights, event, structural and deletion changes recorded for it, and
/// writes the reconciled document to the configured output file in the
/// current directory.
///
/// CONFIGURATION:
///
///   Read from $METS_REINGEST_CONFIG, else ./reingest.toml, else defaults.
///   Set RUST_LOG to adjust verbosity and REINGEST_LOG_FORMAT=json for
///   machine-readable logs.
#[derive(Parser)]
#[command(name = "mets-reingest")]
#[command(version, about)]
struct Cli {
    /// Root directory of the package being reingested
    package_dir: PathBuf,

    /// Identifier of the package
    package_uuid: Uuid,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init();

    let config = ReingestConfig::load_default().context("loading configuration")?;
    let store = SqliteStore::open(&config.store.path).with_context(|| {
        format!("opening record store {}", config.store.path.display())
    })?;

    let (bytes, report) = run(&store, &cli.package_dir, cli.package_uuid, &config, Utc::now())
        .with_context(|| format!("reconciling package {}", cli.package_uuid))?;
    info!("run summary\n{report}");

    write_output(&bytes, &config.output.file).context("writing reconciled document")?;
    Ok(())
}
