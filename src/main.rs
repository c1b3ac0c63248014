use anyhow::Context;
use clap::Parser;
use gtfspack::archive::Archive;
use gtfspack::pipeline;
use gtfspack::registry::IdRegistry;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about = "Encode an extracted GTFS-like feed into a compact binary archive")]
struct Args {
    /// Directory holding the extracted feed tables (*.txt)
    feed_dir: PathBuf,
    /// Output directory for the archive and run metadata
    out_dir: PathBuf,
    /// Write one file per section instead of a single container
    #[arg(long)]
    split: bool,
    /// Persisted stop-id mapping file (default: <out_dir>/stop_ids)
    #[arg(long)]
    registry: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let registry_path = args
        .registry
        .unwrap_or_else(|| args.out_dir.join("stop_ids"));
    let mut registry = IdRegistry::load(&registry_path)
        .with_context(|| format!("loading {}", registry_path.display()))?;

    let parsed = args.out_dir.join("parsed");
    let mut archive = if args.split {
        Archive::split(&parsed)?
    } else {
        Archive::single(&parsed)?
    };

    let result = pipeline::run(
        &args.feed_dir,
        &args.out_dir.join("unzipped"),
        &mut archive,
        &mut registry,
    );
    // terminate the container even after a failed run so it scans cleanly
    archive.finish()?;

    match result {
        Ok(summary) => {
            registry.persist(&registry_path)?;
            write_info(&args.out_dir)?;
            info!(
                "done: {} trips, {} route stops, {} patterns",
                summary.trips, summary.route_stops, summary.patterns
            );
            Ok(())
        }
        Err(e) => {
            error!("encoding failed: {e}");
            Err(e.into())
        }
    }
}

fn write_info(out_dir: &Path) -> anyhow::Result<()> {
    let info = serde_json::json!({
        "last_updated": chrono::Utc::now().timestamp_millis(),
    });
    fs::write(out_dir.join("info"), serde_json::to_string(&info)?)?;
    Ok(())
}
