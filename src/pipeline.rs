use crate::archive::{Archive, Section};
use crate::error::{Error, Result};
use crate::registry::{IdRegistry, StringPool};
use crate::{api, calendar, lines, patterns, schedule, stops, transfers};
use log::{info, warn};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tabular::Table;

/// What one encoding run produced, for the final log line.
pub struct RunSummary {
    pub trips: usize,
    pub route_stops: usize,
    pub patterns: usize,
}

/// Runs the whole feed through the encoder.
///
/// The two schedule tables are read first because everything positional hangs
/// off them; the remaining tables are independent and handled in a fixed
/// order. Each consumed source table is also copied verbatim under
/// `unzipped_dir` with its extension stripped.
pub fn run(
    feed_dir: &Path,
    unzipped_dir: &Path,
    archive: &mut Archive,
    registry: &mut IdRegistry,
) -> Result<RunSummary> {
    let mut pool = StringPool::new();

    let trips_path = require(feed_dir, unzipped_dir, "trips.txt")?;
    let trips = schedule::read_trips(&mut Table::open(&trips_path)?, &mut pool)?;
    info!("read {} trips", trips.len());

    let stop_times_path = require(feed_dir, unzipped_dir, "stop_times.txt")?;
    let tables = schedule::read_stop_times(&mut Table::open(&stop_times_path)?, registry)?;
    info!(
        "reconstructed {} paths over {} route stops, {} distinct stops",
        tables.paths.len(),
        tables.route_stops.len(),
        registry.len()
    );

    emit(archive, "route_stops", |section| {
        schedule::write_route_stops(&tables, section)
    })?;
    emit(archive, "stop_times", |section| {
        schedule::write_stop_index(&tables, section)
    })?;
    emit(archive, "trips", |section| {
        schedule::write_trips(&trips, &pool, &tables, section)
    })?;

    let patterns = patterns::build_patterns(&trips, &tables)?;
    info!(
        "collapsed {} paths into {} patterns",
        tables.paths.len(),
        patterns.len()
    );
    emit(archive, "stop_to_route", |section| {
        patterns::write_patterns(&patterns, section)
    })?;

    if let Some(path) = source(feed_dir, unzipped_dir, "stops.txt")? {
        emit(archive, "stops", |section| {
            stops::parse_and_write(&mut Table::open(&path)?, registry, section)
        })?;
    }
    if let Some(path) = source(feed_dir, unzipped_dir, "routes.txt")? {
        emit(archive, "lines", |section| {
            lines::parse_and_write(&mut Table::open(&path)?, section)
        })?;
    }
    if let Some(path) = source(feed_dir, unzipped_dir, "calendar.txt")? {
        emit(archive, "calendar", |section| {
            calendar::parse_and_write(&mut Table::open(&path)?, section)
        })?;
    }
    if let Some(path) = source(feed_dir, unzipped_dir, "calendar_dates.txt")? {
        emit(archive, "calendar_dates", |section| {
            calendar::parse_and_write_dates(&mut Table::open(&path)?, section)
        })?;
    }
    if let Some(path) = source(feed_dir, unzipped_dir, "transfers.txt")? {
        emit(archive, "transfers", |section| {
            transfers::parse_and_write(&mut Table::open(&path)?, registry, section)
        })?;
    }
    if let Some(path) = source(feed_dir, unzipped_dir, "api.txt")? {
        emit(archive, "api", |section| {
            api::parse_and_write(BufReader::new(File::open(&path)?), section)
        })?;
    }

    Ok(RunSummary {
        trips: trips.len(),
        route_stops: tables.route_stops.len(),
        patterns: patterns.len(),
    })
}

/// Runs `body` into a fresh section and closes the section even when the body
/// fails, so a partial payload still lands in the archive for inspection.
fn emit<F>(archive: &mut Archive, name: &str, body: F) -> Result<()>
where
    F: FnOnce(&mut Section) -> Result<()>,
{
    let mut section = archive.open(name);
    let result = body(&mut section);
    archive.close(section)?;
    result
}

/// Locates an optional source table and drops its pass-through copy.
fn source(feed_dir: &Path, unzipped_dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let path = feed_dir.join(name);
    if !path.is_file() {
        warn!("feed has no {name}, skipping");
        return Ok(None);
    }
    fs::create_dir_all(unzipped_dir)?;
    let stem = name.strip_suffix(".txt").unwrap_or(name);
    fs::copy(&path, unzipped_dir.join(stem))?;
    Ok(Some(path))
}

fn require(feed_dir: &Path, unzipped_dir: &Path, name: &'static str) -> Result<PathBuf> {
    source(feed_dir, unzipped_dir, name)?.ok_or(Error::MissingTable(name))
}
