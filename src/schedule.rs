use crate::archive::Section;
use crate::error::{Error, Result};
use crate::model::{parse_line_id, parse_stop_code, StopRef};
use crate::registry::{trip_index, IdRegistry, StringPool};
use crate::time::ScheduleTime;
use rustc_hash::FxHashMap;
use std::io;
use tabular::Table;

/// Path lengths are encoded as a signed byte.
pub const MAX_PATH_LEN: usize = 127;

/// One scheduled trip, fully resolved to dense identifiers.
#[derive(Debug, Clone)]
pub struct Trip {
    pub service_id: i32,
    pub line_id: i32,
    pub headsign: u32,
    /// -1 when the trip is not part of a vehicle block.
    pub block_id: i32,
    pub wheelchair: bool,
}

/// One stop visit inside a trip.
#[derive(Debug, Clone)]
pub struct RouteStop {
    pub trip: i32,
    pub stop: StopRef,
    pub sequence: i32,
    pub arrival: ScheduleTime,
    pub departure: ScheduleTime,
}

/// A contiguous run of [`RouteStop`]s belonging to one trip.
#[derive(Debug, Clone)]
pub struct TripPath {
    pub trip: i32,
    pub start: usize,
    pub len: usize,
}

/// Everything the stop-visits pass produces: the reconstructed paths, the
/// flat global route-stop array they index into, and the inverted
/// stop-to-route-stop mapping.
#[derive(Debug, Default)]
pub struct ScheduleTables {
    pub paths: Vec<TripPath>,
    pub route_stops: Vec<RouteStop>,
    pub by_stop: FxHashMap<i32, Vec<u32>>,
}

/// Trips pass. The trip table is assumed zero-based (after the fixed id
/// shift), contiguous and sorted; any gap or reorder is a consistency error
/// because later passes address trips by position.
pub fn read_trips<R: io::Read>(table: &mut Table<R>, pool: &mut StringPool) -> Result<Vec<Trip>> {
    let mut trips = Vec::new();
    let mut expected = 0;

    while let Some(row) = table.next_row()? {
        let raw = row
            .get_int("trip_id")
            .ok_or(Error::MissingField { column: "trip_id" })?;
        let id = trip_index(raw);
        if id != expected {
            return Err(Error::TripOrder { expected, got: id });
        }
        expected += 1;

        let route_id = row.get_or("route_id", "");
        let line_id =
            parse_line_id(route_id).ok_or_else(|| Error::InvalidRoute(route_id.to_string()))?;
        let service_id = row.get_int("service_id").ok_or(Error::MissingField {
            column: "service_id",
        })?;
        let headsign = pool.intern(row.get_or("trip_headsign", ""));
        let block_id = row.get_int_or("block_id", -1);
        let wheelchair = row.get_bool("wheelchair_accessible");

        trips.push(Trip {
            service_id,
            line_id,
            headsign,
            block_id,
            wheelchair,
        });
    }

    Ok(trips)
}

/// Stop-visits pass.
///
/// Rows are grouped by trip with `stop_sequence` strictly increasing inside a
/// trip (gaps allowed). Trip boundaries are detected from the sequence
/// counter alone: a non-increase closes the open path and starts the next one
/// at the current row. A trip id change while the sequence is still climbing
/// can therefore only mean corrupted input.
pub fn read_stop_times<R: io::Read>(
    table: &mut Table<R>,
    registry: &mut IdRegistry,
) -> Result<ScheduleTables> {
    let mut tables = ScheduleTables::default();
    let mut open: Option<TripPath> = None;
    let mut prev_sequence = 0;

    while let Some(row) = table.next_row()? {
        let trip = trip_index(
            row.get_int("trip_id")
                .ok_or(Error::MissingField { column: "trip_id" })?,
        );
        let stop = parse_stop_code(row.get_or("stop_id", ""), registry);
        let sequence = row.get_int("stop_sequence").ok_or(Error::MissingField {
            column: "stop_sequence",
        })?;
        let arrival = ScheduleTime::parse(row.get_or("arrival_time", ""))?;
        let departure = ScheduleTime::parse(row.get_or("departure_time", ""))?;

        open = Some(match open.take() {
            Some(mut path) if sequence > prev_sequence => {
                if path.trip != trip {
                    return Err(Error::TripMismatch {
                        path_trip: path.trip,
                        row_trip: trip,
                        sequence,
                    });
                }
                path.len += 1;
                path
            }
            Some(path) => {
                close_path(&mut tables.paths, path)?;
                TripPath {
                    trip,
                    start: tables.route_stops.len(),
                    len: 1,
                }
            }
            None => TripPath {
                trip,
                start: tables.route_stops.len(),
                len: 1,
            },
        });

        tables
            .by_stop
            .entry(stop.stop)
            .or_default()
            .push(tables.route_stops.len() as u32);
        tables.route_stops.push(RouteStop {
            trip,
            stop,
            sequence,
            arrival,
            departure,
        });
        prev_sequence = sequence;
    }

    // the last path never hits the sequence-reset rule
    if let Some(path) = open {
        close_path(&mut tables.paths, path)?;
    }

    Ok(tables)
}

fn close_path(paths: &mut Vec<TripPath>, path: TripPath) -> Result<()> {
    if path.len > MAX_PATH_LEN {
        return Err(Error::PathTooLong {
            trip: path.trip,
            len: path.len,
        });
    }
    paths.push(path);
    Ok(())
}

/// `route_stops` section: the flat global route-stop array, addressed by
/// position.
pub fn write_route_stops(tables: &ScheduleTables, section: &mut Section) -> Result<()> {
    for route_stop in &tables.route_stops {
        section.write_i16(route_stop.stop.stop)?;
        section.write_i32(route_stop.trip)?;
        section.write_i16(route_stop.stop.platform)?;
        section.write_i16(route_stop.sequence)?;
        route_stop.arrival.encode(section)?;
        route_stop.departure.encode(section)?;
    }
    Ok(())
}

/// `stop_times` section: dense stop index -> list of global route-stop
/// indices. Keys are written sorted so re-runs produce identical bytes.
pub fn write_stop_index(tables: &ScheduleTables, section: &mut Section) -> Result<()> {
    let mut stops: Vec<i32> = tables.by_stop.keys().copied().collect();
    stops.sort_unstable();

    section.write_len(stops.len())?;
    for stop in stops {
        section.write_i16(stop)?;
        let visits = &tables.by_stop[&stop];
        section.write_len(visits.len())?;
        for &index in visits {
            section.write_i32(index as i32)?;
        }
    }
    Ok(())
}

/// `trips` section: the headsign pool followed by one fixed-width record per
/// trip, including where its path lives in the route-stop array.
pub fn write_trips(
    trips: &[Trip],
    pool: &StringPool,
    tables: &ScheduleTables,
    section: &mut Section,
) -> Result<()> {
    section.write_len(pool.len())?;
    for (id, name) in pool.iter() {
        section.write_i32(id as i32)?;
        section.write_string(name)?;
    }

    let mut path_of_trip: FxHashMap<i32, &TripPath> = FxHashMap::default();
    for path in &tables.paths {
        path_of_trip.insert(path.trip, path);
    }

    section.write_len(trips.len())?;
    for (id, trip) in trips.iter().enumerate() {
        let path = path_of_trip
            .get(&(id as i32))
            .ok_or(Error::MissingPath { trip: id as i32 })?;

        section.write_i16(trip.service_id)?;
        section.write_i16(trip.line_id)?;
        section.write_i32(trip.headsign as i32)?;
        section.write_i16(trip.block_id)?;
        section.write_i8(trip.wheelchair as i32)?;
        section.write_len(path.start)?;
        section.write_i8(path.len as i32)?;
    }
    Ok(())
}
