use crate::archive::Section;
use crate::error::{Error, Result};
use crate::schedule::{ScheduleTables, Trip, TripPath};
use crate::time::ScheduleTime;
use log::{error, warn};
use rustc_hash::FxHashMap;

/// Many trips drive the exact same ordered stop sequence on the same
/// calendar and differ only in departure times. Each such group collapses
/// into one pattern: the earliest member becomes the baseline and every other
/// member is stored as per-stop minute offsets against it.
pub struct Pattern {
    pub stops: Vec<PatternStop>,
}

/// One position of a pattern: the baseline's stop, platform, calendar and
/// departure, plus one packed entry per co-pattern trip.
pub struct PatternStop {
    pub stop: i32,
    pub platform: i32,
    pub service_id: i32,
    pub start: ScheduleTime,
    /// `(route_stop_index << 32) | (minute_offset as u32)` per follower.
    pub followers: Vec<i64>,
}

/// Grouping key: the full ordered visit sequence plus the calendar. Two trips
/// with the same stops but different service days must stay distinct, since
/// clients filter patterns by day. Hashing covers every element, not a
/// prefix.
#[derive(PartialEq, Eq, Hash)]
struct PatternKey {
    stops: Vec<(i32, i32)>,
    service_id: i32,
}

pub fn pack_follower(route_stop_index: usize, offset_minutes: i32) -> i64 {
    ((route_stop_index as i64) << 32) | (offset_minutes as u32 as i64)
}

/// Groups all paths and emits one pattern per group, in discovery order.
pub fn build_patterns(trips: &[Trip], tables: &ScheduleTables) -> Result<Vec<Pattern>> {
    let mut group_index: FxHashMap<PatternKey, usize> = FxHashMap::default();
    let mut groups: Vec<Vec<&TripPath>> = Vec::new();

    for path in &tables.paths {
        let trip = trips
            .get(path.trip as usize)
            .ok_or(Error::MissingPath { trip: path.trip })?;
        let visits = &tables.route_stops[path.start..path.start + path.len];
        let key = PatternKey {
            stops: visits
                .iter()
                .map(|rs| (rs.stop.stop, rs.stop.platform))
                .collect(),
            service_id: trip.service_id,
        };

        match group_index.get(&key) {
            Some(&index) => groups[index].push(path),
            None => {
                group_index.insert(key, groups.len());
                groups.push(vec![path]);
            }
        }
    }

    let mut patterns = Vec::with_capacity(groups.len());
    for mut members in groups {
        // baseline = earliest first-stop departure; the sort is stable, so
        // exact ties keep their discovery order
        members.sort_by_key(|path| tables.route_stops[path.start].departure);
        let baseline = members[0];
        let service_id = trips[baseline.trip as usize].service_id;

        let mut stops = Vec::with_capacity(baseline.len);
        for position in 0..baseline.len {
            let base = &tables.route_stops[baseline.start + position];

            let mut followers = Vec::with_capacity(members.len() - 1);
            for follower in &members[1..] {
                let index = follower.start + position;
                let visit = &tables.route_stops[index];

                // the key already guarantees this; a mismatch here means the
                // equality or hashing over the sequence is broken
                if visit.stop != base.stop {
                    dump_group(&members, tables);
                    return Err(Error::PatternDiverged {
                        trip: follower.trip,
                        position,
                    });
                }

                let offset = visit.departure.minutes_diff(&base.departure);
                followers.push(pack_follower(index, offset));
            }

            stops.push(PatternStop {
                stop: base.stop.stop,
                platform: base.stop.platform,
                service_id,
                start: base.departure,
                followers,
            });
        }

        patterns.push(Pattern { stops });
    }

    Ok(patterns)
}

fn dump_group(members: &[&TripPath], tables: &ScheduleTables) {
    for path in members {
        let visits: Vec<String> = tables.route_stops[path.start..path.start + path.len]
            .iter()
            .map(|rs| format!("{}:{}", rs.stop.stop, rs.stop.platform))
            .collect();
        error!("pattern member trip {}: {}", path.trip, visits.join(" "));
    }
}

/// `stop_to_route` section: a dense slot per stop index, each slot listing
/// the pattern stops through it. Lets a client answer "trips through stop X"
/// with one indexed read.
pub fn write_patterns(patterns: &[Pattern], section: &mut Section) -> Result<()> {
    let mut max_stop = -1;
    for pattern in patterns {
        for stop in &pattern.stops {
            max_stop = max_stop.max(stop.stop);
        }
    }

    let mut slots: Vec<Vec<&PatternStop>> = vec![Vec::new(); (max_stop + 1) as usize];
    for pattern in patterns {
        for stop in &pattern.stops {
            if stop.stop < 0 {
                // sentinel stops have no slot in a dense table
                warn!("pattern visits an unresolved stop, not indexable");
                continue;
            }
            slots[stop.stop as usize].push(stop);
        }
    }

    section.write_len(slots.len())?;
    for slot in &slots {
        section.write_len(slot.len())?;
        for stop in slot {
            section.write_i16(stop.stop)?;
            section.write_i16(stop.platform)?;
            section.write_i16(stop.service_id)?;
            stop.start.encode(section)?;

            section.write_i16(stop.followers.len() as i32)?;
            for &packed in &stop.followers {
                section.write_i64(packed)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IdRegistry;
    use crate::schedule::read_stop_times;
    use tabular::Table;

    fn trip(service_id: i32) -> Trip {
        Trip {
            service_id,
            line_id: 1,
            headsign: 0,
            block_id: -1,
            wheelchair: false,
        }
    }

    fn tables_from(input: &str) -> ScheduleTables {
        let mut table = Table::from_reader(input.as_bytes()).unwrap();
        read_stop_times(&mut table, &mut IdRegistry::new()).unwrap()
    }

    const HEADER: &str = "trip_id,stop_id,stop_sequence,arrival_time,departure_time\n";

    #[test]
    fn identical_sequences_on_one_calendar_collapse() {
        let input = format!(
            "{HEADER}\
             1,U1Z1,1,08:00:00,08:00:00\n\
             1,U2Z1,2,08:10:00,08:10:00\n\
             2,U1Z1,1,08:15:00,08:15:00\n\
             2,U2Z1,2,08:25:00,08:25:00\n"
        );
        let tables = tables_from(&input);
        let trips = vec![trip(7), trip(7)];

        let patterns = build_patterns(&trips, &tables).unwrap();
        assert_eq!(patterns.len(), 1);

        let pattern = &patterns[0];
        assert_eq!(pattern.stops.len(), 2);
        // baseline is the 08:00 trip
        assert_eq!(pattern.stops[0].start, ScheduleTime::new(8, 0));
        assert_eq!(pattern.stops[0].service_id, 7);
        // the follower runs 15 minutes later at the first stop
        assert_eq!(pattern.stops[0].followers, vec![pack_follower(2, 15)]);
        assert_eq!(pattern.stops[1].followers, vec![pack_follower(3, 15)]);
    }

    #[test]
    fn baseline_is_the_earliest_member_regardless_of_feed_order() {
        // the late trip appears first in the table
        let input = format!(
            "{HEADER}\
             1,U1Z1,1,09:00:00,09:00:00\n\
             2,U1Z1,1,08:30:00,08:30:00\n"
        );
        let tables = tables_from(&input);
        let patterns = build_patterns(&vec![trip(1), trip(1)], &tables).unwrap();

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].stops[0].start, ScheduleTime::new(8, 30));
        // the 09:00 trip becomes a follower with a positive offset
        assert_eq!(patterns[0].stops[0].followers, vec![pack_follower(0, 30)]);
    }

    #[test]
    fn offsets_may_be_negative_after_midnight_wrap() {
        let input = format!(
            "{HEADER}\
             1,U1Z1,1,08:00:00,08:00:00\n\
             1,U2Z1,2,08:30:00,08:30:00\n\
             2,U1Z1,1,08:10:00,08:10:00\n\
             2,U2Z1,2,08:25:00,08:25:00\n"
        );
        let tables = tables_from(&input);
        let patterns = build_patterns(&vec![trip(1), trip(1)], &tables).unwrap();

        let pattern = &patterns[0];
        assert_eq!(pattern.stops[0].followers, vec![pack_follower(2, 10)]);
        // the follower is *earlier* than the baseline at the second stop
        assert_eq!(pattern.stops[1].followers, vec![pack_follower(3, -5)]);
        // the packed low half is the two's complement of -5
        assert_eq!(pattern.stops[1].followers[0] & 0xFFFF_FFFF, 0xFFFF_FFFB);
    }

    #[test]
    fn different_calendars_split_otherwise_equal_sequences() {
        let input = format!(
            "{HEADER}\
             1,U1Z1,1,08:00:00,08:00:00\n\
             2,U1Z1,1,08:15:00,08:15:00\n"
        );
        let tables = tables_from(&input);
        let patterns = build_patterns(&vec![trip(1), trip(2)], &tables).unwrap();
        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().all(|p| p.stops[0].followers.is_empty()));
    }

    #[test]
    fn different_platforms_split_otherwise_equal_sequences() {
        let input = format!(
            "{HEADER}\
             1,U1Z1,1,08:00:00,08:00:00\n\
             2,U1Z2,1,08:15:00,08:15:00\n"
        );
        let tables = tables_from(&input);
        let patterns = build_patterns(&vec![trip(1), trip(1)], &tables).unwrap();
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn exact_departure_ties_keep_discovery_order() {
        let input = format!(
            "{HEADER}\
             1,U1Z1,1,08:00:00,08:00:00\n\
             2,U1Z1,1,08:00:00,08:00:00\n"
        );
        let tables = tables_from(&input);
        let patterns = build_patterns(&vec![trip(1), trip(1)], &tables).unwrap();

        // trip 0 was discovered first and stays the baseline
        assert_eq!(patterns[0].stops[0].followers, vec![pack_follower(1, 0)]);
    }
}
