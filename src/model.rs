use crate::registry::IdRegistry;
use log::warn;

/// Sentinel for identifiers that could not be parsed out of a malformed row.
pub const INVALID_ID: i32 = -1;

/// A stop visit target: the dense stop index plus the platform within it.
///
/// Stop codes come in as `U<stopId>Z<platform>` or `U<stopId>N<platform>`.
/// The `stop` half is the registry-assigned index of the numeric id, not the
/// raw code; both halves are encoded as 16-bit fields, which is enforced at
/// archive write time.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct StopRef {
    pub stop: i32,
    pub platform: i32,
}

impl StopRef {
    pub const INVALID: StopRef = StopRef {
        stop: INVALID_ID,
        platform: INVALID_ID,
    };

    pub fn is_valid(&self) -> bool {
        self.stop != INVALID_ID
    }
}

/// Splits a raw stop code into its numeric id and platform parts.
/// `None` for anything that does not follow the `U…Z|N…` shape.
fn split_stop_code(code: &str) -> Option<(i32, i32)> {
    let rest = code.strip_prefix('U')?;
    let separator = rest.find(['Z', 'N'])?;
    let stop_id: i32 = rest[..separator].parse().ok()?;
    let platform: i32 = rest[separator + 1..].parse().ok()?;
    Some((stop_id, platform))
}

/// Parses a full stop code into a [`StopRef`], interning the stop id.
///
/// Malformed codes are a row-level problem, not a run-level one: real feeds
/// carry the occasional broken auxiliary row, so this warns and hands back
/// the sentinel instead of failing.
pub fn parse_stop_code(code: &str, registry: &mut IdRegistry) -> StopRef {
    match split_stop_code(code) {
        Some((stop_id, platform)) => StopRef {
            stop: registry.index_of(stop_id) as i32,
            platform,
        },
        None => {
            warn!("invalid stop code '{code}'");
            StopRef::INVALID
        }
    }
}

/// Parses only the numeric stop id out of a stop code, without interning.
/// Used by the stop master table, which describes stops rather than visits.
pub fn parse_stop_id(code: &str) -> i32 {
    match split_stop_code(code) {
        Some((stop_id, _)) => stop_id,
        None => {
            warn!("invalid stop code '{code}'");
            INVALID_ID
        }
    }
}

/// Line number parsed out of a structured route code `L<lineId>D<variant>…`.
/// `None` when the code has another shape.
pub fn parse_line_id(route_id: &str) -> Option<i32> {
    let rest = route_id.strip_prefix('L')?;
    let separator = rest.find('D')?;
    rest[..separator].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IdRegistry;

    #[test]
    fn stop_codes_parse_with_either_separator() {
        let mut registry = IdRegistry::new();
        let z = parse_stop_code("U1234Z5", &mut registry);
        let n = parse_stop_code("U1234N5", &mut registry);
        assert_eq!(z, n);
        assert_eq!(z.platform, 5);
        // 1234 was the first id the registry ever saw
        assert_eq!(z.stop, 0);
    }

    #[test]
    fn malformed_stop_codes_yield_the_sentinel() {
        let mut registry = IdRegistry::new();
        assert_eq!(parse_stop_code("1234Z5", &mut registry), StopRef::INVALID);
        assert_eq!(parse_stop_code("U1234X5", &mut registry), StopRef::INVALID);
        assert_eq!(parse_stop_code("UZ", &mut registry), StopRef::INVALID);
        assert_eq!(parse_stop_id("garbage"), INVALID_ID);
        // nothing got interned along the way
        assert!(registry.is_empty());
    }

    #[test]
    fn line_ids_come_out_of_route_codes() {
        assert_eq!(parse_line_id("L67D2023"), Some(67));
        assert_eq!(parse_line_id("67D2023"), None);
        assert_eq!(parse_line_id("L67X"), None);
    }
}
