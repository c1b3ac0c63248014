use crate::archive::Section;
use crate::error::{Error, Result};
use log::warn;
use std::io::BufRead;

const START_TEXT: &str = "Linka/CVlaku = trip_id: ";

/// `api` section: the free-form trip-number mapping file. Each usable line
/// reads `Linka/CVlaku = trip_id: <line>/<route> = <trip>` and becomes a
/// `(trip_id:i32, line<<16|route:i32)` pair under an `i32` count prefix.
/// Lines without the expected prefix are logged and skipped.
pub fn parse_and_write<R: BufRead>(input: R, section: &mut Section) -> Result<()> {
    let mut entries: Vec<(i32, i32)> = Vec::new();

    for line in input.lines() {
        let line = line?;
        let Some(rest) = line.strip_prefix(START_TEXT) else {
            warn!("invalid api line: {line}");
            continue;
        };

        let (numbers, trip) = rest
            .split_once('=')
            .ok_or_else(|| Error::InvalidApi(line.clone()))?;
        let (line_id, route_id) = numbers
            .split_once('/')
            .ok_or_else(|| Error::InvalidApi(line.clone()))?;

        let line_id: i32 = line_id
            .trim()
            .parse()
            .map_err(|_| Error::InvalidApi(line.clone()))?;
        let route_id: i32 = route_id
            .trim()
            .parse()
            .map_err(|_| Error::InvalidApi(line.clone()))?;
        let trip_id: i32 = trip
            .trim()
            .parse()
            .map_err(|_| Error::InvalidApi(line.clone()))?;

        for half in [line_id, route_id] {
            if half < 0 || half > i16::MAX as i32 {
                return Err(Error::Overflow {
                    value: half as i64,
                    width: "i16",
                });
            }
        }

        entries.push((trip_id, (line_id << 16) | route_id));
    }

    section.write_len(entries.len())?;
    for (trip_id, packed) in entries {
        section.write_i32(trip_id)?;
        section.write_i32(packed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;
    use byteorder::{BigEndian, ReadBytesExt};
    use std::io::Cursor;

    fn run(input: &str) -> Result<Vec<u8>> {
        let archive = Archive::split(std::env::temp_dir()).unwrap();
        let mut section = archive.open("api");
        parse_and_write(input.as_bytes(), &mut section)?;
        Ok(section.into_bytes())
    }

    #[test]
    fn mappings_pack_line_and_route_into_one_word() {
        let payload = run(
            "Linka/CVlaku = trip_id: 12/345 = 678\n\
             noise that does not match\n\
             Linka/CVlaku = trip_id: 1/2 = 3\n",
        )
        .unwrap();

        let mut cursor = Cursor::new(payload);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), 2);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), 678);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), (12 << 16) | 345);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), 3);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), (1 << 16) | 2);
    }

    #[test]
    fn oversized_halves_overflow() {
        assert!(matches!(
            run("Linka/CVlaku = trip_id: 40000/1 = 2\n"),
            Err(Error::Overflow { width: "i16", .. })
        ));
    }

    #[test]
    fn garbled_numbers_in_a_matching_line_are_fatal() {
        assert!(matches!(
            run("Linka/CVlaku = trip_id: twelve/1 = 2\n"),
            Err(Error::InvalidApi(_))
        ));
    }
}
