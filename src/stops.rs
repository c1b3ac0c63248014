use crate::archive::Section;
use crate::error::{Error, Result};
use crate::model::{parse_stop_id, INVALID_ID};
use crate::registry::IdRegistry;
use rustc_hash::FxHashSet;
use std::io;
use tabular::Table;

/// `stops` section: one record per physical stop (the source table repeats a
/// stop once per platform), keyed by its dense index. Boolean-framed record
/// stream: `(true, index:i32, name, lat:f64, lon:f64)*` then `false`.
pub fn parse_and_write<R: io::Read>(
    table: &mut Table<R>,
    registry: &mut IdRegistry,
    section: &mut Section,
) -> Result<()> {
    let mut seen: FxHashSet<i32> = FxHashSet::default();

    while let Some(row) = table.next_row()? {
        let raw = parse_stop_id(row.get_or("stop_id", ""));
        if !seen.insert(raw) {
            continue;
        }

        let index = if raw == INVALID_ID {
            INVALID_ID
        } else {
            registry.index_of(raw) as i32
        };

        section.write_bool(true)?;
        section.write_i32(index)?;
        section.write_string(row.get_or("stop_name", ""))?;

        let lat = row.get_double("stop_lat").ok_or(Error::MissingField {
            column: "stop_lat",
        })?;
        let lon = row.get_double("stop_lon").ok_or(Error::MissingField {
            column: "stop_lon",
        })?;
        section.write_f64(lat)?;
        section.write_f64(lon)?;
    }

    section.write_bool(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;
    use byteorder::{BigEndian, ReadBytesExt};
    use std::io::{Cursor, Read};

    #[test]
    fn platforms_collapse_into_one_stop_record() {
        let input = "stop_id,stop_name,stop_lat,stop_lon\n\
                     U10Z1,Ceska,49.1,16.6\n\
                     U10Z2,Ceska,49.1,16.6\n\
                     U11Z1,Hlavni nadrazi,49.2,16.7\n";
        let mut table = Table::from_reader(input.as_bytes()).unwrap();
        let mut registry = IdRegistry::new();
        let archive = Archive::split(std::env::temp_dir()).unwrap();
        let mut section = archive.open("stops");

        parse_and_write(&mut table, &mut registry, &mut section).unwrap();
        assert_eq!(registry.len(), 2);

        let mut cursor = Cursor::new(section.into_bytes());
        // first record
        assert_eq!(cursor.read_u8().unwrap(), 1);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), 0);
        let name_len = cursor.read_u32::<BigEndian>().unwrap() as usize;
        let mut name = vec![0; name_len];
        cursor.read_exact(&mut name).unwrap();
        assert_eq!(name, b"Ceska");
        assert_eq!(cursor.read_f64::<BigEndian>().unwrap(), 49.1);
        assert_eq!(cursor.read_f64::<BigEndian>().unwrap(), 16.6);
        // second record, then the end marker
        assert_eq!(cursor.read_u8().unwrap(), 1);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), 1);
        let name_len = cursor.read_u32::<BigEndian>().unwrap() as usize;
        cursor.set_position(cursor.position() + name_len as u64 + 16);
        assert_eq!(cursor.read_u8().unwrap(), 0);
    }

    #[test]
    fn malformed_codes_get_one_sentinel_record() {
        let input = "stop_id,stop_name,stop_lat,stop_lon\n\
                     bogus,Nowhere,0.0,0.0\n\
                     alsobogus,Nowhere II,0.0,0.0\n";
        let mut table = Table::from_reader(input.as_bytes()).unwrap();
        let mut registry = IdRegistry::new();
        let archive = Archive::split(std::env::temp_dir()).unwrap();
        let mut section = archive.open("stops");

        parse_and_write(&mut table, &mut registry, &mut section).unwrap();
        assert!(registry.is_empty());

        let mut cursor = Cursor::new(section.into_bytes());
        assert_eq!(cursor.read_u8().unwrap(), 1);
        assert_eq!(cursor.read_i32::<BigEndian>().unwrap(), INVALID_ID);
    }
}
