use crate::archive::Section;
use crate::error::{Error, Result};
use std::io;
use tabular::Table;

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// `calendar` section: one boolean-framed record per service —
/// `(service_id:i16, start:i32, end:i32, weekday_mask:u8)`. Bit 0 of the mask
/// is Monday.
pub fn parse_and_write<R: io::Read>(table: &mut Table<R>, section: &mut Section) -> Result<()> {
    while let Some(row) = table.next_row()? {
        section.write_bool(true)?;

        let service_id = row.get_int("service_id").ok_or(Error::MissingField {
            column: "service_id",
        })?;
        let start = pack_date(row.get_or("start_date", ""))?;
        let end = pack_date(row.get_or("end_date", ""))?;

        let mut mask = 0;
        for (bit, day) in WEEKDAYS.iter().enumerate() {
            if row.get_bool(day) {
                mask |= 1 << bit;
            }
        }

        section.write_i16(service_id)?;
        section.write_i32(start)?;
        section.write_i32(end)?;
        section.write_u8(mask)?;
    }
    section.write_bool(false)
}

/// `calendar_dates` section: per-day exceptions —
/// `(service_id:i16, date:i32, exception_type:i8)`.
pub fn parse_and_write_dates<R: io::Read>(
    table: &mut Table<R>,
    section: &mut Section,
) -> Result<()> {
    while let Some(row) = table.next_row()? {
        section.write_bool(true)?;

        let service_id = row.get_int("service_id").ok_or(Error::MissingField {
            column: "service_id",
        })?;
        let date = pack_date(row.get_or("date", ""))?;
        let exception_type = row.get_int("exception_type").ok_or(Error::MissingField {
            column: "exception_type",
        })?;

        section.write_i16(service_id)?;
        section.write_i32(date)?;
        section.write_i8(exception_type)?;
    }
    section.write_bool(false)
}

/// `YYYYMMDD` packed as `year << 16 | month << 8 | day`.
fn pack_date(raw: &str) -> Result<i32> {
    if raw.len() != 8 || !raw.is_ascii() {
        return Err(Error::InvalidDate(raw.to_string()));
    }
    let field =
        |range: std::ops::Range<usize>| -> Result<i32> {
            raw[range]
                .parse()
                .map_err(|_| Error::InvalidDate(raw.to_string()))
        };
    let year = field(0..4)?;
    let month = field(4..6)?;
    let day = field(6..8)?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(Error::InvalidDate(raw.to_string()));
    }

    Ok((year << 16) | (month << 8) | day)
}
