use crate::archive::Section;
use crate::error::{Error, Result};
use crate::model::{parse_line_id, INVALID_ID};
use rgb::RGB8;
use std::io;
use tabular::Table;

const DEFAULT_COLOR: &str = "00E68C";
const DEFAULT_TEXT_COLOR: &str = "000000";

/// `lines` section: display metadata per route row. Boolean-framed records of
/// `(line_id:i32, short_name, background rgb, text rgb)`.
///
/// Unlike the trips pass, a route code of another shape is only a display
/// problem here, so it degrades to the -1 sentinel instead of aborting.
pub fn parse_and_write<R: io::Read>(table: &mut Table<R>, section: &mut Section) -> Result<()> {
    while let Some(row) = table.next_row()? {
        section.write_bool(true)?;

        let route_id = row.get_or("route_id", "");
        let line_id = parse_line_id(route_id).unwrap_or(INVALID_ID);
        let background = parse_color(row.get_or("route_color", DEFAULT_COLOR))?;
        let text = parse_color(row.get_or("route_text_color", DEFAULT_TEXT_COLOR))?;

        section.write_i32(line_id)?;
        section.write_string(row.get_or("route_short_name", ""))?;
        write_color(section, background)?;
        write_color(section, text)?;
    }
    section.write_bool(false)
}

fn write_color(section: &mut Section, color: RGB8) -> Result<()> {
    section.write_u8(color.r as i32)?;
    section.write_u8(color.g as i32)?;
    section.write_u8(color.b as i32)
}

/// `RRGGBB` without a leading `#`.
fn parse_color(raw: &str) -> Result<RGB8> {
    if raw.len() != 6 || !raw.is_ascii() {
        return Err(Error::InvalidColor(raw.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&raw[range], 16).map_err(|_| Error::InvalidColor(raw.to_string()))
    };
    Ok(RGB8 {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}
