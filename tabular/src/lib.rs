//! Forward-only reader for header-plus-rows text tables.
//!
//! A GTFS feed is a set of comma separated tables where the first line names
//! the columns. Consumers address fields by column name and decide themselves
//! whether a missing or malformed value is an error, so every accessor here
//! returns an `Option` or takes a default instead of failing.

use rustc_hash::FxHashMap;
use std::fs::File;
use std::io;
use std::path::Path;

pub mod error;
pub use error::Error;

/// One table, opened on an underlying byte stream.
///
/// Rows are produced lazily and can only be walked once.
pub struct Table<R: io::Read> {
    columns: FxHashMap<String, usize>,
    reader: csv::Reader<R>,
    record: csv::StringRecord,
}

impl Table<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::NamedIo {
            file_name: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }
}

impl<R: io::Read> Table<R> {
    /// Parses the header line and positions the reader at the first row.
    pub fn from_reader(input: R) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        let headers = reader.headers()?.clone();

        let mut columns = FxHashMap::default();
        for (index, name) in headers.iter().enumerate() {
            // Some feeds carry a UTF-8 byte order mark glued to the first
            // column name.
            let name = if index == 0 {
                name.trim_start_matches('\u{feff}')
            } else {
                name
            };
            columns.insert(name.to_string(), index);
        }

        Ok(Table {
            columns,
            reader,
            record: csv::StringRecord::new(),
        })
    }

    /// Advances to the next row. `Ok(None)` marks the end of the table.
    pub fn next_row(&mut self) -> Result<Option<Row<'_>>, Error> {
        if self.reader.read_record(&mut self.record)? {
            Ok(Some(Row {
                columns: &self.columns,
                record: &self.record,
            }))
        } else {
            Ok(None)
        }
    }
}

/// A single row, addressed by column name.
pub struct Row<'t> {
    columns: &'t FxHashMap<String, usize>,
    record: &'t csv::StringRecord,
}

impl<'t> Row<'t> {
    /// Raw field value. `None` when the column is unknown or the row is
    /// shorter than the header.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = *self.columns.get(name)?;
        self.record.get(index)
    }

    /// Like [`Row::get`] but a blank field also resolves to the default.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.get(name) {
            Some(value) if !value.trim().is_empty() => value,
            _ => default,
        }
    }

    /// `None` on a missing or non-numeric field; the caller chooses whether
    /// absence is fatal.
    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get(name)?.parse().ok()
    }

    pub fn get_int_or(&self, name: &str, default: i32) -> i32 {
        self.get_int(name).unwrap_or(default)
    }

    /// Truthy values are exactly `"true"` and `"1"`, after trimming and
    /// ignoring case. Everything else, including a missing field, is false.
    pub fn get_bool(&self, name: &str) -> bool {
        match self.get(name) {
            Some(value) => {
                let value = value.trim().to_ascii_lowercase();
                value == "true" || value == "1"
            }
            None => false,
        }
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.get(name)?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(input: &str) -> Table<&[u8]> {
        Table::from_reader(input.as_bytes()).unwrap()
    }

    #[test]
    fn strips_byte_order_mark_from_first_header() {
        let mut t = table("\u{feff}stop_id,stop_name\n12,Hlavni nadrazi\n");
        let row = t.next_row().unwrap().unwrap();
        assert_eq!(row.get("stop_id"), Some("12"));
        assert_eq!(row.get("stop_name"), Some("Hlavni nadrazi"));
    }

    #[test]
    fn quoted_field_may_contain_the_delimiter() {
        let mut t = table("stop_id,stop_name\n7,\"Brno, Ceska\"\n");
        let row = t.next_row().unwrap().unwrap();
        assert_eq!(row.get("stop_name"), Some("Brno, Ceska"));
    }

    #[test]
    fn blank_and_missing_fields_resolve_to_defaults() {
        let mut t = table("a,b,c\n1,,\n");
        let row = t.next_row().unwrap().unwrap();
        assert_eq!(row.get_or("b", "fallback"), "fallback");
        assert_eq!(row.get_or("missing", "fallback"), "fallback");
        assert_eq!(row.get_int("b"), None);
        assert_eq!(row.get_int_or("b", -1), -1);
        assert_eq!(row.get_int("a"), Some(1));
    }

    #[test]
    fn short_rows_do_not_fail() {
        let mut t = table("a,b,c\n1,2\n");
        let row = t.next_row().unwrap().unwrap();
        assert_eq!(row.get("c"), None);
    }

    #[test]
    fn boolean_parsing_is_case_and_whitespace_insensitive() {
        let mut t = table("x,y,z,w\nTRUE, 1 ,no,\n");
        let row = t.next_row().unwrap().unwrap();
        assert!(row.get_bool("x"));
        assert!(row.get_bool("y"));
        assert!(!row.get_bool("z"));
        assert!(!row.get_bool("w"));
    }

    #[test]
    fn rows_are_finite_and_forward_only() {
        let mut t = table("a\n1\n2\n");
        assert_eq!(t.next_row().unwrap().unwrap().get_int("a"), Some(1));
        assert_eq!(t.next_row().unwrap().unwrap().get_int("a"), Some(2));
        assert!(t.next_row().unwrap().is_none());
    }

    #[test]
    fn doubles_parse_or_yield_none() {
        let mut t = table("lat,lon\n49.19,bogus\n");
        let row = t.next_row().unwrap().unwrap();
        assert_eq!(row.get_double("lat"), Some(49.19));
        assert_eq!(row.get_double("lon"), None);
    }
}
