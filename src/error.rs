use thiserror::Error;

/// Everything that can abort an encoding run.
///
/// Malformed stop codes and unstructured route names in display-only tables
/// degrade to sentinels instead and never show up here; these variants are
/// the conditions under which a partial archive would be unusable.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Table(#[from] tabular::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A value does not fit the fixed-width field it is encoded into.
    #[error("value {value} does not fit into {width}")]
    Overflow { value: i64, width: &'static str },
    /// Trip rows must arrive with consecutive raw ids starting at 1.
    #[error("expected trip id {expected}, got {got}")]
    TripOrder { expected: i32, got: i32 },
    /// A stop-time row continued an open path but named a different trip.
    #[error("row for trip {row_trip} at sequence {sequence} inside the path of trip {path_trip}")]
    TripMismatch {
        path_trip: i32,
        row_trip: i32,
        sequence: i32,
    },
    #[error("path of trip {trip} has {len} stops, the per-trip limit is 127")]
    PathTooLong { trip: i32, len: usize },
    #[error("trip {trip} has no stop-time path")]
    MissingPath { trip: i32 },
    /// Two members of one pattern group disagree on a stop. The grouping key
    /// is supposed to make this impossible.
    #[error("pattern group diverged at trip {trip}, stop {position}")]
    PatternDiverged { trip: i32, position: usize },
    /// Schedule times carry a seconds field that must be zero.
    #[error("schedule time '{0}' has sub-minute precision")]
    SubMinutePrecision(String),
    #[error("unparsable schedule time '{0}'")]
    InvalidTime(String),
    #[error("unparsable color '{0}'")]
    InvalidColor(String),
    #[error("unparsable date '{0}'")]
    InvalidDate(String),
    #[error("route id '{0}' is not of the form L<line>D<variant>")]
    InvalidRoute(String),
    #[error("unparsable api mapping line '{0}'")]
    InvalidApi(String),
    #[error("required column '{column}' is empty or missing")]
    MissingField { column: &'static str },
    #[error("feed has no {0}")]
    MissingTable(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
