//! Module for the error management
use thiserror::Error;

/// An error that can occur while reading a table.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic Input/Output error while reading a stream
    #[error("impossible to read table")]
    Io(#[from] std::io::Error),
    /// Impossible to read a named file
    #[error("impossible to read '{file_name}'")]
    NamedIo {
        /// The file that could not be read
        file_name: String,
        #[source]
        source: std::io::Error,
    },
    /// A line could not be split into fields
    #[error("impossible to parse row")]
    Csv(#[from] csv::Error),
}
