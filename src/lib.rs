pub mod api;
pub mod archive;
pub mod calendar;
pub mod error;
pub mod lines;
pub mod model;
pub mod patterns;
pub mod pipeline;
pub mod registry;
pub mod schedule;
pub mod stops;
pub mod time;
pub mod transfers;

pub use error::{Error, Result};
