//! Data module - FARS file loading and per-year tagging

mod loader;
mod yearly;

pub use loader::{
    load_table, make_filename, parse_integer, parse_year, require_columns, DataLoader,
    LoaderError,
};
pub use yearly::{load_years, load_years_parallel, tag_year, YearLoad};

/// Month of the accident, 1-12.
pub const MONTH: &str = "MONTH";
/// Numeric state code.
pub const STATE: &str = "STATE";
/// Longitude, with values above [`LONGITUDE_SENTINEL`] meaning "unknown".
pub const LONGITUDE: &str = "LONGITUD";
/// Latitude, with values above [`LATITUDE_SENTINEL`] meaning "unknown".
pub const LATITUDE: &str = "LATITUDE";
/// Column injected by the yearly loader; never present in the raw files.
pub const YEAR: &str = "year";

pub const LONGITUDE_SENTINEL: f64 = 900.0;
pub const LATITUDE_SENTINEL: f64 = 90.0;
