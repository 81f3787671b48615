//! FARS Report - yearly accident file loading, monthly summaries & state maps
//!
//! Reads the `accident_<year>.csv.bz2` files of the Fatality Analysis
//! Reporting System, counts accidents per month and year, and plots a
//! state's accident locations for a single year.

pub mod charts;
pub mod config;
pub mod data;
pub mod logging;
pub mod stats;

pub use charts::{map_state, sanitize_coordinates, MapError, MapOptions, MapOutcome};
pub use config::Config;
pub use data::{load_table, load_years, make_filename, DataLoader, LoaderError, YearLoad};
pub use stats::{summarize_years, MonthlySummary, SummaryError};
