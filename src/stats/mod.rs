//! Stats module - monthly accident counts

mod summary;

pub use summary::{summarize_loads, summarize_years, MonthRow, MonthlySummary, SummaryError};
