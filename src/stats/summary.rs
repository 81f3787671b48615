//! Summary Module
//! Counts accidents per (year, month) across several yearly files and
//! reshapes the counts into a month-by-year matrix.

use crate::data::{
    load_years, load_years_parallel, require_columns, DataLoader, LoaderError, YearLoad, MONTH,
    YEAR,
};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("none of the {requested} requested year(s) could be loaded")]
    EmptyInput { requested: usize },
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Counts for one month, one cell per year of [`MonthlySummary::years`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthRow {
    pub month: i32,
    /// `None` when the month has no accidents in that year.
    pub counts: Vec<Option<u32>>,
}

/// Month-by-year accident counts.
///
/// Rows are the months observed in any year, ascending; columns are the
/// distinct years, ascending. A (month, year) pair with no rows is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    years: Vec<i32>,
    rows: Vec<MonthRow>,
}

impl MonthlySummary {
    /// Concatenate tagged `(MONTH, year)` tables and count rows per group.
    pub fn from_tables(tables: &[DataFrame]) -> Result<Self, SummaryError> {
        let Some((first, rest)) = tables.split_first() else {
            return Err(SummaryError::EmptyInput { requested: 0 });
        };

        require_columns(first, &[MONTH, YEAR])?;
        let mut combined = first.clone();
        for table in rest {
            combined.vstack_mut(table)?;
        }

        let months = combined.column(MONTH)?.cast(&DataType::Int32)?;
        let years = combined.column(YEAR)?.cast(&DataType::Int32)?;

        let mut counts: BTreeMap<(i32, i32), u32> = BTreeMap::new();
        let mut dropped = 0usize;
        for (month, year) in months.i32()?.into_iter().zip(years.i32()?.into_iter()) {
            match (month, year) {
                (Some(month), Some(year)) => *counts.entry((month, year)).or_insert(0) += 1,
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(dropped, "rows without a month left out of the summary");
        }

        Ok(Self::from_counts(&counts))
    }

    fn from_counts(counts: &BTreeMap<(i32, i32), u32>) -> Self {
        let years: Vec<i32> = counts
            .keys()
            .map(|&(_, year)| year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let months: BTreeSet<i32> = counts.keys().map(|&(month, _)| month).collect();

        let rows = months
            .into_iter()
            .map(|month| MonthRow {
                month,
                counts: years
                    .iter()
                    .map(|&year| counts.get(&(month, year)).copied())
                    .collect(),
            })
            .collect();

        Self { years, rows }
    }

    /// Load `years` (optionally on the rayon pool) and summarize them.
    pub fn load(loader: &DataLoader, years: &[i32], parallel: bool) -> Result<Self, SummaryError> {
        let loads = if parallel {
            load_years_parallel(loader, years)
        } else {
            load_years(loader, years)
        };
        summarize_loads(loads)
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn months(&self) -> Vec<i32> {
        self.rows.iter().map(|row| row.month).collect()
    }

    pub fn rows(&self) -> &[MonthRow] {
        &self.rows
    }

    /// Count for one cell; `None` if the pair never occurs.
    pub fn count(&self, month: i32, year: i32) -> Option<u32> {
        let col = self.years.iter().position(|&y| y == year)?;
        self.rows
            .iter()
            .find(|row| row.month == month)
            .and_then(|row| row.counts[col])
    }

    /// Wide table: a `MONTH` column followed by one column per year.
    pub fn to_dataframe(&self) -> Result<DataFrame, SummaryError> {
        let mut columns = Vec::with_capacity(self.years.len() + 1);
        columns.push(Column::new(MONTH.into(), self.months()));

        for (i, year) in self.years.iter().enumerate() {
            let cells: Vec<Option<u32>> = self.rows.iter().map(|row| row.counts[i]).collect();
            columns.push(Column::new(year.to_string().into(), cells));
        }

        Ok(DataFrame::new(columns)?)
    }
}

/// Summarize already-loaded years, skipping failed slots.
pub fn summarize_loads(loads: Vec<YearLoad>) -> Result<MonthlySummary, SummaryError> {
    let requested = loads.len();
    let tables: Vec<DataFrame> = loads.into_iter().filter_map(YearLoad::into_table).collect();

    if tables.is_empty() {
        return Err(SummaryError::EmptyInput { requested });
    }

    info!(requested, loaded = tables.len(), "summarizing years");
    MonthlySummary::from_tables(&tables)
}

/// Load `years` and return the month-by-year count table.
pub fn summarize_years(loader: &DataLoader, years: &[i32]) -> Result<DataFrame, SummaryError> {
    summarize_loads(load_years(loader, years))?.to_dataframe()
}
