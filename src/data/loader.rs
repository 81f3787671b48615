//! FARS File Loader Module
//! Builds yearly file names and loads (optionally bzip2-compressed) CSV files using Polars.

use bzip2::read::MultiBzDecoder;
use polars::prelude::*;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Every bzip2 stream starts with these bytes.
const BZIP2_MAGIC: &[u8] = b"BZh";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("{what} must be an integer, got {value:?}")]
    TypeMismatch { what: &'static str, value: String },
    #[error("file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to load CSV: {0}")]
    Polars(#[from] PolarsError),
    #[error("column '{column}' not found in table")]
    SchemaMismatch { column: &'static str },
}

/// Canonical data file name for a reporting year.
pub fn make_filename(year: i32) -> String {
    format!("accident_{year}.csv.bz2")
}

/// Coerce user input to a whole number.
///
/// Accepts plain integers and integral decimals such as `"2013.0"`.
pub fn parse_integer(what: &'static str, raw: &str) -> Result<i64, LoaderError> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
            Ok(value as i64)
        }
        _ => Err(LoaderError::TypeMismatch {
            what,
            value: raw.to_string(),
        }),
    }
}

pub fn parse_year(raw: &str) -> Result<i32, LoaderError> {
    let value = parse_integer("year", raw)?;
    i32::try_from(value).map_err(|_| LoaderError::TypeMismatch {
        what: "year",
        value: raw.to_string(),
    })
}

/// Load a single tabular file into a DataFrame, unchanged in content.
pub fn load_table(path: impl AsRef<Path>) -> Result<DataFrame, LoaderError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoaderError::FileNotFound(path.to_path_buf()));
    }

    let io_err = |source: std::io::Error| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    };
    let raw = fs::read(path).map_err(io_err)?;

    let bytes = if raw.starts_with(BZIP2_MAGIC) {
        let mut out = Vec::with_capacity(raw.len() * 8);
        MultiBzDecoder::new(raw.as_slice())
            .read_to_end(&mut out)
            .map_err(io_err)?;
        out
    } else {
        raw
    };

    // Malformed rows become nulls instead of aborting the read
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .with_ignore_errors(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    debug!(path = %path.display(), rows = df.height(), "loaded table");
    Ok(df)
}

/// Fail with `SchemaMismatch` on the first column the frame lacks.
pub fn require_columns(df: &DataFrame, columns: &[&'static str]) -> Result<(), LoaderError> {
    match columns
        .iter()
        .find(|name| df.get_column_index(name).is_none())
    {
        Some(&column) => Err(LoaderError::SchemaMismatch { column }),
        None => Ok(()),
    }
}

/// Resolves yearly files against a data directory.
#[derive(Debug, Clone)]
pub struct DataLoader {
    data_dir: PathBuf,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the file holding `year`.
    pub fn year_path(&self, year: i32) -> PathBuf {
        self.data_dir.join(make_filename(year))
    }

    /// Load the complete table for one year.
    pub fn load_year(&self, year: i32) -> Result<DataFrame, LoaderError> {
        load_table(self.year_path(year))
    }
}
