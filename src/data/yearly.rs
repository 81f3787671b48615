//! Yearly Loader Module
//! Loads one table per requested year and reduces it to `(MONTH, year)`.
//!
//! A year whose file is missing or unreadable does not abort the batch: its
//! slot holds a [`YearLoad::Failed`] and a warning naming the year is logged.

use super::loader::{require_columns, DataLoader, LoaderError};
use super::{MONTH, YEAR};
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Outcome of loading one requested year.
#[derive(Debug)]
pub enum YearLoad {
    Loaded { year: i32, table: DataFrame },
    Failed { year: i32, reason: LoaderError },
}

impl YearLoad {
    pub fn year(&self) -> i32 {
        match self {
            YearLoad::Loaded { year, .. } | YearLoad::Failed { year, .. } => *year,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, YearLoad::Loaded { .. })
    }

    pub fn table(&self) -> Option<&DataFrame> {
        match self {
            YearLoad::Loaded { table, .. } => Some(table),
            YearLoad::Failed { .. } => None,
        }
    }

    pub fn into_table(self) -> Option<DataFrame> {
        match self {
            YearLoad::Loaded { table, .. } => Some(table),
            YearLoad::Failed { .. } => None,
        }
    }
}

/// Add a constant `year` column and keep only `(MONTH, year)`.
pub fn tag_year(df: &DataFrame, year: i32) -> Result<DataFrame, LoaderError> {
    require_columns(df, &[MONTH])?;

    let tagged = df
        .clone()
        .lazy()
        .with_column(lit(year).cast(DataType::Int32).alias(YEAR))
        .select([col(MONTH).cast(DataType::Int32), col(YEAR)])
        .collect()?;

    Ok(tagged)
}

fn load_one(loader: &DataLoader, year: i32) -> YearLoad {
    match loader
        .load_year(year)
        .and_then(|df| tag_year(&df, year))
    {
        Ok(table) => {
            debug!(year, rows = table.height(), "year loaded");
            YearLoad::Loaded { year, table }
        }
        Err(reason) => {
            warn!(year, error = %reason, "invalid year: {year}");
            YearLoad::Failed { year, reason }
        }
    }
}

/// Load every requested year in order. Duplicates are loaded again.
pub fn load_years(loader: &DataLoader, years: &[i32]) -> Vec<YearLoad> {
    years.iter().map(|&year| load_one(loader, year)).collect()
}

/// Same as [`load_years`], reading files on the rayon pool.
/// Results keep the order of `years`.
pub fn load_years_parallel(loader: &DataLoader, years: &[i32]) -> Vec<YearLoad> {
    years
        .par_iter()
        .map(|&year| load_one(loader, year))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn write_plain(dir: &std::path::Path, year: i32, body: &str) {
        // The loader sniffs compression, so a plain CSV under the canonical name works.
        fs::write(dir.join(crate::data::make_filename(year)), body).unwrap();
    }

    #[test]
    fn tag_year_projects_month_and_year() {
        let df = df!(
            "STATE" => [1i64, 2, 2],
            "MONTH" => [1i64, 5, 12],
            "LATITUDE" => [30.0, 31.0, 32.0]
        )
        .unwrap();

        let tagged = tag_year(&df, 2014).unwrap();
        let names: Vec<String> = tagged
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["MONTH", "year"]);
        assert_eq!(tagged.height(), 3);

        let years: Vec<Option<i32>> = tagged
            .column("year")
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(years, vec![Some(2014); 3]);
    }

    #[test]
    fn tag_year_without_month_is_schema_mismatch() {
        let df = df!("STATE" => [1i64]).unwrap();
        assert!(matches!(
            tag_year(&df, 2014),
            Err(LoaderError::SchemaMismatch { column: "MONTH" })
        ));
    }

    #[test]
    fn failed_years_become_placeholders_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_plain(dir.path(), 2013, "STATE,MONTH\n1,1\n1,2\n");
        let loader = DataLoader::new(dir.path());

        let loads = load_years(&loader, &[2013, 1900, 2013]);
        assert_eq!(loads.len(), 3);
        assert_eq!(
            loads.iter().map(YearLoad::year).collect::<Vec<_>>(),
            vec![2013, 1900, 2013]
        );
        assert!(loads[0].is_loaded());
        assert!(matches!(
            &loads[1],
            YearLoad::Failed { year: 1900, reason: LoaderError::FileNotFound(_) }
        ));
        assert_eq!(loads[2].table().map(DataFrame::height), Some(2));
    }

    #[test]
    fn failed_year_is_logged_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        write_plain(dir.path(), 2013, "STATE,MONTH\n1,1\n");
        let loader = DataLoader::new(dir.path());

        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let loads = tracing::subscriber::with_default(subscriber, || {
            load_years(&loader, &[2013, 1900])
        });

        assert_eq!(loads.len(), 2);
        let output = logs.contents();
        assert!(output.contains("WARN"), "no warning in {output:?}");
        assert!(output.contains("1900"), "year missing from {output:?}");
    }

    #[test]
    fn parallel_loading_matches_sequential_order() {
        let dir = tempfile::tempdir().unwrap();
        write_plain(dir.path(), 2014, "MONTH\n4\n");
        write_plain(dir.path(), 2015, "MONTH\n5\n5\n");
        let loader = DataLoader::new(dir.path());
        let years = [2015, 1800, 2014, 2015];

        let sequential: Vec<(i32, Option<usize>)> = load_years(&loader, &years)
            .iter()
            .map(|l| (l.year(), l.table().map(DataFrame::height)))
            .collect();
        let parallel: Vec<(i32, Option<usize>)> = load_years_parallel(&loader, &years)
            .iter()
            .map(|l| (l.year(), l.table().map(DataFrame::height)))
            .collect();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel[1], (1800, None));
    }
}
