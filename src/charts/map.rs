//! State Map Module
//! Loads one year, keeps a single state's accidents, masks sentinel
//! coordinates and renders the remaining points on a base map.

use super::basemap::BaseMap;
use super::renderer::StaticMapRenderer;
use crate::data::{
    parse_integer, require_columns, DataLoader, LoaderError, LATITUDE, LATITUDE_SENTINEL, LONGITUDE,
    LONGITUDE_SENTINEL, STATE,
};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Smallest span, in degrees, a rendered axis may have.
const MIN_SPAN_DEG: f64 = 0.1;

#[derive(Error, Debug)]
pub enum MapError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("invalid STATE number: {0}")]
    InvalidState(i64),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("failed to render map: {0}")]
    Render(String),
    #[error("failed to read base map: {0}")]
    Boundary(String),
}

/// Longitude/latitude box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// `None` for an empty slice.
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        let (&(lon, lat), rest) = points.split_first()?;
        let mut bounds = Self {
            min_lon: lon,
            max_lon: lon,
            min_lat: lat,
            max_lat: lat,
        };
        for &(lon, lat) in rest {
            bounds.min_lon = bounds.min_lon.min(lon);
            bounds.max_lon = bounds.max_lon.max(lon);
            bounds.min_lat = bounds.min_lat.min(lat);
            bounds.max_lat = bounds.max_lat.max(lat);
        }
        Some(bounds)
    }

    /// Grow by `degrees` on every side, keeping each span at least [`MIN_SPAN_DEG`].
    pub fn padded(self, degrees: f64) -> Self {
        fn widen(lo: f64, hi: f64, pad: f64) -> (f64, f64) {
            let (lo, hi) = (lo - pad, hi + pad);
            if hi - lo >= MIN_SPAN_DEG {
                (lo, hi)
            } else {
                let mid = (lo + hi) / 2.0;
                (mid - MIN_SPAN_DEG / 2.0, mid + MIN_SPAN_DEG / 2.0)
            }
        }

        let pad = degrees.max(0.0);
        let (min_lon, max_lon) = widen(self.min_lon, self.max_lon, pad);
        let (min_lat, max_lat) = widen(self.min_lat, self.max_lat, pad);
        Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

/// How and where the map is drawn.
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub width: u32,
    pub height: u32,
    pub padding_deg: f64,
    pub output: PathBuf,
    pub base_map: Option<BaseMap>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            padding_deg: 0.5,
            output: PathBuf::from("accident_map.png"),
            base_map: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    /// The PNG was written; `skipped` rows had a missing coordinate.
    Rendered {
        path: PathBuf,
        points: usize,
        skipped: usize,
    },
    /// The state has no accidents that year.
    NothingToPlot,
    /// Every matching row had a sentinel coordinate.
    NoCoordinates { rows: usize },
}

/// Distinct state codes present in a year's table.
pub fn states_in(df: &DataFrame) -> Result<BTreeSet<i64>, MapError> {
    require_columns(df, &[STATE])?;
    let states = df.column(STATE)?.cast(&DataType::Int64)?;
    Ok(states.i64()?.into_iter().flatten().collect())
}

fn mask_above(column: &Column, limit: f64) -> Result<Column, PolarsError> {
    let values = column.cast(&DataType::Float64)?;
    let masked: Vec<Option<f64>> = values
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite() && *x <= limit))
        .collect();
    Ok(Column::new(column.name().clone(), masked))
}

/// New table with `LONGITUD > 900` and `LATITUDE > 90` replaced by null.
/// NaN and infinite values are nulled as well.
///
/// Applying it twice gives the same table as applying it once.
pub fn sanitize_coordinates(df: &DataFrame) -> Result<DataFrame, MapError> {
    require_columns(df, &[LONGITUDE, LATITUDE])?;

    let longitude = mask_above(df.column(LONGITUDE)?, LONGITUDE_SENTINEL)?;
    let latitude = mask_above(df.column(LATITUDE)?, LATITUDE_SENTINEL)?;

    let mut sanitized = df.clone();
    sanitized.with_column(longitude)?;
    sanitized.with_column(latitude)?;
    Ok(sanitized)
}

/// `(longitude, latitude)` pairs where neither coordinate is missing.
pub fn plottable_points(sanitized: &DataFrame) -> Result<Vec<(f64, f64)>, MapError> {
    require_columns(sanitized, &[LONGITUDE, LATITUDE])?;
    let lon = sanitized.column(LONGITUDE)?.cast(&DataType::Float64)?;
    let lat = sanitized.column(LATITUDE)?.cast(&DataType::Float64)?;

    Ok(lon
        .f64()?
        .into_iter()
        .zip(lat.f64()?.into_iter())
        .filter_map(|(lon, lat)| Some((lon?, lat?)))
        .collect())
}

/// Rows of `df` whose state is `state`.
pub fn filter_state(df: &DataFrame, state: i64) -> Result<DataFrame, MapError> {
    require_columns(df, &[STATE])?;
    let filtered = df
        .clone()
        .lazy()
        .filter(col(STATE).cast(DataType::Int64).eq(lit(state)))
        .collect()?;
    Ok(filtered)
}

/// Plot the accidents of `state` in `year`.
///
/// A missing year file is an error here; unlike the yearly loader it is not
/// downgraded to a warning.
pub fn map_state(
    loader: &DataLoader,
    state: i64,
    year: i32,
    options: &MapOptions,
) -> Result<MapOutcome, MapError> {
    let data = loader.load_year(year)?;
    map_loaded(&data, state, year, options)
}

/// Like [`map_state`] for a state id still in text form. The year file is
/// loaded before the id is coerced, so a missing file wins over a bad id.
pub fn map_state_input(
    loader: &DataLoader,
    state: &str,
    year: i32,
    options: &MapOptions,
) -> Result<MapOutcome, MapError> {
    let data = loader.load_year(year)?;
    let state = parse_integer("state", state)?;
    map_loaded(&data, state, year, options)
}

fn map_loaded(
    data: &DataFrame,
    state: i64,
    year: i32,
    options: &MapOptions,
) -> Result<MapOutcome, MapError> {
    if !states_in(data)?.contains(&state) {
        return Err(MapError::InvalidState(state));
    }

    let rows = filter_state(data, state)?;
    plot_rows(&rows, state, year, options)
}

/// Render the rows already filtered to one state.
fn plot_rows(
    rows: &DataFrame,
    state: i64,
    year: i32,
    options: &MapOptions,
) -> Result<MapOutcome, MapError> {
    // Unreachable from map_loaded, which rejects states absent from the year.
    if rows.height() == 0 {
        info!(state, year, "no accidents to plot");
        return Ok(MapOutcome::NothingToPlot);
    }

    let sanitized = sanitize_coordinates(rows)?;
    let points = plottable_points(&sanitized)?;
    let skipped = rows.height() - points.len();

    let Some(bounds) = GeoBounds::from_points(&points) else {
        info!(state, year, rows = rows.height(), "no valid coordinates to plot");
        return Ok(MapOutcome::NoCoordinates {
            rows: rows.height(),
        });
    };
    let bounds = bounds.padded(options.padding_deg);

    StaticMapRenderer::render(
        &options.output,
        (options.width, options.height),
        &bounds,
        options.base_map.as_ref(),
        &points,
    )?;

    info!(
        state,
        year,
        points = points.len(),
        skipped,
        path = %options.output.display(),
        "map rendered"
    );
    Ok(MapOutcome::Rendered {
        path: options.output.clone(),
        points: points.len(),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "STATE" => [1i64, 1, 1, 4],
            "MONTH" => [1i64, 2, 3, 4],
            "LONGITUD" => [-86.5, 999.9999, -87.1, -112.0],
            "LATITUDE" => [32.1, 33.0, 99.9999, 33.4]
        )
        .unwrap()
    }

    #[test]
    fn sentinels_become_null() {
        let sanitized = sanitize_coordinates(&sample()).unwrap();
        assert_eq!(sanitized.column("LONGITUD").unwrap().null_count(), 1);
        assert_eq!(sanitized.column("LATITUDE").unwrap().null_count(), 1);
        assert_eq!(sanitized.height(), 4);
        assert_eq!(sanitized.width(), 4);
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let once = sanitize_coordinates(&sample()).unwrap();
        let twice = sanitize_coordinates(&once).unwrap();
        assert!(once.equals_missing(&twice));
        assert_eq!(
            plottable_points(&once).unwrap(),
            plottable_points(&twice).unwrap()
        );
    }

    #[test]
    fn input_table_is_untouched() {
        let raw = sample();
        let _ = sanitize_coordinates(&raw).unwrap();
        assert_eq!(raw.column("LONGITUD").unwrap().null_count(), 0);
    }

    #[test]
    fn points_need_both_coordinates() {
        let sanitized = sanitize_coordinates(&sample()).unwrap();
        assert_eq!(
            plottable_points(&sanitized).unwrap(),
            vec![(-86.5, 32.1), (-112.0, 33.4)]
        );
    }

    #[test]
    fn state_filter_and_listing() {
        let df = sample();
        assert_eq!(states_in(&df).unwrap(), BTreeSet::from([1, 4]));
        assert_eq!(filter_state(&df, 1).unwrap().height(), 3);
        assert_eq!(filter_state(&df, 4).unwrap().height(), 1);
        assert_eq!(filter_state(&df, 9).unwrap().height(), 0);
    }

    #[test]
    fn non_finite_coordinates_become_null() {
        let df = df!(
            "STATE" => [1i64, 1, 1],
            "LONGITUD" => [f64::NEG_INFINITY, f64::NAN, -86.0],
            "LATITUDE" => [32.0, 33.0, f64::INFINITY]
        )
        .unwrap();

        let sanitized = sanitize_coordinates(&df).unwrap();
        assert_eq!(sanitized.column("LONGITUD").unwrap().null_count(), 2);
        assert_eq!(sanitized.column("LATITUDE").unwrap().null_count(), 1);
        assert!(plottable_points(&sanitized).unwrap().is_empty());
    }

    #[test]
    fn empty_state_rows_are_nothing_to_plot() {
        let dir = tempfile::tempdir().unwrap();
        let options = MapOptions {
            output: dir.path().join("map.png"),
            ..MapOptions::default()
        };

        let rows = filter_state(&sample(), 9).unwrap();
        assert_eq!(
            plot_rows(&rows, 9, 2013, &options).unwrap(),
            MapOutcome::NothingToPlot
        );
        assert!(!options.output.exists());
    }

    #[test]
    fn far_off_longitude_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let options = MapOptions {
            width: 200,
            height: 150,
            output: dir.path().join("far.png"),
            ..MapOptions::default()
        };
        let rows = df!(
            "STATE" => [1i64, 1],
            "LONGITUD" => [-1e20, -86.0],
            "LATITUDE" => [32.0, 33.0]
        )
        .unwrap();

        let outcome = plot_rows(&rows, 1, 2013, &options).unwrap();
        assert!(matches!(outcome, MapOutcome::Rendered { points: 2, skipped: 0, .. }));
        assert!(options.output.exists());
    }

    #[test]
    fn sanitize_without_coordinates_is_schema_mismatch() {
        let df = df!("STATE" => [1i64]).unwrap();
        assert!(matches!(
            sanitize_coordinates(&df),
            Err(MapError::Loader(LoaderError::SchemaMismatch { column: "LONGITUD" }))
        ));
    }

    #[test]
    fn bounds_cover_points_and_pad() {
        let bounds = GeoBounds::from_points(&[(-86.0, 32.0), (-85.0, 34.0)]).unwrap();
        assert_eq!(
            bounds,
            GeoBounds {
                min_lon: -86.0,
                max_lon: -85.0,
                min_lat: 32.0,
                max_lat: 34.0
            }
        );
        let padded = bounds.padded(0.5);
        assert_eq!(padded.min_lon, -86.5);
        assert_eq!(padded.max_lat, 34.5);
        assert!(GeoBounds::from_points(&[]).is_none());
    }

    #[test]
    fn single_point_bounds_get_a_minimum_span() {
        let bounds = GeoBounds::from_points(&[(-86.0, 32.0)]).unwrap().padded(0.0);
        assert!(bounds.max_lon - bounds.min_lon >= MIN_SPAN_DEG - 1e-12);
        assert!(bounds.contains(-86.0, 32.0));
    }
}
