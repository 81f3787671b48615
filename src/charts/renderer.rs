//! Static Map Renderer
//! Draws a state's accident locations to a PNG with plotters.
//!
//! Layout, bottom to top:
//! 1. White background and a graticule, one degree apart at state scale
//! 2. Base map outlines overlapping the plotted area (when configured)
//! 3. One small filled dot per accident
//!
//! No text is drawn, so no font backend is needed.

use super::basemap::BaseMap;
use super::map::{GeoBounds, MapError};
use plotters::prelude::*;
use std::fs;
use std::path::Path;

// Colors (RGB)
const BACKGROUND: RGBColor = RGBColor(255, 255, 255);
const GRATICULE: RGBColor = RGBColor(225, 225, 225);
const OUTLINE: RGBColor = RGBColor(90, 90, 90);
pub const POINT_COLOR: RGBColor = RGBColor(200, 30, 30);

const MARGIN: u32 = 10;
const POINT_RADIUS: i32 = 2;
const MAX_GRATICULE_LINES: usize = 180;

fn render_err(e: impl std::fmt::Display) -> MapError {
    MapError::Render(e.to_string())
}

pub struct StaticMapRenderer;

impl StaticMapRenderer {
    /// Render `points` inside `bounds` to the PNG at `path`.
    pub fn render(
        path: &Path,
        size: (u32, u32),
        bounds: &GeoBounds,
        base_map: Option<&BaseMap>,
        points: &[(f64, f64)],
    ) -> Result<(), MapError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(render_err)?;
        }

        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&BACKGROUND).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(MARGIN)
            .build_cartesian_2d(bounds.min_lon..bounds.max_lon, bounds.min_lat..bounds.max_lat)
            .map_err(render_err)?;

        chart
            .draw_series(
                Self::graticule(bounds)
                    .into_iter()
                    .map(|line| PathElement::new(line, GRATICULE.stroke_width(1))),
            )
            .map_err(render_err)?;

        if let Some(base_map) = base_map {
            chart
                .draw_series(
                    base_map
                        .visible_in(bounds)
                        .map(|ring| PathElement::new(ring.clone(), OUTLINE.stroke_width(1))),
                )
                .map_err(render_err)?;
        }

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&point| Circle::new(point, POINT_RADIUS, POINT_COLOR.filled())),
            )
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    }

    /// Meridians and parallels crossing `bounds`, one degree apart unless
    /// that would exceed [`MAX_GRATICULE_LINES`] per axis.
    fn graticule(bounds: &GeoBounds) -> Vec<Vec<(f64, f64)>> {
        let meridians = Self::grid_steps(bounds.min_lon, bounds.max_lon)
            .into_iter()
            .map(|lon| vec![(lon, bounds.min_lat), (lon, bounds.max_lat)]);
        let parallels = Self::grid_steps(bounds.min_lat, bounds.max_lat)
            .into_iter()
            .map(|lat| vec![(bounds.min_lon, lat), (bounds.max_lon, lat)]);

        meridians.chain(parallels).collect()
    }

    fn grid_steps(lo: f64, hi: f64) -> Vec<f64> {
        if !lo.is_finite() || !hi.is_finite() || hi < lo {
            return Vec::new();
        }

        let step = ((hi - lo) / MAX_GRATICULE_LINES as f64).ceil().max(1.0);
        let mut steps = Vec::new();
        let mut value = (lo / step).ceil() * step;
        while value <= hi && steps.len() < MAX_GRATICULE_LINES {
            steps.push(value);
            value += step;
        }
        steps
    }
}
