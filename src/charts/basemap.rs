//! Base map outlines read from GeoJSON.

use super::map::{GeoBounds, MapError};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Region outlines (state borders, coastlines) drawn under the points.
#[derive(Debug, Clone, Default)]
pub struct BaseMap {
    outlines: Vec<Vec<(f64, f64)>>,
}

impl BaseMap {
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let text = fs::read_to_string(path)
            .map_err(|e| MapError::Boundary(format!("{}: {e}", path.display())))?;
        Self::from_geojson_str(&text)
    }

    /// Collect every line and polygon ring; points are ignored.
    pub fn from_geojson_str(text: &str) -> Result<Self, MapError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| MapError::Boundary(e.to_string()))?;

        let mut outlines = Vec::new();
        match geojson {
            GeoJson::Geometry(geometry) => collect(&geometry, &mut outlines),
            GeoJson::Feature(feature) => {
                if let Some(geometry) = &feature.geometry {
                    collect(geometry, &mut outlines);
                }
            }
            GeoJson::FeatureCollection(collection) => {
                for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
                    collect(geometry, &mut outlines);
                }
            }
        }

        Ok(Self { outlines })
    }

    pub fn outlines(&self) -> &[Vec<(f64, f64)>] {
        &self.outlines
    }

    /// Outlines whose bounding box overlaps `bounds`.
    pub fn visible_in<'a>(
        &'a self,
        bounds: &'a GeoBounds,
    ) -> impl Iterator<Item = &'a Vec<(f64, f64)>> + 'a {
        self.outlines.iter().filter(move |ring| {
            GeoBounds::from_points(ring).is_some_and(|extent| extent.intersects(bounds))
        })
    }
}

fn ring(line: &[Vec<f64>]) -> Vec<(f64, f64)> {
    line.iter()
        .filter(|position| position.len() >= 2)
        .map(|position| (position[0], position[1]))
        .collect()
}

fn collect(geometry: &Geometry, out: &mut Vec<Vec<(f64, f64)>>) {
    match &geometry.value {
        Value::LineString(line) => out.push(ring(line)),
        Value::MultiLineString(lines) => out.extend(lines.iter().map(|l| ring(l))),
        Value::Polygon(rings) => out.extend(rings.iter().map(|r| ring(r))),
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.extend(rings.iter().map(|r| ring(r)));
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect(geometry, out);
            }
        }
        _ => {}
    }
}
