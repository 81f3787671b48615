//! Config Module
//! Reads the optional TOML file: data directory, parallel loading and map output.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::charts::{BaseMap, MapOptions};
use crate::data::DataLoader;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `accident_<year>.csv.bz2` files.
    pub data_dir: PathBuf,
    /// Load multi-year requests on the rayon pool.
    pub parallel: bool,
    pub map: MapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub output: PathBuf,
    // GeoJSON outlines drawn under the points
    pub boundaries: Option<PathBuf>,
    pub padding_deg: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            parallel: false,
            map: MapConfig::default(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        let options = MapOptions::default();
        Self {
            width: options.width,
            height: options.height,
            output: options.output,
            boundaries: None,
            padding_deg: options.padding_deg,
        }
    }
}

impl Config {
    pub fn loader(&self) -> DataLoader {
        DataLoader::new(&self.data_dir)
    }
}

impl MapConfig {
    /// Resolve into render options, reading the base map if one is set.
    pub fn options(&self) -> Result<MapOptions> {
        let base_map = match &self.boundaries {
            Some(path) => Some(
                BaseMap::load(path)
                    .with_context(|| format!("Failed to load base map {}", path.display()))?,
            ),
            None => None,
        };

        Ok(MapOptions {
            width: self.width,
            height: self.height,
            padding_deg: self.padding_deg,
            output: self.output.clone(),
            base_map,
        })
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    let config = toml::from_str(&data).context("Failed to parse config")?;
    Ok(config)
}
