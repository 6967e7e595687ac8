//! Configuration for maps and grid layers
//!
//! A map carries a default CRS and a registry of additional named CRSs, each
//! with the global zoom at which its tiling starts. Grid layers pick one of
//! those names (or none, for the default CRS) in their options.
//!
//! Both can be built in code or loaded from JSON.

use crate::{
    core::{
        bounds::Bounds,
        constants::{DEFAULT_KEEP_BUFFER, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, TILE_SIZE},
        crs::{Crs, ProjectionKind, EPSG3857},
        geo::{LatLngBounds, Point},
    },
    prelude::{Arc, HashMap},
    MapError, Result,
};
use serde::{Deserialize, Serialize};

/// A registered CRS and the global zoom at which its tiles begin
#[derive(Debug, Clone)]
pub struct CrsEntry {
    pub crs: Arc<Crs>,
    pub start_zoom: i32,
}

impl CrsEntry {
    pub fn new(crs: Arc<Crs>, start_zoom: i32) -> Self {
        Self { crs, start_zoom }
    }

    /// Global zoom expressed in this CRS's own zoom numbering
    pub fn local_zoom(&self, zoom: f64) -> f64 {
        zoom - self.start_zoom as f64
    }
}

/// Named CRSs available on a map alongside its default CRS
#[derive(Debug, Clone, Default)]
pub struct CrsRegistry {
    entries: HashMap<String, CrsEntry>,
}

impl CrsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a CRS under `name`
    pub fn register(&mut self, name: impl Into<String>, crs: Arc<Crs>, start_zoom: i32) {
        self.entries
            .insert(name.into(), CrsEntry::new(crs, start_zoom));
    }

    /// Builder-style [`CrsRegistry::register`]
    pub fn with(mut self, name: impl Into<String>, crs: Arc<Crs>, start_zoom: i32) -> Self {
        self.register(name, crs, start_zoom);
        self
    }

    /// Looks up a CRS by name. Unknown names are a configuration error.
    pub fn get(&self, name: &str) -> Result<&CrsEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| MapError::UnknownCrs(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CrsEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a JSON object of `name -> { "crs": <definition>, "start_zoom": n }`
    pub fn from_json(json: &str) -> Result<Self> {
        let configs: HashMap<String, CrsEntryConfig> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for (name, config) in configs {
            let crs = config.crs.build()?;
            log::debug!(
                "registered CRS {} ({}) starting at zoom {}",
                name,
                crs.code(),
                config.start_zoom
            );
            registry.register(name, Arc::new(crs), config.start_zoom);
        }
        Ok(registry)
    }
}

/// Serialized form of a registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrsEntryConfig {
    pub crs: CrsDefinition,
    #[serde(default)]
    pub start_zoom: i32,
}

/// Serialized description of a CRS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrsDefinition {
    #[serde(rename = "EPSG:3857")]
    Epsg3857,
    #[serde(rename = "EPSG:4326")]
    Epsg4326,
    Simple,
    Custom {
        code: String,
        projection: ProjectionKind,
        resolutions: Vec<f64>,
        /// Projected coordinate of the top-left corner of tile (0, 0)
        origin: [f64; 2],
        /// Projected extent as `[min_x, min_y, max_x, max_y]`
        #[serde(default)]
        bounds: Option<[f64; 4]>,
        #[serde(default)]
        wrap_lng: Option<(f64, f64)>,
        #[serde(default)]
        wrap_lat: Option<(f64, f64)>,
    },
}

impl CrsDefinition {
    pub fn build(&self) -> Result<Crs> {
        Ok(match self {
            CrsDefinition::Epsg3857 => Crs::epsg3857(),
            CrsDefinition::Epsg4326 => Crs::epsg4326(),
            CrsDefinition::Simple => Crs::simple(),
            CrsDefinition::Custom {
                code,
                projection,
                resolutions,
                origin,
                bounds,
                wrap_lng,
                wrap_lat,
            } => Crs::custom(
                code.clone(),
                projection.build(),
                resolutions.clone(),
                Point::new(origin[0], origin[1]),
                bounds.map(|[min_x, min_y, max_x, max_y]| {
                    Bounds::from_coords(min_x, min_y, max_x, max_y)
                }),
            )?
            .with_wrap_lng(*wrap_lng)
            .with_wrap_lat(*wrap_lat),
        })
    }
}

/// Map-wide options relevant to projection
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// CRS used when no name is given
    pub crs: Arc<Crs>,
    pub custom_crs: CrsRegistry,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            crs: EPSG3857.clone(),
            custom_crs: CrsRegistry::default(),
            min_zoom: None,
            max_zoom: None,
        }
    }
}

impl MapOptions {
    pub fn with_crs(mut self, crs: Arc<Crs>) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_custom_crs(mut self, registry: CrsRegistry) -> Self {
        self.custom_crs = registry;
        self
    }
}

/// Options of a tiled grid layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayerOptions {
    pub tile_size: u32,
    /// Tiles are only shown while the rounded map zoom lies in this range
    pub min_zoom: Option<i32>,
    pub max_zoom: Option<i32>,
    /// Tile zooms outside the native range are clamped to it
    pub min_native_zoom: Option<i32>,
    pub max_native_zoom: Option<i32>,
    pub keep_buffer: u32,
    pub update_when_zooming: bool,
    pub no_wrap: bool,
    /// Only tiles overlapping these bounds are created
    pub bounds: Option<LatLngBounds>,
    /// Name of the map CRS this layer is tiled in; the map's default CRS when None
    pub custom_crs: Option<String>,
}

impl Default for GridLayerOptions {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            min_zoom: Some(DEFAULT_MIN_ZOOM),
            max_zoom: Some(DEFAULT_MAX_ZOOM),
            min_native_zoom: None,
            max_native_zoom: None,
            keep_buffer: DEFAULT_KEEP_BUFFER,
            update_when_zooming: true,
            no_wrap: false,
            bounds: None,
            custom_crs: None,
        }
    }
}

impl GridLayerOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_custom_crs(mut self, name: impl Into<String>) -> Self {
        self.custom_crs = Some(name.into());
        self
    }

    pub fn tile_size_point(&self) -> Point {
        Point::new(self.tile_size as f64, self.tile_size as f64)
    }
}
