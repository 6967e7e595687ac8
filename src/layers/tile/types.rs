//! Core data types for the tile grid

use crate::{
    core::geo::{Point, TileCoord},
    prelude::HashMap,
    MapError, Result,
};
use instant::Instant;
use std::{fmt, time::Duration};

/// Canonical `x:y:z` key of a tile record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey(String);

impl TileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the key back into a tile coordinate
    pub fn coords(&self) -> Option<TileCoord> {
        let mut parts = self.0.split(':');
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(TileCoord::new(x, y, z))
    }
}

impl From<&TileCoord> for TileKey {
    fn from(coords: &TileCoord) -> Self {
        Self(format!("{}:{}:{}", coords.x, coords.y, coords.z))
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tile resident in the grid
#[derive(Debug, Clone)]
pub struct TileRecord<E> {
    pub el: E,
    pub coords: TileCoord,
    /// Inside the keep-buffer range at the current tile zoom
    pub current: bool,
    /// Survives the pruning pass in progress
    pub retain: bool,
    pub loaded: bool,
    /// Loaded and shown
    pub active: bool,
    pub error: Option<String>,
    pub requested_at: Instant,
    pub loaded_at: Option<Instant>,
}

impl<E> TileRecord<E> {
    pub fn new(el: E, coords: TileCoord) -> Self {
        Self {
            el,
            coords,
            current: true,
            retain: false,
            loaded: false,
            active: false,
            error: None,
            requested_at: Instant::now(),
            loaded_at: None,
        }
    }

    pub fn mark_loaded(&mut self, error: Option<String>) {
        self.loaded = true;
        self.active = true;
        self.error = error;
        self.loaded_at = Some(Instant::now());
    }

    /// Time between creating the tile and its load report
    pub fn load_time(&self) -> Option<Duration> {
        self.loaded_at
            .map(|loaded_at| loaded_at.duration_since(self.requested_at))
    }
}

/// One visual layer per tile zoom
#[derive(Debug, Clone)]
pub struct ZoomLevel<E> {
    pub el: E,
    /// Tile zoom, in the numbering of the layer's CRS
    pub zoom: i32,
    /// Map zoom this level corresponds to
    pub global_zoom: i32,
    /// Pixel origin in the map's default CRS
    pub origin: Point,
    /// Pixel origin per registered CRS
    pub crs_origins: HashMap<String, Point>,
    pub z_index: i32,
    /// Last transform applied to the container
    pub translate: Point,
    pub scale: f64,
}

impl<E> ZoomLevel<E> {
    /// Origin tiles of `crs` are positioned against
    pub fn origin_for(&self, crs: Option<&str>) -> Result<Point> {
        match crs {
            None => Ok(self.origin),
            Some(name) => self
                .crs_origins
                .get(name)
                .copied()
                .ok_or(MapError::NotLoaded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format_and_parse() {
        let coords = TileCoord::new(-3, 7, 2);
        let key = TileKey::from(&coords);
        assert_eq!(key.as_str(), "-3:7:2");
        assert_eq!(key.coords(), Some(coords));
        assert_eq!(TileKey("1:2".to_string()).coords(), None);
        assert_eq!(TileKey("1:2:3:4".to_string()).coords(), None);
    }

    #[test]
    fn test_record_lifecycle() {
        let mut tile = TileRecord::new((), TileCoord::new(0, 0, 0));
        assert!(tile.current);
        assert!(!tile.loaded && !tile.active);
        assert_eq!(tile.load_time(), None);
        tile.mark_loaded(Some("404".to_string()));
        assert!(tile.loaded && tile.active);
        assert!(tile.load_time().is_some());
        assert_eq!(tile.error.as_deref(), Some("404"));
    }

    #[test]
    fn test_level_origin_for() {
        let mut level = ZoomLevel {
            el: (),
            zoom: 1,
            global_zoom: 3,
            origin: Point::new(1.0, 2.0),
            crs_origins: HashMap::default(),
            z_index: 18,
            translate: Point::default(),
            scale: 1.0,
        };
        level.crs_origins.insert("polar".to_string(), Point::new(5.0, 5.0));
        assert_eq!(level.origin_for(None).unwrap(), Point::new(1.0, 2.0));
        assert_eq!(level.origin_for(Some("polar")).unwrap(), Point::new(5.0, 5.0));
        assert!(level.origin_for(Some("other")).is_err());
    }
}
