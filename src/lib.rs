//! # crsgrid
//!
//! Leaflet-style tiled grid layers over a map that knows more than one
//! coordinate reference system.
//!
//! The map carries a default CRS plus a registry of named CRSs, each enabled
//! from a start zoom on. A grid layer picks one of them; its tile zoom, tile
//! range and level transforms are then computed in that CRS, so tiles served
//! in e.g. a polar projection line up with the map at every zoom.
//!
//! ```no_run
//! use crsgrid::prelude::*;
//!
//! # fn main() -> crsgrid::Result<()> {
//! let registry = CrsRegistry::new().with("plate", EPSG4326.clone(), 2);
//! let options = MapOptions::default().with_custom_crs(registry);
//!
//! let mut events = EventManager::new();
//! let view = Viewport::with_view(
//!     options,
//!     Point::new(800.0, 600.0),
//!     LatLng::new(48.2, 16.37),
//!     4.0,
//!     &mut events,
//! )?;
//!
//! let mut grid = TileGridController::new(
//!     GridLayerOptions::default().with_custom_crs("plate"),
//!     HeadlessSurface::new(),
//! );
//! grid.on_add(&view)?;
//! assert_eq!(grid.tile_zoom(), Some(2));
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod layers;
pub mod prelude;
pub mod rendering;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::Bounds,
    config::{CrsRegistry, GridLayerOptions, MapOptions},
    crs::Crs,
    events::{EventBus, EventManager, MapEvent},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    viewport::{MapView, Viewport},
};

pub use layers::tile::TileGridController;

pub use rendering::{HeadlessSurface, RenderSurface};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),

    #[error("Attempted to load an infinite number of tiles")]
    InfiniteTileRange,

    #[error("Map view has not been set yet")]
    NotLoaded,

    #[error("Layer is not attached to a map")]
    NotAttached,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Error = MapError;
