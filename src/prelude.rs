//! Prelude module for common crsgrid types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use crsgrid::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{CrsDefinition, CrsEntry, CrsRegistry, GridLayerOptions, MapOptions},
    crs::{Crs, Projection, Transformation, ZoomScale, EPSG3857, EPSG4326, SIMPLE},
    events::{EventBus, EventManager, MapEvent},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    viewport::{MapView, Viewport},
};

pub use crate::layers::tile::{TileGridController, TileKey, TileRecord, ZoomLevel};

pub use crate::rendering::{ElementId, HeadlessSurface, RenderSurface};

pub use crate::{Error as MapError, Result};

pub use std::sync::Arc;

pub use fxhash::FxHashMap as HashMap;
