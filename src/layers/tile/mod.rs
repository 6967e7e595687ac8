//! Tiled grid layer
//!
//! A [`TileGridController`] works out which tiles the viewport needs at the
//! current tile zoom, keeps one [`ZoomLevel`] container per tile zoom and
//! positions those containers while the map pans and zooms. A layer can be
//! tiled in a CRS of its own: the map registers it under a name together with
//! the global zoom the CRS starts at, and the layer refers to it by that name.

mod grid;
mod levels;
pub mod types;

pub use types::{TileKey, TileRecord, ZoomLevel};

use crate::{
    core::{
        bounds::Bounds,
        config::GridLayerOptions,
        events::{EventBus, EventManager},
        geo::{Point, TileCoord},
    },
    prelude::HashMap,
    rendering::RenderSurface,
};
use std::collections::BTreeMap;

/// Tile bookkeeping and level management of one grid layer
pub struct TileGridController<S: RenderSurface, E: EventBus = EventManager> {
    pub(crate) options: GridLayerOptions,
    pub(crate) surface: S,
    pub(crate) events: E,
    /// Root container, present while the layer is on a map
    pub(crate) container: Option<S::Element>,
    pub(crate) tiles: HashMap<TileKey, TileRecord<S::Element>>,
    pub(crate) levels: BTreeMap<i32, ZoomLevel<S::Element>>,
    /// Key of the level new tiles go into
    pub(crate) level: Option<i32>,
    /// None while the map zoom is outside the layer's range or below its CRS start zoom
    pub(crate) tile_zoom: Option<i32>,
    pub(crate) tile_size: Point,
    /// Tile index range covering the world at the tile zoom; None for infinite CRSs
    pub(crate) global_tile_range: Option<Bounds>,
    pub(crate) wrap_x: Option<(i64, i64)>,
    pub(crate) wrap_y: Option<(i64, i64)>,
    pub(crate) loading: bool,
    pub(crate) no_prune: bool,
}

impl<S: RenderSurface> TileGridController<S, EventManager> {
    pub fn new(options: GridLayerOptions, surface: S) -> Self {
        Self::with_events(options, surface, EventManager::new())
    }
}

impl<S: RenderSurface, E: EventBus> TileGridController<S, E> {
    pub fn with_events(options: GridLayerOptions, surface: S, events: E) -> Self {
        let tile_size = options.tile_size_point();
        Self {
            options,
            surface,
            events,
            container: None,
            tiles: HashMap::default(),
            levels: BTreeMap::new(),
            level: None,
            tile_zoom: None,
            tile_size,
            global_tile_range: None,
            wrap_x: None,
            wrap_y: None,
            loading: false,
            no_prune: false,
        }
    }

    pub fn options(&self) -> &GridLayerOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn container(&self) -> Option<&S::Element> {
        self.container.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.container.is_some()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileRecord<S::Element>> {
        self.tiles.values()
    }

    pub fn tile(&self, coords: &TileCoord) -> Option<&TileRecord<S::Element>> {
        self.tiles.get(&TileKey::from(coords))
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Coordinates of all resident tiles, sorted by zoom, row and column
    pub fn tile_coords(&self) -> Vec<TileCoord> {
        let mut coords: Vec<TileCoord> = self.tiles.values().map(|tile| tile.coords).collect();
        coords.sort_by_key(|c| (c.z, c.y, c.x));
        coords
    }

    pub fn levels(&self) -> &BTreeMap<i32, ZoomLevel<S::Element>> {
        &self.levels
    }

    /// Level new tiles are added to
    pub fn current_level(&self) -> Option<&ZoomLevel<S::Element>> {
        self.level.and_then(|zoom| self.levels.get(&zoom))
    }

    pub fn tile_zoom(&self) -> Option<i32> {
        self.tile_zoom
    }

    pub fn tile_size(&self) -> Point {
        self.tile_size
    }

    pub fn global_tile_range(&self) -> Option<&Bounds> {
        self.global_tile_range.as_ref()
    }

    pub fn wrap_x(&self) -> Option<(i64, i64)> {
        self.wrap_x
    }

    pub fn wrap_y(&self) -> Option<(i64, i64)> {
        self.wrap_y
    }

    /// Whether a batch of tiles is still loading
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn crs_name(&self) -> Option<String> {
        self.options.custom_crs.clone()
    }
}
