//! Tile selection, load bookkeeping and pruning
//!
//! Follows Leaflet's grid layer: the visible pixel bounds at the tile zoom
//! give a tile range, missing tiles in that range are created closest to the
//! center first, and tiles that drift outside the keep buffer are pruned once
//! a loaded replacement covers their area.

use super::{TileGridController, TileKey, TileRecord};
use crate::{
    core::{
        bounds::Bounds,
        constants::{CHILD_RETAIN_DEPTH, GRID_CONTAINER_CLASS, PARENT_RETAIN_DEPTH},
        events::{EventBus, MapEvent},
        geo::{LatLng, LatLngBounds, Point, TileCoord},
        viewport::MapView,
    },
    rendering::RenderSurface,
    MapError, Result,
};

impl<S: RenderSurface, E: EventBus> TileGridController<S, E> {
    /// Attaches the layer: creates the root container and draws the current view
    pub fn on_add(&mut self, view: &impl MapView) -> Result<()> {
        if self.container.is_none() {
            let container = self
                .surface
                .create_container("div", GRID_CONTAINER_CLASS, None);
            self.container = Some(container);
        }
        self.tile_zoom = None;
        log::debug!("grid layer added (crs: {:?})", self.options.custom_crs);
        self.reset_view(view, false)
    }

    /// Detaches the layer, dropping every tile and level
    pub fn on_remove(&mut self) {
        self.remove_all_tiles();
        for (_, level) in std::mem::take(&mut self.levels) {
            self.surface.remove_element(&level.el);
        }
        if let Some(container) = self.container.take() {
            self.surface.remove_element(&container);
        }
        self.level = None;
        self.tile_zoom = None;
        self.global_tile_range = None;
        self.wrap_x = None;
        self.wrap_y = None;
        self.loading = false;
        log::debug!("grid layer removed");
    }

    /// Redraws for the map's current view; `animating` skips pruning and
    /// only refreshes tiles when the tile zoom changes
    pub fn reset_view(&mut self, view: &impl MapView, animating: bool) -> Result<()> {
        self.set_view(view, view.center(), view.zoom(), animating, animating)
    }

    /// Brings tiles and levels in line with a view at `center`/`zoom`.
    ///
    /// Tiles are refreshed unless `no_update` is set; a tile zoom change
    /// still refreshes them when `update_when_zooming` is on. Level
    /// transforms are always reapplied.
    pub fn set_view(
        &mut self,
        view: &impl MapView,
        center: LatLng,
        zoom: f64,
        no_prune: bool,
        no_update: bool,
    ) -> Result<()> {
        if self.container.is_none() {
            return Err(MapError::NotAttached);
        }

        let tile_zoom = self.compute_tile_zoom(view, zoom)?;
        let tile_zoom_changed = tile_zoom != self.tile_zoom;

        if !no_update || (self.options.update_when_zooming && tile_zoom_changed) {
            if tile_zoom_changed {
                log::debug!("tile zoom {:?} -> {:?}", self.tile_zoom, tile_zoom);
            }
            self.tile_zoom = tile_zoom;
            self.abort_loading();
            self.update_levels(view)?;
            self.reset_grid(view)?;

            if tile_zoom.is_some() {
                self.update(view, Some(center))?;
            }
            if !no_prune {
                self.prune_tiles(view);
            }
            self.no_prune = no_prune;
        }

        self.set_zoom_transforms(view, &center, zoom)
    }

    /// Handler for the end of a pan
    pub fn on_move_end(&mut self, view: &impl MapView) -> Result<()> {
        if self.container.is_none() || view.is_animating_zoom() {
            return Ok(());
        }
        self.update(view, None)?;
        self.prune_tiles(view);
        Ok(())
    }

    /// Handler for each frame of a zoom animation heading to `center`/`zoom`
    pub fn animate_zoom(
        &mut self,
        view: &impl MapView,
        center: LatLng,
        zoom: f64,
        no_update: bool,
    ) -> Result<()> {
        self.set_view(view, center, zoom, true, no_update)
    }

    /// Drops every tile and loads the current view again
    pub fn redraw(&mut self, view: &impl MapView) -> Result<()> {
        if self.container.is_none() {
            return Ok(());
        }
        self.remove_all_tiles();
        let tile_zoom = self.compute_tile_zoom(view, view.zoom())?;
        if tile_zoom != self.tile_zoom {
            self.tile_zoom = tile_zoom;
            self.update_levels(view)?;
            self.reset_grid(view)?;
        }
        self.update(view, None)
    }

    /// Forgets all levels and tiles so the next view starts from scratch
    pub fn invalidate_all(&mut self) {
        for (zoom, level) in std::mem::take(&mut self.levels) {
            self.surface.remove_element(&level.el);
            self.remove_tiles_at_zoom(zoom);
            self.events.fire(MapEvent::LevelRemove { zoom });
        }
        self.remove_all_tiles();
        self.level = None;
        self.tile_zoom = None;
    }

    /// Tile zoom for a map zoom, in the numbering of the layer's CRS
    pub fn compute_tile_zoom(&self, view: &impl MapView, zoom: f64) -> Result<Option<i32>> {
        let rounded = zoom.round();
        if !rounded.is_finite() {
            return Ok(None);
        }
        let rounded = rounded as i32;
        let options = &self.options;
        if options.max_zoom.is_some_and(|max| rounded > max)
            || options.min_zoom.is_some_and(|min| rounded < min)
        {
            return Ok(None);
        }

        let tile_zoom = self.clamp_zoom(rounded);
        match options.custom_crs.as_deref() {
            None => Ok(Some(tile_zoom)),
            Some(name) => {
                let start_zoom = view.start_zoom(Some(name))?;
                if zoom < start_zoom as f64 {
                    Ok(None)
                } else {
                    Ok(Some(tile_zoom - start_zoom))
                }
            }
        }
    }

    /// Clamps a zoom into the native zoom range, if one is configured
    pub fn clamp_zoom(&self, zoom: i32) -> i32 {
        let mut zoom = zoom;
        if let Some(min) = self.options.min_native_zoom {
            zoom = zoom.max(min);
        }
        if let Some(max) = self.options.max_native_zoom {
            zoom = zoom.min(max);
        }
        zoom
    }

    /// Recomputes tile size, world tile range and wrap ranges for the tile zoom
    pub fn reset_grid(&mut self, view: &impl MapView) -> Result<()> {
        let crs_name = self.crs_name();
        let crs_name = crs_name.as_deref();
        let crs = view.crs(crs_name)?;

        self.tile_size = self.options.tile_size_point();
        self.global_tile_range = None;
        self.wrap_x = None;
        self.wrap_y = None;

        let Some(tile_zoom) = self.tile_zoom else {
            return Ok(());
        };
        let zoom = tile_zoom as f64;
        let tile_size = self.tile_size;

        if let Some(bounds) = crs.projected_bounds(zoom) {
            self.global_tile_range = Some(self.px_bounds_to_tile_range(&bounds));
        }

        if !self.options.no_wrap {
            if let Some((west, east)) = crs.wrap_lng {
                let a = view.project(&LatLng::new(0.0, west), Some(zoom), crs_name)?.x;
                let b = view.project(&LatLng::new(0.0, east), Some(zoom), crs_name)?.x;
                self.wrap_x = Some(index_range(a, b, tile_size.x));
            }
            if let Some((south, north)) = crs.wrap_lat {
                let a = view.project(&LatLng::new(south, 0.0), Some(zoom), crs_name)?.y;
                let b = view.project(&LatLng::new(north, 0.0), Some(zoom), crs_name)?.y;
                self.wrap_y = Some(index_range(a, b, tile_size.y));
            }
        }
        Ok(())
    }

    /// Pixel bounds, at the tile zoom, the viewport covers when centered on `center`
    pub fn tiled_pixel_bounds(
        &self,
        view: &impl MapView,
        center: &LatLng,
        tile_zoom: i32,
    ) -> Result<Bounds> {
        let crs = self.options.custom_crs.as_deref();
        let map_zoom = match view.animation_target_zoom() {
            Some(target) => target.max(view.zoom()),
            None => view.zoom(),
        };
        let start_zoom = view.start_zoom(crs)?;
        let scale = view.zoom_scale(map_zoom, Some((tile_zoom + start_zoom) as f64), crs)?;
        let pixel_center = view.project(center, Some(tile_zoom as f64), crs)?.floor();
        let half_size = view.size().divide_by(scale * 2.0);

        Ok(Bounds::new(
            pixel_center.subtract(&half_size),
            pixel_center.add(&half_size),
        ))
    }

    /// Inclusive tile index range touched by pixel bounds
    pub fn px_bounds_to_tile_range(&self, bounds: &Bounds) -> Bounds {
        let tile_size = &self.tile_size;
        Bounds::new(
            bounds.min.unscale_by(tile_size).floor(),
            bounds
                .max
                .unscale_by(tile_size)
                .ceil()
                .subtract(&Point::new(1.0, 1.0)),
        )
    }

    /// Tile range grown by `keep_buffer` tiles on every side
    pub fn keep_buffer_range(&self, tile_range: &Bounds) -> Bounds {
        let margin = self.options.keep_buffer as f64;
        Bounds::new(
            tile_range
                .bottom_left()
                .subtract(&Point::new(margin, -margin)),
            tile_range.top_right().add(&Point::new(margin, -margin)),
        )
    }

    /// Creates the tiles the view at `center` is missing.
    ///
    /// Fails with [`MapError::InfiniteTileRange`] before touching any tile
    /// when the range is not finite.
    pub fn update(&mut self, view: &impl MapView, center: Option<LatLng>) -> Result<()> {
        if self.container.is_none() {
            return Err(MapError::NotAttached);
        }
        let Some(tile_zoom) = self.tile_zoom else {
            return Ok(());
        };
        let center = center.unwrap_or_else(|| view.center());

        let pixel_bounds = self.tiled_pixel_bounds(view, &center, tile_zoom)?;
        let tile_range = self.px_bounds_to_tile_range(&pixel_bounds);
        if !tile_range.is_finite() {
            log::warn!("refusing infinite tile range {tile_range:?} at z{tile_zoom}");
            return Err(MapError::InfiniteTileRange);
        }
        let tile_center = tile_range.center();
        let no_prune_range = self.keep_buffer_range(&tile_range);

        for tile in self.tiles.values_mut() {
            tile.current =
                tile.coords.z == tile_zoom && no_prune_range.contains(&tile.coords.to_point());
        }

        let mut queue = Vec::new();
        for j in tile_range.min.y as i64..=tile_range.max.y as i64 {
            for i in tile_range.min.x as i64..=tile_range.max.x as i64 {
                let coords = TileCoord::new(i, j, tile_zoom);
                if !self.is_valid_tile(view, &coords)? {
                    continue;
                }
                match self.tiles.get_mut(&TileKey::from(&coords)) {
                    Some(tile) => tile.current = true,
                    None => queue.push(coords),
                }
            }
        }

        if queue.is_empty() {
            return Ok(());
        }
        sort_by_distance(&mut queue, &tile_center);

        if !self.loading {
            self.loading = true;
            self.events.fire(MapEvent::Loading);
        }

        let level_el = self
            .current_level()
            .map(|level| level.el.clone())
            .ok_or(MapError::NotLoaded)?;
        let mut fragment = Vec::with_capacity(queue.len());
        for coords in &queue {
            fragment.push(self.add_tile(*coords)?);
        }
        self.surface.append_batch(&level_el, &fragment);

        log::trace!("queued {} tiles at z{}", queue.len(), tile_zoom);
        Ok(())
    }

    fn add_tile(&mut self, coords: TileCoord) -> Result<S::Element> {
        let tile_pos = self.tile_pos(&coords)?;
        let wrapped = self.wrap_coords(&coords);
        let el = self.surface.create_tile(coords, wrapped);
        self.surface.set_position(&el, tile_pos);

        self.tiles
            .insert(TileKey::from(&coords), TileRecord::new(el.clone(), coords));
        self.events.fire(MapEvent::TileLoadStart { coords });
        Ok(el)
    }

    /// Whether a tile lies inside the world (on non-wrapping axes) and
    /// overlaps the layer bounds
    pub fn is_valid_tile(&self, view: &impl MapView, coords: &TileCoord) -> Result<bool> {
        let crs = view.crs(self.options.custom_crs.as_deref())?;

        if !crs.infinite {
            if let Some(range) = &self.global_tile_range {
                let (x, y) = (coords.x as f64, coords.y as f64);
                if (crs.wrap_lng.is_none() && (x < range.min.x || x > range.max.x))
                    || (crs.wrap_lat.is_none() && (y < range.min.y || y > range.max.y))
                {
                    return Ok(false);
                }
            }
        }

        let Some(limit) = &self.options.bounds else {
            return Ok(true);
        };
        Ok(limit.overlaps(&self.tile_coords_to_bounds(view, coords)?))
    }

    /// Geographical bounds of a tile, wrapped unless `no_wrap` is set
    pub fn tile_coords_to_bounds(
        &self,
        view: &impl MapView,
        coords: &TileCoord,
    ) -> Result<LatLngBounds> {
        let crs = self.options.custom_crs.as_deref();
        let zoom = Some(coords.z as f64);
        let nw_point = coords.to_point().scale_by(&self.tile_size);
        let se_point = nw_point.add(&self.tile_size);

        let nw = view.unproject(&nw_point, zoom, crs)?;
        let se = view.unproject(&se_point, zoom, crs)?;
        let bounds = LatLngBounds::from_corners(nw, se);

        if self.options.no_wrap {
            Ok(bounds)
        } else {
            Ok(view.crs(crs)?.wrap_lat_lng_bounds(&bounds))
        }
    }

    /// Tile index brought back into the wrap ranges
    pub fn wrap_coords(&self, coords: &TileCoord) -> TileCoord {
        TileCoord::new(
            self.wrap_x.map_or(coords.x, |range| wrap_index(coords.x, range)),
            self.wrap_y.map_or(coords.y, |range| wrap_index(coords.y, range)),
            coords.z,
        )
    }

    /// Drops tiles that are neither current nor standing in for a missing
    /// current tile. Everything goes when the map zoom leaves the layer range
    /// or drops below the start zoom of the layer's CRS.
    pub fn prune_tiles(&mut self, view: &impl MapView) {
        if self.container.is_none() {
            return;
        }

        let zoom = view.zoom();
        if self.tile_zoom.is_none()
            || self.options.max_zoom.is_some_and(|max| zoom > max as f64)
            || self.options.min_zoom.is_some_and(|min| zoom < min as f64)
        {
            self.remove_all_tiles();
            return;
        }

        for tile in self.tiles.values_mut() {
            tile.retain = tile.current;
        }

        let waiting: Vec<TileCoord> = self
            .tiles
            .values()
            .filter(|tile| tile.current && !tile.active)
            .map(|tile| tile.coords)
            .collect();
        for coords in waiting {
            if !self.retain_parent(coords, coords.z - PARENT_RETAIN_DEPTH) {
                self.retain_children(coords, coords.z + CHILD_RETAIN_DEPTH);
            }
        }

        let stale: Vec<TileKey> = self
            .tiles
            .iter()
            .filter(|(_, tile)| !tile.retain)
            .map(|(key, _)| key.clone())
            .collect();
        if !stale.is_empty() {
            log::trace!("pruning {} tiles", stale.len());
        }
        for key in stale {
            self.remove_tile(&key);
        }
    }

    /// Keeps the closest loaded ancestor down to `min_zoom`; true once an active one is found
    fn retain_parent(&mut self, coords: TileCoord, min_zoom: i32) -> bool {
        let parent = coords.parent();
        if let Some(tile) = self.tiles.get_mut(&TileKey::from(&parent)) {
            if tile.active {
                tile.retain = true;
                return true;
            }
            if tile.loaded {
                tile.retain = true;
            }
        }
        if parent.z > min_zoom {
            return self.retain_parent(parent, min_zoom);
        }
        false
    }

    /// Keeps loaded descendants up to `max_zoom`
    fn retain_children(&mut self, coords: TileCoord, max_zoom: i32) {
        for child in coords.children() {
            if let Some(tile) = self.tiles.get_mut(&TileKey::from(&child)) {
                if tile.active {
                    tile.retain = true;
                    continue;
                }
                if tile.loaded {
                    tile.retain = true;
                }
            }
            if child.z < max_zoom {
                self.retain_children(child, max_zoom);
            }
        }
    }

    /// Drops tiles still loading at a zoom other than the tile zoom
    pub fn abort_loading(&mut self) {
        let tile_zoom = self.tile_zoom;
        let aborted: Vec<TileKey> = self
            .tiles
            .iter()
            .filter(|(_, tile)| Some(tile.coords.z) != tile_zoom && !tile.loaded)
            .map(|(key, _)| key.clone())
            .collect();

        for key in aborted {
            if let Some(tile) = self.tiles.remove(&key) {
                self.surface.remove_element(&tile.el);
                self.events.fire(MapEvent::TileAbort {
                    coords: tile.coords,
                });
            }
        }
    }

    /// Reports a tile as loaded, or failed with `error`.
    ///
    /// Fires `tileerror` or `tileload`, and `load` once nothing is left loading.
    pub fn tile_ready(&mut self, view: &impl MapView, coords: &TileCoord, error: Option<String>) {
        let Some(tile) = self.tiles.get_mut(&TileKey::from(coords)) else {
            log::trace!("tile {coords} finished after it was removed");
            return;
        };
        tile.mark_loaded(error.clone());
        if let Some(elapsed) = tile.load_time() {
            log::trace!("tile {coords} ready after {elapsed:?}");
        }

        if let Some(error) = &error {
            log::warn!("tile {coords} failed to load: {error}");
            self.events.fire(MapEvent::TileError {
                coords: *coords,
                error: error.clone(),
            });
        }

        if !self.no_prune {
            self.prune_tiles(view);
        }

        if error.is_none() {
            self.events.fire(MapEvent::TileLoad { coords: *coords });
        }

        if self.no_tiles_to_load() {
            self.loading = false;
            self.events.fire(MapEvent::Load);
        }
    }

    fn no_tiles_to_load(&self) -> bool {
        self.tiles.values().all(|tile| tile.loaded)
    }

    pub fn remove_tile(&mut self, key: &TileKey) {
        let Some(tile) = self.tiles.remove(key) else {
            return;
        };
        self.surface.remove_element(&tile.el);
        self.events.fire(MapEvent::TileUnload {
            coords: tile.coords,
        });
    }

    pub fn remove_tiles_at_zoom(&mut self, zoom: i32) {
        let keys: Vec<TileKey> = self
            .tiles
            .iter()
            .filter(|(_, tile)| tile.coords.z == zoom)
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            self.remove_tile(&key);
        }
    }

    pub fn remove_all_tiles(&mut self) {
        let keys: Vec<TileKey> = self.tiles.keys().cloned().collect();
        for key in keys {
            self.remove_tile(&key);
        }
    }
}

/// Orders tiles by distance from `center`, keeping row-major order on ties
pub(crate) fn sort_by_distance(queue: &mut [TileCoord], center: &Point) {
    queue.sort_by(|a, b| {
        a.to_point()
            .distance_to(center)
            .total_cmp(&b.to_point().distance_to(center))
    });
}

/// Tile indices spanned by two pixel coordinates along one axis
fn index_range(a: f64, b: f64, tile_size: f64) -> (i64, i64) {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    (
        (low / tile_size).floor() as i64,
        (high / tile_size).ceil() as i64,
    )
}

fn wrap_index(index: i64, (min, max): (i64, i64)) -> i64 {
    let span = max - min;
    if span <= 0 {
        return index;
    }
    (index - min).rem_euclid(span) + min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            config::{CrsRegistry, GridLayerOptions, MapOptions},
            crs::{Crs, LonLat, EPSG4326},
            viewport::Viewport,
        },
        prelude::Arc,
        rendering::HeadlessSurface,
    };

    type Grid = TileGridController<HeadlessSurface, Vec<MapEvent>>;

    fn viewport(options: MapOptions, size: f64, center: LatLng, zoom: f64) -> Viewport {
        Viewport::with_view(
            options,
            Point::new(size, size),
            center,
            zoom,
            &mut Vec::new(),
        )
        .unwrap()
    }

    fn attached(options: GridLayerOptions, view: &Viewport) -> Grid {
        let mut grid = Grid::with_events(options, HeadlessSurface::new(), Vec::new());
        grid.on_add(view).unwrap();
        grid
    }

    fn coords(grid: &Grid) -> Vec<(i64, i64, i32)> {
        grid.tile_coords()
            .into_iter()
            .map(|c| (c.x, c.y, c.z))
            .collect()
    }

    #[test]
    fn test_tile_range_uses_floor_and_ceil_minus_one() {
        let grid = Grid::with_events(GridLayerOptions::default(), HeadlessSurface::new(), Vec::new());
        let range = grid.px_bounds_to_tile_range(&Bounds::from_coords(0.0, 0.0, 512.0, 512.0));
        assert_eq!(range, Bounds::from_coords(0.0, 0.0, 1.0, 1.0));

        let range = grid.px_bounds_to_tile_range(&Bounds::from_coords(-10.0, 10.0, 300.0, 257.0));
        assert_eq!(range, Bounds::from_coords(-1.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_keep_buffer_grows_every_side() {
        let grid = Grid::with_events(GridLayerOptions::default(), HeadlessSurface::new(), Vec::new());
        let buffered = grid.keep_buffer_range(&Bounds::from_coords(1.0, 1.0, 2.0, 3.0));
        assert_eq!(buffered, Bounds::from_coords(-1.0, -1.0, 4.0, 5.0));
    }

    #[test]
    fn test_keep_buffer_contains_visible_range() {
        let ranges = [
            Bounds::from_coords(0.0, 0.0, 0.0, 0.0),
            Bounds::from_coords(1.0, 1.0, 2.0, 3.0),
            Bounds::from_coords(-3.0, -2.0, -1.0, 0.0),
            Bounds::from_coords(-5.0, 4.0, 7.0, 9.0),
            Bounds::from_coords(120.0, -60.0, 131.0, -52.0),
        ];
        for keep_buffer in [0, 1, 2, 5] {
            let options = GridLayerOptions {
                keep_buffer,
                ..GridLayerOptions::default()
            };
            let grid = Grid::with_events(options, HeadlessSurface::new(), Vec::new());
            let margin = keep_buffer as f64;
            for range in &ranges {
                let buffered = grid.keep_buffer_range(range);
                assert!(
                    buffered.contains_bounds(range),
                    "buffer {keep_buffer} around {range:?} gave {buffered:?}"
                );
                assert_eq!(buffered.width(), range.width() + 2.0 * margin);
                assert_eq!(buffered.height(), range.height() + 2.0 * margin);
            }
        }
    }

    #[test]
    fn test_queue_sorted_by_euclidean_distance() {
        let mut queue = vec![
            TileCoord::new(3, 0, 4),
            TileCoord::new(2, 2, 4),
            TileCoord::new(1, 0, 4),
            TileCoord::new(0, 1, 4),
        ];
        sort_by_distance(&mut queue, &Point::new(0.0, 0.0));
        let order: Vec<_> = queue.iter().map(|c| (c.x, c.y)).collect();
        // (1,0) and (0,1) tie and keep their queued order
        assert_eq!(order, vec![(1, 0), (0, 1), (2, 2), (3, 0)]);
    }

    #[test]
    fn test_wrap_index_and_range() {
        assert_eq!(wrap_index(-1, (0, 4)), 3);
        assert_eq!(wrap_index(4, (0, 4)), 0);
        assert_eq!(wrap_index(9, (0, 4)), 1);
        assert_eq!(wrap_index(7, (0, 0)), 7);
        assert_eq!(index_range(512.0, 0.0, 256.0), (0, 2));
    }

    #[test]
    fn test_update_fills_visible_range() {
        let view = viewport(MapOptions::default(), 512.0, LatLng::new(0.0, 0.0), 2.0);
        let grid = attached(GridLayerOptions::default(), &view);

        assert_eq!(grid.tile_zoom(), Some(2));
        assert_eq!(
            coords(&grid),
            vec![(1, 1, 2), (2, 1, 2), (1, 2, 2), (2, 2, 2)]
        );
        assert!(grid.tiles().all(|tile| tile.current && !tile.loaded));
        assert!(grid.is_loading());
        assert_eq!(grid.surface().tile_count(), 4);

        let names: Vec<_> = grid.events().iter().map(MapEvent::name).collect();
        assert_eq!(names.iter().filter(|n| **n == "loading").count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "tileloadstart").count(), 4);
    }

    #[test]
    fn test_tile_positions_are_relative_to_level_origin() {
        let view = viewport(MapOptions::default(), 512.0, LatLng::new(0.0, 0.0), 2.0);
        let grid = attached(GridLayerOptions::default(), &view);

        let origin = grid.current_level().unwrap().origin;
        assert_eq!(origin, Point::new(256.0, 256.0));
        let tile = grid.tile(&TileCoord::new(2, 1, 2)).unwrap();
        let node = grid.surface().node(tile.el).unwrap();
        assert_eq!(node.translate, Point::new(256.0, 0.0));
        assert_eq!(node.parent, Some(grid.current_level().unwrap().el));
    }

    #[test]
    fn test_rows_outside_world_are_skipped_and_columns_wrap() {
        let view = viewport(MapOptions::default(), 1024.0, LatLng::new(0.0, 0.0), 0.0);
        let grid = attached(GridLayerOptions::default(), &view);

        assert_eq!(grid.global_tile_range(), Some(&Bounds::from_coords(0.0, 0.0, 0.0, 0.0)));
        assert_eq!(grid.wrap_x(), Some((0, 1)));
        assert_eq!(
            coords(&grid),
            vec![(-2, 0, 0), (-1, 0, 0), (0, 0, 0), (1, 0, 0), (2, 0, 0)]
        );
        assert_eq!(grid.wrap_coords(&TileCoord::new(-2, 0, 0)), TileCoord::new(0, 0, 0));
    }

    #[test]
    fn test_columns_past_the_world_need_a_wrapping_crs() {
        let flat = Arc::new(Crs::epsg3857().with_wrap_lng(None));
        let map = MapOptions::default().with_custom_crs(CrsRegistry::new().with("flat", flat, 0));
        let view = viewport(map, 512.0, LatLng::new(0.0, 0.0), 0.0);

        let wrapping = attached(GridLayerOptions::default(), &view);
        let flat = attached(GridLayerOptions::default().with_custom_crs("flat"), &view);
        let past_east = TileCoord::new(1, 0, 0);

        assert!(wrapping.is_valid_tile(&view, &past_east).unwrap());
        assert!(!flat.is_valid_tile(&view, &past_east).unwrap());
        assert!(flat.is_valid_tile(&view, &TileCoord::new(0, 0, 0)).unwrap());
        assert_eq!(flat.wrap_x(), None);
        assert_eq!(coords(&flat), vec![(0, 0, 0)]);
    }

    #[test]
    fn test_layer_bounds_limit_tiles() {
        let view = viewport(MapOptions::default(), 1024.0, LatLng::new(0.0, 0.0), 2.0);
        let options = GridLayerOptions {
            bounds: Some(LatLngBounds::from_coords(0.0, 0.0, 80.0, 170.0)),
            ..GridLayerOptions::default()
        };
        let grid = attached(options, &view);
        assert_eq!(
            coords(&grid),
            vec![(2, 0, 2), (3, 0, 2), (2, 1, 2), (3, 1, 2)]
        );
    }

    #[test]
    fn test_infinite_range_fails_before_touching_tiles() {
        let broken = Crs::custom("broken", Arc::new(LonLat), vec![1.0, 0.0], Point::default(), None)
            .unwrap();
        let map = MapOptions::default()
            .with_custom_crs(CrsRegistry::new().with("broken", Arc::new(broken), 0));
        let view = viewport(map, 512.0, LatLng::new(0.0, 0.0), 1.0);

        let mut grid = Grid::with_events(
            GridLayerOptions::default().with_custom_crs("broken"),
            HeadlessSurface::new(),
            Vec::new(),
        );
        assert!(matches!(grid.on_add(&view), Err(MapError::InfiniteTileRange)));
        assert_eq!(grid.tile_count(), 0);
        assert_eq!(grid.surface().tile_count(), 0);
    }

    #[test]
    fn test_tile_zoom_respects_layer_range_and_native_clamp() {
        let view = viewport(MapOptions::default(), 256.0, LatLng::new(0.0, 0.0), 2.0);
        let grid = Grid::with_events(
            GridLayerOptions {
                min_zoom: Some(1),
                max_zoom: Some(10),
                max_native_zoom: Some(6),
                ..GridLayerOptions::default()
            },
            HeadlessSurface::new(),
            Vec::new(),
        );
        assert_eq!(grid.compute_tile_zoom(&view, 0.4).unwrap(), None);
        assert_eq!(grid.compute_tile_zoom(&view, 3.6).unwrap(), Some(4));
        assert_eq!(grid.compute_tile_zoom(&view, 8.0).unwrap(), Some(6));
        assert_eq!(grid.compute_tile_zoom(&view, 11.0).unwrap(), None);
    }

    #[test]
    fn test_tile_zoom_below_crs_start_is_none() {
        let map = MapOptions::default()
            .with_custom_crs(CrsRegistry::new().with("plate", EPSG4326.clone(), 2));
        let view = viewport(map, 256.0, LatLng::new(0.0, 0.0), 3.0);
        let grid = Grid::with_events(
            GridLayerOptions::default().with_custom_crs("plate"),
            HeadlessSurface::new(),
            Vec::new(),
        );
        assert_eq!(grid.compute_tile_zoom(&view, 1.0).unwrap(), None);
        assert_eq!(grid.compute_tile_zoom(&view, 1.6).unwrap(), None);
        assert_eq!(grid.compute_tile_zoom(&view, 2.0).unwrap(), Some(0));
        assert_eq!(grid.compute_tile_zoom(&view, 5.2).unwrap(), Some(3));
    }

    #[test]
    fn test_update_requires_attachment() {
        let view = viewport(MapOptions::default(), 256.0, LatLng::new(0.0, 0.0), 2.0);
        let mut grid = Grid::with_events(GridLayerOptions::default(), HeadlessSurface::new(), Vec::new());
        assert!(matches!(grid.update(&view, None), Err(MapError::NotAttached)));
        assert!(matches!(
            grid.set_view(&view, view.center, 2.0, false, false),
            Err(MapError::NotAttached)
        ));
    }
}
