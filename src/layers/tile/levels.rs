//! Zoom levels and their transforms

use super::{TileGridController, ZoomLevel};
use crate::{
    core::{
        constants::{DEFAULT_MAX_ZOOM, LEVEL_CONTAINER_CLASS},
        events::{EventBus, MapEvent},
        geo::{LatLng, Point, TileCoord},
        viewport::MapView,
    },
    prelude::HashMap,
    rendering::RenderSurface,
    MapError, Result,
};

impl<S: RenderSurface, E: EventBus> TileGridController<S, E> {
    /// Restacks levels around the tile zoom, drops empty ones and makes sure
    /// a level exists for the tile zoom. Returns the tile zoom.
    pub fn update_levels(&mut self, view: &impl MapView) -> Result<Option<i32>> {
        let Some(zoom) = self.tile_zoom else {
            return Ok(None);
        };
        let max_zoom = self.options.max_zoom.unwrap_or(DEFAULT_MAX_ZOOM);

        let existing: Vec<i32> = self.levels.keys().copied().collect();
        for z in existing {
            let has_tiles = self.tiles.values().any(|tile| tile.coords.z == z);
            if has_tiles || z == zoom {
                let z_index = max_zoom - (zoom - z).abs();
                if let Some(level) = self.levels.get_mut(&z) {
                    level.z_index = z_index;
                    self.surface.set_z_index(&level.el, z_index);
                }
                self.events.fire(MapEvent::LevelUpdate { zoom: z });
            } else if let Some(level) = self.levels.remove(&z) {
                self.surface.remove_element(&level.el);
                self.remove_tiles_at_zoom(z);
                self.events.fire(MapEvent::LevelRemove { zoom: z });
                log::trace!("removed empty level z{z}");
            }
        }

        if !self.levels.contains_key(&zoom) {
            self.create_level(view, zoom, max_zoom)?;
        }
        self.level = Some(zoom);
        Ok(Some(zoom))
    }

    fn create_level(&mut self, view: &impl MapView, zoom: i32, max_zoom: i32) -> Result<()> {
        let parent = self.container.clone().ok_or(MapError::NotAttached)?;
        let global_zoom = zoom + view.start_zoom(self.options.custom_crs.as_deref())?;

        let current = view.unproject(&view.pixel_origin(None)?, None, None)?;
        let origin = view
            .project(&current, Some(global_zoom as f64), None)?
            .round();

        // every CRS active at the current zoom gets an origin at this level
        let mut crs_origins = HashMap::default();
        for (name, entry) in view.options().custom_crs.iter() {
            let pixel_origin = match view.pixel_origin(Some(name)) {
                Ok(origin) => origin,
                Err(MapError::NotLoaded) => continue,
                Err(e) => return Err(e),
            };
            let current =
                view.unproject(&pixel_origin, Some(entry.local_zoom(view.zoom())), Some(name))?;
            let crs_origin = view
                .project(&current, Some(entry.local_zoom(global_zoom as f64)), Some(name))?
                .round();
            crs_origins.insert(name.to_string(), crs_origin);
        }

        // a zoom animation can enter the layer CRS before the map has moved
        // into it, so there is no pixel origin to carry over yet
        if let Some(name) = self.options.custom_crs.as_deref() {
            if !crs_origins.contains_key(name) {
                let crs_origin =
                    view.new_pixel_origin(&view.center(), Some(zoom as f64), Some(name))?;
                crs_origins.insert(name.to_string(), crs_origin);
            }
        }

        let el = self
            .surface
            .create_container("div", LEVEL_CONTAINER_CLASS, Some(&parent));
        self.surface.set_z_index(&el, max_zoom);

        self.levels.insert(
            zoom,
            ZoomLevel {
                el: el.clone(),
                zoom,
                global_zoom,
                origin,
                crs_origins,
                z_index: max_zoom,
                translate: Point::default(),
                scale: 1.0,
            },
        );

        self.set_zoom_transform(view, zoom, &view.center(), view.zoom())?;
        // make the new level take part in the zoom transition
        self.surface.flush_layout(&el);

        self.events.fire(MapEvent::LevelCreate { zoom });
        log::debug!("created level z{zoom} (global z{global_zoom}) at origin {origin:?}");
        Ok(())
    }

    /// Positions one level for a view at `center`/`zoom`
    pub fn set_zoom_transform(
        &mut self,
        view: &impl MapView,
        level_zoom: i32,
        center: &LatLng,
        zoom: f64,
    ) -> Result<()> {
        let crs = self.crs_name();
        let crs = crs.as_deref();
        let Some(level) = self.levels.get_mut(&level_zoom) else {
            return Ok(());
        };

        let scale = view.zoom_scale(zoom, Some(level.global_zoom as f64), crs)?;
        let origin = level.origin_for(crs)?;
        let local_zoom = zoom - view.start_zoom(crs)? as f64;
        let translate = origin
            .multiply(scale)
            .subtract(&view.new_pixel_origin(center, Some(local_zoom), crs)?)
            .round();

        level.translate = translate;
        level.scale = scale;
        if self.surface.supports_3d() {
            self.surface.set_transform(&level.el, translate, scale);
        } else {
            self.surface.set_position(&level.el, translate);
        }
        Ok(())
    }

    /// Repositions every level
    pub fn set_zoom_transforms(
        &mut self,
        view: &impl MapView,
        center: &LatLng,
        zoom: f64,
    ) -> Result<()> {
        let zooms: Vec<i32> = self.levels.keys().copied().collect();
        for level_zoom in zooms {
            self.set_zoom_transform(view, level_zoom, center, zoom)?;
        }
        Ok(())
    }

    /// Position of a tile inside the current level
    pub fn tile_pos(&self, coords: &TileCoord) -> Result<Point> {
        let level = self.current_level().ok_or(MapError::NotLoaded)?;
        let origin = level.origin_for(self.options.custom_crs.as_deref())?;
        Ok(coords.to_point().scale_by(&self.tile_size).subtract(&origin))
    }
}
