use crate::{
    core::{
        config::MapOptions,
        crs::Crs,
        events::{EventBus, MapEvent},
        geo::{LatLng, Point},
    },
    prelude::HashMap,
    MapError, Result,
};

/// What a grid layer needs from the map it is attached to.
///
/// Implementors provide the view state; the projection math is provided on
/// top of it. Every operation that takes a CRS name resolves it in the map's
/// CRS registry and fails with [`MapError::UnknownCrs`] rather than falling
/// back to the default CRS.
pub trait MapView {
    fn options(&self) -> &MapOptions;

    fn center(&self) -> LatLng;

    fn zoom(&self) -> f64;

    /// Viewport size in pixels
    fn size(&self) -> Point;

    /// Offset of the map pane relative to the container
    fn pane_pos(&self) -> Point;

    /// Zoom a running zoom animation is heading to
    fn animation_target_zoom(&self) -> Option<f64>;

    /// Pixel origin computed by the last move, for the default CRS or a named one
    fn pixel_origin(&self, crs: Option<&str>) -> Result<Point>;

    fn is_animating_zoom(&self) -> bool {
        self.animation_target_zoom().is_some()
    }

    fn crs(&self, name: Option<&str>) -> Result<&Crs> {
        match name {
            Some(name) => Ok(self.options().custom_crs.get(name)?.crs.as_ref()),
            None => Ok(self.options().crs.as_ref()),
        }
    }

    /// Global zoom at which the named CRS starts; 0 for the default CRS
    fn start_zoom(&self, name: Option<&str>) -> Result<i32> {
        match name {
            Some(name) => Ok(self.options().custom_crs.get(name)?.start_zoom),
            None => Ok(0),
        }
    }

    /// Geographical coordinate to pixel coordinate; `zoom` defaults to the current zoom
    fn project(&self, lat_lng: &LatLng, zoom: Option<f64>, crs: Option<&str>) -> Result<Point> {
        let zoom = zoom.unwrap_or_else(|| self.zoom());
        Ok(self.crs(crs)?.lat_lng_to_point(lat_lng, zoom))
    }

    /// Inverse of [`MapView::project`]
    fn unproject(&self, point: &Point, zoom: Option<f64>, crs: Option<&str>) -> Result<LatLng> {
        let zoom = zoom.unwrap_or_else(|| self.zoom());
        Ok(self.crs(crs)?.point_to_lat_lng(point, zoom))
    }

    /// Scale factor between two global zooms.
    ///
    /// For a named CRS both zooms are shifted by its start zoom before the
    /// CRS scale function is evaluated.
    fn zoom_scale(&self, to_zoom: f64, from_zoom: Option<f64>, crs: Option<&str>) -> Result<f64> {
        let from_zoom = from_zoom.unwrap_or_else(|| self.zoom());
        match crs {
            Some(name) => {
                let entry = self.options().custom_crs.get(name)?;
                Ok(entry.crs.scale(entry.local_zoom(to_zoom))
                    / entry.crs.scale(entry.local_zoom(from_zoom)))
            }
            None => {
                let crs = &self.options().crs;
                Ok(crs.scale(to_zoom) / crs.scale(from_zoom))
            }
        }
    }

    /// Pixel coordinate of the viewport's top-left corner when centered on `center`,
    /// rounded to whole pixels
    fn new_pixel_origin(
        &self,
        center: &LatLng,
        zoom: Option<f64>,
        crs: Option<&str>,
    ) -> Result<Point> {
        let view_half = self.size().divide_by(2.0);
        Ok(self
            .project(center, zoom, crs)?
            .subtract(&view_half)
            .add(&self.pane_pos())
            .round())
    }
}

/// Map view state: center, zoom, size and the pixel origins derived from them
#[derive(Debug, Clone)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    options: MapOptions,
    pane_pos: Point,
    /// Set by the first move; None until then
    pixel_origin: Option<Point>,
    /// Pixel origin per registered CRS whose start zoom has been reached
    crs_origins: HashMap<String, Point>,
    animation_target: Option<f64>,
}

impl Viewport {
    /// Creates a viewport that has not been moved yet
    pub fn new(options: MapOptions, size: Point) -> Self {
        Self {
            center: LatLng::default(),
            zoom: 0.0,
            size,
            options,
            pane_pos: Point::default(),
            pixel_origin: None,
            crs_origins: HashMap::default(),
            animation_target: None,
        }
    }

    /// Creates a viewport and moves it to `center`/`zoom` right away
    pub fn with_view(
        options: MapOptions,
        size: Point,
        center: LatLng,
        zoom: f64,
        events: &mut impl EventBus,
    ) -> Result<Self> {
        let mut viewport = Self::new(options, size);
        viewport.move_to(center, Some(zoom), false, events)?;
        Ok(viewport)
    }

    pub fn is_loaded(&self) -> bool {
        self.pixel_origin.is_some()
    }

    /// Moves the view, recomputing every pixel origin, then fires `zoom`
    /// (when the zoom changed or a pinch is running) and `move`.
    pub fn move_to(
        &mut self,
        center: LatLng,
        zoom: Option<f64>,
        pinch: bool,
        events: &mut impl EventBus,
    ) -> Result<()> {
        let zoom = self.limit_zoom(zoom.unwrap_or(self.zoom));
        let zoom_changed = self.zoom != zoom;

        self.zoom = zoom;
        self.center = center;
        self.pixel_origin = Some(self.new_pixel_origin(&center, None, None)?);

        let mut origins = Vec::with_capacity(self.options.custom_crs.len());
        let mut inactive = Vec::new();
        for (name, entry) in self.options.custom_crs.iter() {
            if zoom >= entry.start_zoom as f64 {
                let local_zoom = entry.local_zoom(zoom);
                origins.push((
                    name.to_string(),
                    self.new_pixel_origin(&center, Some(local_zoom), Some(name))?,
                ));
            } else {
                inactive.push(name.to_string());
            }
        }
        for name in inactive {
            self.crs_origins.remove(&name);
        }
        self.crs_origins.extend(origins);

        log::debug!(
            "moved to ({:.6}, {:.6}) z{} with {} CRS origins",
            center.lat,
            center.lng,
            zoom,
            self.crs_origins.len()
        );

        if zoom_changed || pinch {
            events.fire(MapEvent::Zoom { zoom, pinch });
        }
        events.fire(MapEvent::Move { center, zoom });
        Ok(())
    }

    /// Shorthand for a plain, non-pinch move
    pub fn set_view(
        &mut self,
        center: LatLng,
        zoom: f64,
        events: &mut impl EventBus,
    ) -> Result<()> {
        self.move_to(center, Some(zoom), false, events)
    }

    /// Sets the viewport size; origins follow on the next move
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    pub fn set_pane_pos(&mut self, pos: Point) {
        self.pane_pos = pos;
    }

    pub fn start_zoom_animation(&mut self, target_zoom: f64) {
        self.animation_target = Some(target_zoom);
    }

    pub fn end_zoom_animation(&mut self) {
        self.animation_target = None;
    }

    pub fn options_mut(&mut self) -> &mut MapOptions {
        &mut self.options
    }

    /// Names of the CRSs that currently have a pixel origin
    pub fn active_crs_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.crs_origins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Converts LatLng to layer point (relative to the pixel origin of `crs`)
    pub fn lat_lng_to_layer_point(&self, lat_lng: &LatLng, crs: Option<&str>) -> Result<Point> {
        let zoom = self.local_zoom(crs)?;
        let projected = self.project(lat_lng, Some(zoom), crs)?;
        Ok(projected.subtract(&self.pixel_origin(crs)?))
    }

    /// Converts layer point back to LatLng
    pub fn layer_point_to_lat_lng(&self, point: &Point, crs: Option<&str>) -> Result<LatLng> {
        let zoom = self.local_zoom(crs)?;
        let projected = point.add(&self.pixel_origin(crs)?);
        self.unproject(&projected, Some(zoom), crs)
    }

    /// Clamps a zoom into the map's zoom range
    pub fn limit_zoom(&self, zoom: f64) -> f64 {
        let zoom = self.options.min_zoom.map_or(zoom, |min| zoom.max(min));
        self.options.max_zoom.map_or(zoom, |max| zoom.min(max))
    }

    /// Current zoom in the numbering of `crs`
    fn local_zoom(&self, crs: Option<&str>) -> Result<f64> {
        Ok(self.zoom - self.start_zoom(crs)? as f64)
    }
}

impl MapView for Viewport {
    fn options(&self) -> &MapOptions {
        &self.options
    }

    fn center(&self) -> LatLng {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn size(&self) -> Point {
        self.size
    }

    fn pane_pos(&self) -> Point {
        self.pane_pos
    }

    fn animation_target_zoom(&self) -> Option<f64> {
        self.animation_target
    }

    fn pixel_origin(&self, crs: Option<&str>) -> Result<Point> {
        let origin = self.pixel_origin.ok_or(MapError::NotLoaded)?;
        match crs {
            None => Ok(origin),
            Some(name) => {
                // unknown names are a configuration error even before the start zoom
                self.options.custom_crs.get(name)?;
                self.crs_origins
                    .get(name)
                    .copied()
                    .ok_or(MapError::NotLoaded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        config::CrsRegistry,
        crs::{EPSG3857, EPSG4326, SIMPLE},
    };

    fn options() -> MapOptions {
        MapOptions::default().with_custom_crs(
            CrsRegistry::new()
                .with("plate", EPSG4326.clone(), 2)
                .with("flat", SIMPLE.clone(), 0),
        )
    }

    fn viewport(zoom: f64) -> (Viewport, Vec<MapEvent>) {
        let mut events = Vec::new();
        let viewport = Viewport::with_view(
            options(),
            Point::new(800.0, 600.0),
            LatLng::new(48.2, 16.37),
            zoom,
            &mut events,
        )
        .unwrap();
        (viewport, events)
    }

    #[test]
    fn test_round_trip_every_crs() {
        let (viewport, _) = viewport(4.0);
        let ll = LatLng::new(-33.9, 151.2);
        for crs in [None, Some("plate"), Some("flat")] {
            for zoom in [0.0, 3.0, 7.5] {
                let p = viewport.project(&ll, Some(zoom), crs).unwrap();
                let back = viewport.unproject(&p, Some(zoom), crs).unwrap();
                assert!(back.equals(&ll, 1e-9), "{crs:?} z{zoom}: {back:?}");
            }
        }
    }

    #[test]
    fn test_zoom_scale_identity_and_offset() {
        let (viewport, _) = viewport(4.0);
        for crs in [None, Some("plate"), Some("flat")] {
            assert_eq!(viewport.zoom_scale(5.3, Some(5.3), crs).unwrap(), 1.0);
        }
        assert_eq!(viewport.zoom_scale(6.0, Some(4.0), None).unwrap(), 4.0);
        assert_eq!(viewport.zoom_scale(6.0, None, Some("plate")).unwrap(), 4.0);
    }

    #[test]
    fn test_unknown_crs_fails_fast() {
        let (viewport, _) = viewport(4.0);
        let ll = LatLng::new(0.0, 0.0);
        assert!(matches!(
            viewport.project(&ll, None, Some("missing")),
            Err(MapError::UnknownCrs(_))
        ));
        assert!(matches!(
            viewport.unproject(&Point::default(), None, Some("missing")),
            Err(MapError::UnknownCrs(_))
        ));
        assert!(matches!(
            viewport.zoom_scale(1.0, None, Some("missing")),
            Err(MapError::UnknownCrs(_))
        ));
        assert!(matches!(
            viewport.pixel_origin(Some("missing")),
            Err(MapError::UnknownCrs(_))
        ));
    }

    #[test]
    fn test_pixel_origin_requires_a_move() {
        let viewport = Viewport::new(options(), Point::new(100.0, 100.0));
        assert!(!viewport.is_loaded());
        assert!(matches!(viewport.pixel_origin(None), Err(MapError::NotLoaded)));
    }

    #[test]
    fn test_new_pixel_origin_centers_view() {
        let (mut viewport, _) = viewport(3.0);
        let center = LatLng::new(0.0, 0.0);
        // world is 2048px at z3, so its center sits at 1024
        let origin = viewport.new_pixel_origin(&center, None, None).unwrap();
        assert_eq!(origin, Point::new(1024.0 - 400.0, 1024.0 - 300.0));

        viewport.set_pane_pos(Point::new(10.0, -5.0));
        let shifted = viewport.new_pixel_origin(&center, None, None).unwrap();
        assert_eq!(shifted, Point::new(634.0, 719.0));
    }

    #[test]
    fn test_crs_origins_follow_start_zoom() {
        let (mut viewport, events) = viewport(1.0);
        assert_eq!(viewport.active_crs_names(), vec!["flat"]);
        assert!(matches!(
            viewport.pixel_origin(Some("plate")),
            Err(MapError::NotLoaded)
        ));
        assert_eq!(events.iter().map(MapEvent::name).collect::<Vec<_>>(), vec!["zoom", "move"]);

        let mut events = Vec::new();
        viewport
            .move_to(viewport.center, Some(3.0), false, &mut events)
            .unwrap();
        assert_eq!(viewport.active_crs_names(), vec!["flat", "plate"]);
        let expected = viewport
            .new_pixel_origin(&viewport.center, Some(1.0), Some("plate"))
            .unwrap();
        assert_eq!(viewport.pixel_origin(Some("plate")).unwrap(), expected);

        viewport
            .move_to(viewport.center, Some(1.5), false, &mut events)
            .unwrap();
        assert_eq!(viewport.active_crs_names(), vec!["flat"]);
    }

    #[test]
    fn test_move_without_zoom_change_only_fires_move() {
        let (mut viewport, _) = viewport(3.0);
        let mut events = Vec::new();
        viewport
            .move_to(LatLng::new(1.0, 1.0), None, false, &mut events)
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "move");

        events.clear();
        viewport
            .move_to(LatLng::new(1.0, 1.0), None, true, &mut events)
            .unwrap();
        assert_eq!(events.iter().map(MapEvent::name).collect::<Vec<_>>(), vec!["zoom", "move"]);
    }

    #[test]
    fn test_moves_respect_map_zoom_range() {
        let options = MapOptions {
            min_zoom: Some(2.0),
            max_zoom: Some(6.0),
            ..options()
        };
        let mut viewport = Viewport::new(options, Point::new(256.0, 256.0));
        let mut events = Vec::new();
        viewport
            .move_to(LatLng::new(0.0, 0.0), Some(9.0), false, &mut events)
            .unwrap();
        assert_eq!(viewport.zoom, 6.0);
        viewport.set_view(viewport.center, 0.5, &mut events).unwrap();
        assert_eq!(viewport.zoom, 2.0);
    }

    #[test]
    fn test_layer_point_round_trip() {
        let (viewport, _) = viewport(5.0);
        let ll = LatLng::new(48.0, 16.0);
        for crs in [None, Some("plate")] {
            let layer = viewport.lat_lng_to_layer_point(&ll, crs).unwrap();
            let back = viewport.layer_point_to_lat_lng(&layer, crs).unwrap();
            assert!(back.equals(&ll, 1e-9));
        }
        assert_eq!(viewport.options().crs.code(), EPSG3857.code());
    }
}
