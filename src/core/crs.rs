//! Coordinate reference systems
//!
//! A [`Crs`] turns geographical coordinates into pixel coordinates at a given
//! zoom: a [`Projection`] maps lat/lng into projected units, a
//! [`Transformation`] maps projected units into pixels at scale 1, and a
//! [`ZoomScale`] says how many pixels one unit covers at each zoom.
//!
//! Besides the built-in web-map systems, custom systems described by a
//! resolution table and a grid origin can be created with [`Crs::custom`].

use crate::{
    core::{
        bounds::Bounds,
        geo::{wrap_num, LatLng, LatLngBounds, Point},
    },
    MapError, Result,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt, sync::Arc};

/// Web Mercator projection constants
const EARTH_RADIUS: f64 = 6378137.0;
const MAX_LATITUDE: f64 = 85.0511287798;

/// Maps geographical coordinates to projected units and back
pub trait Projection: fmt::Debug + Send + Sync {
    fn project(&self, lat_lng: &LatLng) -> Point;

    fn unproject(&self, point: &Point) -> LatLng;

    /// Extent of the projected world
    fn bounds(&self) -> Bounds;
}

/// Spherical Mercator (EPSG:3857), clamped at the usual latitude limit
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl Projection for SphericalMercator {
    fn project(&self, lat_lng: &LatLng) -> Point {
        let lat = lat_lng.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let sin = lat.to_radians().sin();
        Point::new(
            EARTH_RADIUS * lat_lng.lng.to_radians(),
            EARTH_RADIUS * ((1.0 + sin) / (1.0 - sin)).ln() / 2.0,
        )
    }

    fn unproject(&self, point: &Point) -> LatLng {
        LatLng::new(
            (2.0 * (point.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
            (point.x / EARTH_RADIUS).to_degrees(),
        )
    }

    fn bounds(&self) -> Bounds {
        let d = EARTH_RADIUS * PI;
        Bounds::from_coords(-d, -d, d, d)
    }
}

/// Equirectangular projection: x is longitude, y is latitude
#[derive(Debug, Clone, Copy, Default)]
pub struct LonLat;

impl Projection for LonLat {
    fn project(&self, lat_lng: &LatLng) -> Point {
        Point::new(lat_lng.lng, lat_lng.lat)
    }

    fn unproject(&self, point: &Point) -> LatLng {
        LatLng::new(point.y, point.x)
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_coords(-180.0, -90.0, 180.0, 90.0)
    }
}

/// Serializable choice of projection for configured systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    SphericalMercator,
    LonLat,
}

impl ProjectionKind {
    pub fn build(self) -> Arc<dyn Projection> {
        match self {
            ProjectionKind::SphericalMercator => Arc::new(SphericalMercator),
            ProjectionKind::LonLat => Arc::new(LonLat),
        }
    }
}

/// Affine map `(x, y) -> scale * (a*x + b, c*y + d)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Transformation {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    pub fn transform(&self, point: &Point, scale: f64) -> Point {
        Point::new(
            scale * (self.a * point.x + self.b),
            scale * (self.c * point.y + self.d),
        )
    }

    pub fn untransform(&self, point: &Point, scale: f64) -> Point {
        Point::new(
            (point.x / scale - self.b) / self.a,
            (point.y / scale - self.d) / self.c,
        )
    }
}

/// How the pixel scale grows with zoom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomScale {
    /// `base * 2^zoom`
    PowerOfTwo { base: f64 },
    /// One projected-units-per-pixel entry per integer zoom, starting at zoom 0.
    /// Fractional zooms interpolate linearly between neighbouring scales.
    Resolutions(Vec<f64>),
}

impl ZoomScale {
    /// Pixels per projected unit at `zoom`; NaN outside a resolution table
    pub fn scale(&self, zoom: f64) -> f64 {
        match self {
            ZoomScale::PowerOfTwo { base } => base * 2_f64.powf(zoom),
            ZoomScale::Resolutions(resolutions) => {
                let at = |i: f64| -> f64 {
                    if i < 0.0 || !i.is_finite() {
                        return f64::NAN;
                    }
                    resolutions
                        .get(i as usize)
                        .map_or(f64::NAN, |resolution| 1.0 / resolution)
                };
                let base_zoom = zoom.floor();
                if zoom == base_zoom {
                    return at(base_zoom);
                }
                let base = at(base_zoom);
                let next = at(base_zoom + 1.0);
                base + (next - base) * (zoom - base_zoom)
            }
        }
    }
}

/// A coordinate reference system
#[derive(Debug, Clone)]
pub struct Crs {
    code: String,
    projection: Arc<dyn Projection>,
    transformation: Transformation,
    zoom_scale: ZoomScale,
    /// Projected extent; when absent the projection's own bounds are used
    bounds: Option<Bounds>,
    pub wrap_lng: Option<(f64, f64)>,
    pub wrap_lat: Option<(f64, f64)>,
    /// Infinite systems have no world bounds, so tiles are never bounds-rejected
    pub infinite: bool,
}

impl Crs {
    pub fn new(
        code: impl Into<String>,
        projection: Arc<dyn Projection>,
        transformation: Transformation,
        zoom_scale: ZoomScale,
    ) -> Self {
        Self {
            code: code.into(),
            projection,
            transformation,
            zoom_scale,
            bounds: None,
            wrap_lng: None,
            wrap_lat: None,
            infinite: false,
        }
    }

    /// Spherical Mercator with 256px tiles, wrapping longitude
    pub fn epsg3857() -> Self {
        let scale = 0.5 / (PI * EARTH_RADIUS);
        Self {
            wrap_lng: Some((-180.0, 180.0)),
            ..Self::new(
                "EPSG:3857",
                Arc::new(SphericalMercator),
                Transformation::new(scale, 0.5, -scale, 0.5),
                ZoomScale::PowerOfTwo { base: 256.0 },
            )
        }
    }

    /// Plate carrée with two 256px tiles at zoom 0, wrapping longitude
    pub fn epsg4326() -> Self {
        Self {
            wrap_lng: Some((-180.0, 180.0)),
            ..Self::new(
                "EPSG:4326",
                Arc::new(LonLat),
                Transformation::new(1.0 / 180.0, 1.0, -1.0 / 180.0, 0.5),
                ZoomScale::PowerOfTwo { base: 256.0 },
            )
        }
    }

    /// Flat, unbounded plane for non-geographical images
    pub fn simple() -> Self {
        Self {
            infinite: true,
            ..Self::new(
                "Simple",
                Arc::new(LonLat),
                Transformation::new(1.0, 0.0, -1.0, 0.0),
                ZoomScale::PowerOfTwo { base: 1.0 },
            )
        }
    }

    /// Grid defined by a resolution table and the projected top-left origin.
    ///
    /// Without `bounds` the system is infinite.
    pub fn custom(
        code: impl Into<String>,
        projection: Arc<dyn Projection>,
        resolutions: Vec<f64>,
        origin: Point,
        bounds: Option<Bounds>,
    ) -> Result<Self> {
        let code = code.into();
        if resolutions.is_empty() {
            return Err(MapError::InvalidConfig(format!(
                "CRS {code} needs at least one resolution"
            )));
        }
        Ok(Self {
            infinite: bounds.is_none(),
            bounds,
            ..Self::new(
                code,
                projection,
                Transformation::new(1.0, -origin.x, -1.0, origin.y),
                ZoomScale::Resolutions(resolutions),
            )
        })
    }

    pub fn with_wrap_lng(mut self, range: Option<(f64, f64)>) -> Self {
        self.wrap_lng = range;
        self
    }

    pub fn with_wrap_lat(mut self, range: Option<(f64, f64)>) -> Self {
        self.wrap_lat = range;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    pub fn zoom_scale(&self) -> &ZoomScale {
        &self.zoom_scale
    }

    pub fn scale(&self, zoom: f64) -> f64 {
        self.zoom_scale.scale(zoom)
    }

    /// Geographical coordinate to pixel coordinate at `zoom`
    pub fn lat_lng_to_point(&self, lat_lng: &LatLng, zoom: f64) -> Point {
        let projected = self.projection.project(lat_lng);
        self.transformation.transform(&projected, self.scale(zoom))
    }

    /// Pixel coordinate at `zoom` to geographical coordinate
    pub fn point_to_lat_lng(&self, point: &Point, zoom: f64) -> LatLng {
        let projected = self.transformation.untransform(point, self.scale(zoom));
        self.projection.unproject(&projected)
    }

    /// Pixel extent of the world at `zoom`; None for infinite systems
    pub fn projected_bounds(&self, zoom: f64) -> Option<Bounds> {
        if self.infinite {
            return None;
        }
        let extent = self.bounds.clone().unwrap_or_else(|| self.projection.bounds());
        let scale = self.scale(zoom);
        Some(Bounds::new(
            self.transformation.transform(&extent.min, scale),
            self.transformation.transform(&extent.max, scale),
        ))
    }

    /// Brings a coordinate back into the wrap ranges
    pub fn wrap_lat_lng(&self, lat_lng: &LatLng) -> LatLng {
        LatLng::new(
            self.wrap_lat
                .map_or(lat_lng.lat, |range| wrap_num(lat_lng.lat, range, true)),
            self.wrap_lng
                .map_or(lat_lng.lng, |range| wrap_num(lat_lng.lng, range, true)),
        )
    }

    /// Shifts bounds so their center lies inside the wrap ranges
    pub fn wrap_lat_lng_bounds(&self, bounds: &LatLngBounds) -> LatLngBounds {
        let center = bounds.center();
        let wrapped = self.wrap_lat_lng(&center);
        let lat_shift = center.lat - wrapped.lat;
        let lng_shift = center.lng - wrapped.lng;

        if lat_shift == 0.0 && lng_shift == 0.0 {
            return bounds.clone();
        }

        LatLngBounds::from_coords(
            bounds.south_west.lat - lat_shift,
            bounds.south_west.lng - lng_shift,
            bounds.north_east.lat - lat_shift,
            bounds.north_east.lng - lng_shift,
        )
    }
}

pub static EPSG3857: Lazy<Arc<Crs>> = Lazy::new(|| Arc::new(Crs::epsg3857()));
pub static EPSG4326: Lazy<Arc<Crs>> = Lazy::new(|| Arc::new(Crs::epsg4326()));
pub static SIMPLE: Lazy<Arc<Crs>> = Lazy::new(|| Arc::new(Crs::simple()));

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn test_epsg3857_origin_is_world_center() {
        let crs = Crs::epsg3857();
        let p = crs.lat_lng_to_point(&LatLng::new(0.0, 0.0), 0.0);
        assert_close(p.x, 128.0);
        assert_close(p.y, 128.0);

        let nw = crs.lat_lng_to_point(&LatLng::new(MAX_LATITUDE, -180.0), 1.0);
        assert_close(nw.x, 0.0);
        assert!(nw.y.abs() < 1e-3);
    }

    #[test]
    fn test_epsg3857_round_trip() {
        let crs = Crs::epsg3857();
        let ll = LatLng::new(59.33, 18.06);
        let back = crs.point_to_lat_lng(&crs.lat_lng_to_point(&ll, 7.5), 7.5);
        assert!(back.equals(&ll, 1e-9));
    }

    #[test]
    fn test_epsg4326_world_is_two_tiles_wide() {
        let crs = Crs::epsg4326();
        let bounds = crs.projected_bounds(0.0).unwrap();
        assert_close(bounds.width(), 512.0);
        assert_close(bounds.height(), 256.0);
    }

    #[test]
    fn test_simple_is_infinite() {
        let crs = Crs::simple();
        assert!(crs.projected_bounds(3.0).is_none());
        let p = crs.lat_lng_to_point(&LatLng::new(-10.0, 20.0), 1.0);
        assert_eq!(p, Point::new(40.0, 20.0));
    }

    #[test]
    fn test_resolution_scale_interpolates() {
        let scale = ZoomScale::Resolutions(vec![4.0, 2.0, 1.0]);
        assert_close(scale.scale(0.0), 0.25);
        assert_close(scale.scale(1.0), 0.5);
        assert_close(scale.scale(1.5), 0.75);
        assert!(scale.scale(3.0).is_nan());
        assert!(scale.scale(-1.0).is_nan());
    }

    #[test]
    fn test_power_of_two_scale_doubles() {
        let scale = ZoomScale::PowerOfTwo { base: 256.0 };
        assert_close(scale.scale(0.0), 256.0);
        assert_close(scale.scale(3.0), 2048.0);
        assert_close(scale.scale(1.5) / scale.scale(0.5), 2.0);
    }

    #[test]
    fn test_custom_crs_origin_maps_to_zero() {
        let crs = Crs::custom(
            "EPSG:3006",
            Arc::new(LonLat),
            vec![8.0, 4.0, 2.0],
            Point::new(-100.0, 100.0),
            Some(Bounds::from_coords(-100.0, -100.0, 100.0, 100.0)),
        )
        .unwrap();
        let p = crs.lat_lng_to_point(&LatLng::new(100.0, -100.0), 0.0);
        assert_close(p.x, 0.0);
        assert_close(p.y, 0.0);
        let bounds = crs.projected_bounds(2.0).unwrap();
        assert_close(bounds.width(), 100.0);
        assert!(!crs.infinite);
    }

    #[test]
    fn test_custom_crs_requires_resolutions() {
        let err = Crs::custom("X", Arc::new(LonLat), vec![], Point::default(), None).unwrap_err();
        assert!(matches!(err, MapError::InvalidConfig(_)));
    }

    #[test]
    fn test_wrap_lat_lng_bounds_shifts_whole_box() {
        let crs = Crs::epsg3857();
        let bounds = LatLngBounds::from_coords(0.0, 170.0, 10.0, 200.0);
        let wrapped = crs.wrap_lat_lng_bounds(&bounds);
        assert_close(wrapped.south_west.lng, -190.0);
        assert_close(wrapped.north_east.lng, -160.0);
        assert_eq!(wrapped.south_west.lat, 0.0);
    }
}
