use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true when both components are within `margin` of `other`
    pub fn equals(&self, other: &LatLng, margin: f64) -> bool {
        (self.lat - other.lat).abs().max((self.lng - other.lng).abs()) <= margin
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

/// Represents a point in screen, projected or tile-index space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn divide_by(&self, scalar: f64) -> Point {
        Point::new(self.x / scalar, self.y / scalar)
    }

    /// Component-wise multiplication
    pub fn scale_by(&self, other: &Point) -> Point {
        Point::new(self.x * other.x, self.y * other.y)
    }

    /// Component-wise division
    pub fn unscale_by(&self, other: &Point) -> Point {
        Point::new(self.x / other.x, self.y / other.y)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    pub fn ceil(&self) -> Point {
        Point::new(self.x.ceil(), self.y.ceil())
    }

    pub fn round(&self) -> Point {
        Point::new(self.x.round(), self.y.round())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Creates the smallest bounds containing both corners, in any order
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self::from_coords(
            a.lat.min(b.lat),
            a.lng.min(b.lng),
            a.lat.max(b.lat),
            a.lng.max(b.lng),
        )
    }

    /// Checks if the bounds share an area with another bounds (shared edges do not count)
    pub fn overlaps(&self, other: &LatLngBounds) -> bool {
        other.north_east.lat > self.south_west.lat
            && other.south_west.lat < self.north_east.lat
            && other.north_east.lng > self.south_west.lng
            && other.south_west.lng < self.north_east.lng
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

/// Integer tile index in a CRS tile grid.
///
/// Indices are signed: before wrapping, a grid that repeats horizontally
/// produces negative or out-of-world columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub z: i32,
}

impl TileCoord {
    pub fn new(x: i64, y: i64, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Tile index as a point, dropping the zoom
    pub fn to_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    /// Gets the parent tile one zoom level up
    pub fn parent(&self) -> TileCoord {
        TileCoord::new(self.x.div_euclid(2), self.y.div_euclid(2), self.z - 1)
    }

    /// Gets the four child tiles one zoom level down, row by row
    pub fn children(&self) -> [TileCoord; 4] {
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        [
            TileCoord::new(x, y, z),
            TileCoord::new(x + 1, y, z),
            TileCoord::new(x, y + 1, z),
            TileCoord::new(x + 1, y + 1, z),
        ]
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Wraps `x` into the half-open `range`; with `include_max` the upper bound maps to itself.
pub fn wrap_num(x: f64, range: (f64, f64), include_max: bool) -> f64 {
    let (min, max) = range;
    let d = max - min;
    if x == max && include_max {
        x
    } else {
        ((x - min) % d + d) % d + min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_creation() {
        let coord = LatLng::new(40.7128, -74.0060);
        assert_eq!(coord.lat, 40.7128);
        assert_eq!(coord.lng, -74.0060);
    }

    #[test]
    fn test_point_ops() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(p.distance_to(&Point::default()), 5.0);
        assert_eq!(p.scale_by(&Point::new(2.0, 3.0)), Point::new(6.0, 12.0));
        assert_eq!(p.unscale_by(&Point::new(2.0, 4.0)), Point::new(1.5, 1.0));
        assert_eq!(Point::new(-0.5, 1.2).floor(), Point::new(-1.0, 1.0));
        assert!(!Point::new(f64::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn test_bounds_overlap_excludes_shared_edges() {
        let a = LatLngBounds::from_coords(0.0, 0.0, 10.0, 10.0);
        let touching = LatLngBounds::from_coords(10.0, 0.0, 20.0, 10.0);
        let inside = LatLngBounds::from_coords(2.0, 2.0, 3.0, 3.0);

        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
    }

    #[test]
    fn test_from_corners_normalizes() {
        let b = LatLngBounds::from_corners(LatLng::new(10.0, 5.0), LatLng::new(-10.0, -5.0));
        assert_eq!(b.south_west, LatLng::new(-10.0, -5.0));
        assert_eq!(b.north_east, LatLng::new(10.0, 5.0));
    }

    #[test]
    fn test_tile_parent_of_negative_column() {
        let tile = TileCoord::new(-1, 3, 4);
        assert_eq!(tile.parent(), TileCoord::new(-1, 1, 3));
        assert!(tile.parent().children().contains(&tile));
    }

    #[test]
    fn test_wrap_num() {
        assert_eq!(wrap_num(190.0, (-180.0, 180.0), true), -170.0);
        assert_eq!(wrap_num(180.0, (-180.0, 180.0), true), 180.0);
        assert_eq!(wrap_num(180.0, (-180.0, 180.0), false), -180.0);
        assert_eq!(wrap_num(-1.0, (0.0, 4.0), false), 3.0);
    }
}
