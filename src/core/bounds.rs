use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Represents a bounding box in pixel or tile-index coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Creates the smallest bounds containing both corners, in any order.
    ///
    /// NaN components are kept rather than dropped, so a broken range stays
    /// detectable through [`Bounds::is_finite`].
    pub fn new(a: Point, b: Point) -> Self {
        let (min_x, max_x) = if a.x <= b.x { (a.x, b.x) } else { (b.x, a.x) };
        let (min_y, max_y) = if a.y <= b.y { (a.y, b.y) } else { (b.y, a.y) };
        Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Gets the width of the bounds
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Gets the height of the bounds
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Corner with minimal x and maximal y (y grows downwards)
    pub fn bottom_left(&self) -> Point {
        Point::new(self.min.x, self.max.y)
    }

    /// Corner with maximal x and minimal y
    pub fn top_right(&self) -> Point {
        Point::new(self.max.x, self.min.y)
    }

    /// Checks if the bounds contain a point (edges inclusive)
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Checks if the bounds fully contain another bounds
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(&other.min) && self.contains(&other.max)
    }

    /// Checks if the bounds share an area with another bounds
    pub fn overlaps(&self, other: &Bounds) -> bool {
        other.max.x > self.min.x
            && other.min.x < self.max.x
            && other.max.y > self.min.y
            && other.min.y < self.max.y
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0))
    }
}
