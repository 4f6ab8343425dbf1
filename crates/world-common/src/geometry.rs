//! Integer 2-D coordinates used for raster and tile addressing.

use serde::{Deserialize, Serialize};

/// A point or extent on the raster grid.
///
/// `x` is the outer stride of a raster (`x * world_size + y`), which the
/// renderer maps to image rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: u32,
    pub y: u32,
}

impl Point2 {
    pub const ZERO: Point2 = Point2 { x: 0, y: 0 };

    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Number of cells covered when this point is used as an extent.
    pub fn area(&self) -> usize {
        self.x as usize * self.y as usize
    }

    /// Component-wise minimum.
    pub fn min(&self, other: Point2) -> Point2 {
        Point2::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise saturating difference (`self - other`).
    pub fn saturating_sub(&self, other: Point2) -> Point2 {
        Point2::new(self.x.saturating_sub(other.x), self.y.saturating_sub(other.y))
    }
}

impl std::fmt::Display for Point2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
