//! Common types shared by the map container, raster and renderer crates.

pub mod error;
pub mod geometry;

pub use error::{JobError, WorldError, WorldResult};
pub use geometry::Point2;
