//! Terrain rendering for world maps.
//!
//! - [`shading`]: per-pixel colour from splat weights, height and sun angle
//! - [`pool`]: fixed-size worker pool driven from async code
//! - [`render`]: tiling plus assembly into an RGBA surface
//! - [`png`]: PNG encoding of the finished image

pub mod config;
pub mod png;
pub mod pool;
pub mod render;
pub mod shading;
pub mod surface;
pub mod tiles;

pub use config::{RenderConfig, ShadingConfig, SplatColor};
pub use pool::{Callback, JobHandler, PoolStats, WorkerPool};
pub use render::{TileRenderer, TileSet};
pub use shading::{Shader, SplatLayer};
pub use surface::RasterSurface;
pub use tiles::{plan_tiles, TileBounds, TileFormat, TileJob, TileOutput, TilePixels, TileShader};
