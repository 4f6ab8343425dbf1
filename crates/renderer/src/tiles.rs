//! Tile planning and the per-tile shading job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terrain_map::TerrainMap;
use world_common::{JobError, Point2, WorldError, WorldResult};

use crate::pool::JobHandler;
use crate::shading::Shader;

/// Splat channels the shader reads.
pub const SPLAT_CHANNELS: usize = 8;

/// A half-open rectangle `[start, end)` of the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBounds {
    /// Row-major tile position.
    pub index: usize,
    pub start: Point2,
    pub end: Point2,
}

impl TileBounds {
    pub fn size(&self) -> Point2 {
        self.end.saturating_sub(self.start)
    }

    /// Pixels covered by the tile.
    pub fn area(&self) -> usize {
        self.size().area()
    }
}

/// Cut a `world_size × world_size` raster into square tiles.
///
/// Tiles are indexed row-major over the tile grid, `x` outer. Each tile
/// reaches `edge_fix` pixels past its nominal end but never past the raster.
pub fn plan_tiles(world_size: u32, tile_size: u32, edge_fix: u32) -> WorldResult<Vec<TileBounds>> {
    if tile_size == 0 {
        return Err(WorldError::config("tile_size must be > 0"));
    }

    let per_side = world_size.div_ceil(tile_size);
    let mut tiles = Vec::with_capacity(per_side as usize * per_side as usize);
    for tx in 0..per_side {
        for ty in 0..per_side {
            let start = Point2::new(tx * tile_size, ty * tile_size);
            let reach = tile_size.saturating_add(edge_fix);
            let end = Point2::new(
                start.x.saturating_add(reach).min(world_size),
                start.y.saturating_add(reach).min(world_size),
            );
            tiles.push(TileBounds {
                index: tiles.len(),
                start,
                end,
            });
        }
    }
    Ok(tiles)
}

/// Pixel format a tile job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileFormat {
    /// Final 8-bit RGBA.
    Rgba8,
    /// Unclamped linear RGB, for assembling later.
    RgbF32,
}

impl TileFormat {
    pub fn channels(&self) -> usize {
        match self {
            TileFormat::Rgba8 => 4,
            TileFormat::RgbF32 => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TilePixels {
    Rgba8(Vec<u8>),
    RgbF32(Vec<f32>),
}

impl TilePixels {
    pub fn format(&self) -> TileFormat {
        match self {
            TilePixels::Rgba8(_) => TileFormat::Rgba8,
            TilePixels::RgbF32(_) => TileFormat::RgbF32,
        }
    }
}

/// A shaded tile. Pixels are stored with `x` as the row:
/// pixel `(x, y)` sits at `((x - start.x) * size.y + (y - start.y)) * channels`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileOutput {
    pub bounds: TileBounds,
    pub pixels: TilePixels,
}

/// One tile of work with shared read-only inputs.
#[derive(Debug, Clone)]
pub struct TileJob {
    pub bounds: TileBounds,
    pub format: TileFormat,
    pub height: Arc<TerrainMap>,
    pub splat: Arc<TerrainMap>,
    pub shader: Arc<Shader>,
}

impl TileJob {
    fn check(&self) -> Result<(), JobError> {
        let size = self.height.world_size();
        let end = self.bounds.end;
        if end.x as usize > size || end.y as usize > size || self.splat.world_size() != size {
            return Err(JobError::Failed(format!(
                "tile {} ends at {} outside a {} raster",
                self.bounds.index, end, size
            )));
        }
        if self.height.channel_count() == 0 || self.splat.channel_count() < SPLAT_CHANNELS {
            return Err(JobError::Failed(format!(
                "tile {} needs 1 height and {} splat channels, got {} and {}",
                self.bounds.index,
                SPLAT_CHANNELS,
                self.height.channel_count(),
                self.splat.channel_count()
            )));
        }
        Ok(())
    }
}

/// Shades [`TileJob`]s on pool threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileShader;

impl JobHandler for TileShader {
    type Job = TileJob;
    type Output = TileOutput;

    fn handle(&self, job: TileJob) -> Result<TileOutput, JobError> {
        job.check()?;

        let TileBounds { start, end, .. } = job.bounds;
        let (height, splat, shader) = (&*job.height, &*job.splat, &*job.shader);
        let xs = start.x as usize..end.x as usize;
        let ys = start.y as usize..end.y as usize;

        let pixels = match job.format {
            TileFormat::Rgba8 => {
                let mut buf = Vec::with_capacity(job.bounds.area() * 4);
                for x in xs {
                    for y in ys.clone() {
                        buf.extend_from_slice(&shader.shade_rgba(height, splat, x, y));
                    }
                }
                TilePixels::Rgba8(buf)
            }
            TileFormat::RgbF32 => {
                let mut buf = Vec::with_capacity(job.bounds.area() * 3);
                for x in xs {
                    for y in ys.clone() {
                        buf.extend_from_slice(shader.shade(height, splat, x, y).as_slice());
                    }
                }
                TilePixels::RgbF32(buf)
            }
        };

        Ok(TileOutput {
            bounds: job.bounds,
            pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShadingConfig;
    use terrain_map::ElementType;

    #[test]
    fn test_plan_even_split() {
        let tiles = plan_tiles(4, 2, 0).unwrap();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[1].start, Point2::new(0, 2));
        assert_eq!(tiles[2].start, Point2::new(2, 0));
        assert!(tiles.iter().all(|t| t.size() == Point2::new(2, 2)));
        assert!(tiles.iter().enumerate().all(|(i, t)| t.index == i));
    }

    #[test]
    fn test_plan_ragged_edge() {
        let tiles = plan_tiles(5, 2, 0).unwrap();
        assert_eq!(tiles.len(), 9);
        assert_eq!(tiles[8].start, Point2::new(4, 4));
        assert_eq!(tiles[8].end, Point2::new(5, 5));
        let covered: usize = tiles.iter().map(TileBounds::area).sum();
        assert_eq!(covered, 25);
    }

    #[test]
    fn test_plan_edge_fix_is_clamped() {
        let tiles = plan_tiles(4, 2, 1).unwrap();
        assert_eq!(tiles[0].end, Point2::new(3, 3));
        assert_eq!(tiles[3].end, Point2::new(4, 4));
    }

    #[test]
    fn test_plan_rejects_zero_tile() {
        assert!(plan_tiles(4, 0, 0).is_err());
    }

    fn job(format: TileFormat, bounds: TileBounds) -> TileJob {
        let mut height = TerrainMap::empty(1, ElementType::Short, 4, 4).unwrap();
        for x in 0..4 {
            for y in 0..4 {
                height.set(x, y, 0, 40000 + (x * 4 + y) as u32);
            }
        }
        TileJob {
            bounds,
            format,
            height: Arc::new(height),
            splat: Arc::new(TerrainMap::empty(8, ElementType::Byte, 4, 4).unwrap()),
            shader: Arc::new(Shader::new(&ShadingConfig::default())),
        }
    }

    #[test]
    fn test_tile_layout_is_x_major() {
        let bounds = plan_tiles(4, 2, 0).unwrap()[1];
        let job = job(TileFormat::Rgba8, bounds);
        let expected = job.shader.shade_rgba(&job.height, &job.splat, 1, 2);

        let out = TileShader.handle(job).unwrap();
        let TilePixels::Rgba8(buf) = out.pixels else {
            panic!("expected RGBA8 tile");
        };
        assert_eq!(buf.len(), 16);
        // (x=1, y=2) is row 1, column 0 of a 2-wide tile
        let offset = 2 * 4;
        assert_eq!(&buf[offset..offset + 4], &expected);
    }

    #[test]
    fn test_f32_tile_has_three_channels() {
        let bounds = plan_tiles(4, 4, 0).unwrap()[0];
        let out = TileShader.handle(job(TileFormat::RgbF32, bounds)).unwrap();
        match out.pixels {
            TilePixels::RgbF32(buf) => assert_eq!(buf.len(), 16 * 3),
            other => panic!("unexpected pixels: {:?}", other.format()),
        }
    }

    #[test]
    fn test_out_of_range_tile_fails() {
        let bounds = TileBounds {
            index: 0,
            start: Point2::ZERO,
            end: Point2::new(8, 8),
        };
        assert!(matches!(
            TileShader.handle(job(TileFormat::Rgba8, bounds)),
            Err(JobError::Failed(_))
        ));
    }
}
