//! Tile-parallel terrain rendering.

use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use terrain_map::TerrainMap;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info, warn};
use world_common::{JobError, WorldError, WorldResult};

use crate::config::{RenderConfig, ShadingConfig};
use crate::pool::{PoolStats, WorkerPool};
use crate::shading::{to_u8, Shader};
use crate::surface::RasterSurface;
use crate::tiles::{plan_tiles, TileBounds, TileFormat, TileJob, TileOutput, TilePixels, TileShader, SPLAT_CHANNELS};

/// Splits a world into tiles and shades them on a [`WorkerPool`].
pub struct TileRenderer {
    pool: WorkerPool<TileShader>,
    config: RenderConfig,
}

impl TileRenderer {
    pub fn new(config: RenderConfig) -> WorldResult<Self> {
        config.validate().map_err(WorldError::config)?;
        let pool = WorkerPool::new(TileShader, config.workers)?;
        Ok(Self { pool, config })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Shade every tile as RGBA8 and paint it into `surface` as it arrives.
    ///
    /// Store `x` maps to surface rows and `y` to columns. Returns the number
    /// of tiles painted.
    pub async fn render_to_image<S: RasterSurface>(
        &mut self,
        height: Arc<TerrainMap>,
        splat: Arc<TerrainMap>,
        shading: &ShadingConfig,
        surface: &mut S,
    ) -> WorldResult<usize> {
        self.run(height, splat, shading, TileFormat::Rgba8, |tile| match tile.pixels {
            TilePixels::Rgba8(buf) => paint(surface, &tile.bounds, &buf),
            TilePixels::RgbF32(_) => Err(WorldError::Render(format!(
                "tile {} came back as f32",
                tile.bounds.index
            ))),
        })
        .await
    }

    /// Render into a new `world_size × world_size` image.
    pub async fn render_image(
        &mut self,
        height: Arc<TerrainMap>,
        splat: Arc<TerrainMap>,
        shading: &ShadingConfig,
    ) -> WorldResult<RgbaImage> {
        let side = u32::try_from(height.world_size())
            .map_err(|_| WorldError::Render("world is too large for an image".to_string()))?;
        let mut image = RgbaImage::new(side, side);
        self.render_to_image(height, splat, shading, &mut image).await?;
        Ok(image)
    }

    /// Shade every tile as unclamped RGB f32 and keep the tiles for later
    /// assembly.
    pub async fn render_to_tiles(
        &mut self,
        height: Arc<TerrainMap>,
        splat: Arc<TerrainMap>,
        shading: &ShadingConfig,
    ) -> WorldResult<TileSet> {
        let world_size = height.world_size();
        let mut slots: Vec<Option<TileOutput>> = Vec::new();

        self.run(height, splat, shading, TileFormat::RgbF32, |tile| {
            let index = tile.bounds.index;
            if slots.len() <= index {
                slots.resize(index + 1, None);
            }
            slots[index] = Some(tile);
            Ok(())
        })
        .await?;

        let tiles = slots
            .into_iter()
            .enumerate()
            .map(|(index, tile)| {
                tile.ok_or_else(|| WorldError::Render(format!("tile {} never arrived", index)))
            })
            .collect::<WorldResult<Vec<_>>>()?;

        Ok(TileSet { world_size, tiles })
    }

    /// Plan tiles, submit one job per tile and hand each finished tile to
    /// `on_tile`.
    ///
    /// The first failure, from a job or from `on_tile`, cancels every tile
    /// still queued and is returned once the tiles already running finish.
    async fn run<F>(
        &mut self,
        height: Arc<TerrainMap>,
        splat: Arc<TerrainMap>,
        shading: &ShadingConfig,
        format: TileFormat,
        mut on_tile: F,
    ) -> WorldResult<usize>
    where
        F: FnMut(TileOutput) -> WorldResult<()>,
    {
        let started = Instant::now();
        shading.validate().map_err(WorldError::config)?;
        check_inputs(&height, &splat)?;

        let world_size = u32::try_from(height.world_size())
            .map_err(|_| WorldError::Render("world is too large to tile".to_string()))?;
        let tiles = plan_tiles(world_size, self.config.tile_size, self.config.edge_fix)?;
        let shader = Arc::new(Shader::new(shading));
        let submitted = tiles.len();

        debug!(
            world_size,
            tile_size = self.config.tile_size,
            edge_fix = self.config.edge_fix,
            tiles = submitted,
            workers = self.pool.worker_count(),
            ?format,
            "submitting tiles"
        );

        let (tx, mut rx) = unbounded_channel::<(usize, Result<TileOutput, JobError>)>();
        let mut failure: Option<WorldError> = None;

        for bounds in tiles {
            let job = TileJob {
                bounds,
                format,
                height: Arc::clone(&height),
                splat: Arc::clone(&splat),
                shader: Arc::clone(&shader),
            };
            let tx = tx.clone();
            let index = bounds.index;
            if let Err(err) = self.pool.enqueue(job, move |result| {
                // The receiver outlives every job of this render.
                let _ = tx.send((index, result));
            }) {
                failure = Some(err);
                break;
            }
        }
        drop(tx);

        let mut painted = 0usize;
        loop {
            let progressed = self.pool.next_completion().await;

            while let Ok((index, result)) = rx.try_recv() {
                if failure.is_some() {
                    continue;
                }
                let err = match result {
                    Ok(tile) => match on_tile(tile) {
                        Ok(()) => {
                            painted += 1;
                            continue;
                        }
                        Err(err) => err,
                    },
                    Err(reason) => WorldError::JobFailed { index, reason },
                };
                let cancelled = self.pool.cancel_queued();
                warn!(index, error = %err, cancelled, "tile failed, waiting for tiles in flight");
                failure = Some(err);
            }

            if !progressed {
                break;
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        if painted != submitted {
            return Err(WorldError::Render(format!(
                "{} of {} tiles completed",
                painted, submitted
            )));
        }

        info!(
            world_size,
            tiles = painted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "render complete"
        );
        Ok(painted)
    }
}

/// RGB f32 tiles kept in tile-index order.
#[derive(Debug, Clone)]
pub struct TileSet {
    world_size: usize,
    tiles: Vec<TileOutput>,
}

impl TileSet {
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TileOutput> {
        self.tiles.get(index)
    }

    pub fn tiles(&self) -> &[TileOutput] {
        &self.tiles
    }

    /// Convert every tile to RGBA8 with the given alpha and paint it.
    pub fn assemble<S: RasterSurface>(&self, alpha: f32, surface: &mut S) -> WorldResult<()> {
        let alpha = to_u8(alpha);
        for tile in &self.tiles {
            let rgba = match &tile.pixels {
                TilePixels::RgbF32(rgb) => rgb
                    .chunks_exact(3)
                    .flat_map(|p| [to_u8(p[0]), to_u8(p[1]), to_u8(p[2]), alpha])
                    .collect::<Vec<u8>>(),
                TilePixels::Rgba8(buf) => buf.clone(),
            };
            paint(surface, &tile.bounds, &rgba)?;
        }
        Ok(())
    }

    /// Assemble into a new `world_size × world_size` image.
    pub fn assemble_image(&self, alpha: f32) -> WorldResult<RgbaImage> {
        let side = u32::try_from(self.world_size)
            .map_err(|_| WorldError::Render("world is too large for an image".to_string()))?;
        let mut image = RgbaImage::new(side, side);
        self.assemble(alpha, &mut image)?;
        Ok(image)
    }
}

/// A tile's rows run along store `x`, so `start.y` is the column.
fn paint<S: RasterSurface>(surface: &mut S, bounds: &TileBounds, rgba: &[u8]) -> WorldResult<()> {
    let size = bounds.size();
    surface.put_pixels(rgba, bounds.start.y, bounds.start.x, size.y, size.x)
}

fn check_inputs(height: &TerrainMap, splat: &TerrainMap) -> WorldResult<()> {
    if height.world_size() != splat.world_size() {
        return Err(WorldError::raster_shape(format!(
            "height is {} wide but splat is {}",
            height.world_size(),
            splat.world_size()
        )));
    }
    if height.channel_count() == 0 {
        return Err(WorldError::raster_shape("height map has no channels"));
    }
    if splat.channel_count() < SPLAT_CHANNELS {
        return Err(WorldError::raster_shape(format!(
            "splat map has {} channels, {} needed",
            splat.channel_count(),
            SPLAT_CHANNELS
        )));
    }
    Ok(())
}
