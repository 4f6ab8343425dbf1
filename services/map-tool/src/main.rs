//! Terrain world map tool.
//!
//! Inspects `.map` containers, renders their height and splat layers to PNG
//! and re-encodes them.

mod config;
mod info;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use renderer::{png, TileBounds, TileFormat, TilePixels, TileRenderer, TileSet};
use serde::Serialize;
use terrain_map::{read_map, write_map, write_map_parallel, MapKind, TerrainMap, WorldData};
use tracing::{debug, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{RenderOverrides, RenderSettings};
use info::WorldSummary;

#[derive(Parser, Debug)]
#[command(name = "map-tool")]
#[command(about = "Inspect, render and repack terrain world .map files")]
struct Args {
    /// Log level
    #[arg(long, global = true, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print world size, maps and object counts
    Info {
        /// Input .map file
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the height and splat maps to a PNG
    Render {
        /// Input .map file
        input: PathBuf,

        /// Output PNG path
        #[arg(short, long, default_value = "map.png")]
        output: PathBuf,

        /// Tile side length in pixels
        #[arg(long)]
        tile_size: Option<u32>,

        /// Worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Extra pixels each tile extends past its end
        #[arg(long)]
        edge_fix: Option<u32>,

        /// Shading configuration JSON
        #[arg(long, env = "SHADING_CONFIG")]
        shading: Option<PathBuf>,

        /// Use the legacy palette
        #[arg(long)]
        legacy: bool,

        /// Output alpha in 0-1
        #[arg(long)]
        alpha: Option<f32>,

        /// Also write raw RGB f32 tiles and a manifest to this directory
        #[arg(long)]
        tiles: Option<PathBuf>,

        /// Height map name
        #[arg(long, default_value = "height")]
        height_map: String,

        /// Splat map name
        #[arg(long, default_value = "splat")]
        splat_map: String,
    },

    /// Decode a .map file and encode it again
    Repack {
        input: PathBuf,
        output: PathBuf,

        /// Compress blocks on all cores
        #[arg(long)]
        parallel: bool,

        /// Decode every known raster before writing
        #[arg(long)]
        verify: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    match args.command {
        Command::Info { input, json } => run_info(&input, json),
        Command::Render {
            input,
            output,
            tile_size,
            workers,
            edge_fix,
            shading,
            legacy,
            alpha,
            tiles,
            height_map,
            splat_map,
        } => {
            let settings = RenderSettings::resolve(&RenderOverrides {
                workers,
                tile_size,
                edge_fix,
                shading_file: shading,
                legacy,
                alpha,
            })?;
            run_render(
                &input,
                &output,
                tiles.as_deref(),
                &height_map,
                &splat_map,
                settings,
            )
            .await
        }
        Command::Repack {
            input,
            output,
            parallel,
            verify,
        } => run_repack(&input, &output, parallel, verify),
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load(path: &Path) -> Result<(Vec<u8>, WorldData)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let world = read_map(&bytes).with_context(|| format!("decoding {}", path.display()))?;
    Ok((bytes, world))
}

fn run_info(input: &Path, json: bool) -> Result<()> {
    let (bytes, world) = load(input)?;
    let summary = WorldSummary::from_file_bytes(&bytes, &world)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

async fn run_render(
    input: &Path,
    output: &Path,
    tiles_dir: Option<&Path>,
    height_map: &str,
    splat_map: &str,
    settings: RenderSettings,
) -> Result<()> {
    let started = Instant::now();
    let (_, world) = load(input)?;
    info!(path = %input.display(), size = world.size, maps = world.maps.len(), "world loaded");

    let height = Arc::new(
        world
            .get_map_as_terrain(height_map)
            .with_context(|| format!("height map '{}'", height_map))?,
    );
    let splat = Arc::new(
        world
            .get_map_as_terrain(splat_map)
            .with_context(|| format!("splat map '{}'", splat_map))?,
    );
    drop(world);

    let mut renderer = TileRenderer::new(settings.render.clone())?;
    let image = match tiles_dir {
        Some(dir) => {
            let tiles = renderer
                .render_to_tiles(height, splat, &settings.shading)
                .await?;
            write_tiles(dir, &tiles, &settings)?;
            tiles.assemble_image(settings.shading.alpha)?
        }
        None => renderer.render_image(height, splat, &settings.shading).await?,
    };

    let written = png::write_png_file(output, &image)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(
        path = %output.display(),
        bytes = written,
        width = image.width(),
        height = image.height(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "PNG written"
    );
    Ok(())
}

#[derive(Serialize)]
struct TileManifest<'a> {
    world_size: usize,
    tile_size: u32,
    edge_fix: u32,
    channels: usize,
    tiles: Vec<TileEntry<'a>>,
}

#[derive(Serialize)]
struct TileEntry<'a> {
    file: String,
    bounds: &'a TileBounds,
}

/// One little-endian f32 file per tile plus `manifest.json`.
fn write_tiles(dir: &Path, tiles: &TileSet, settings: &RenderSettings) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut entries = Vec::with_capacity(tiles.len());
    for tile in tiles.tiles() {
        let file = format!("tile-{:04}.f32", tile.bounds.index);
        let bytes: Vec<u8> = match &tile.pixels {
            TilePixels::RgbF32(rgb) => rgb.iter().flat_map(|v| v.to_le_bytes()).collect(),
            TilePixels::Rgba8(buf) => buf.clone(),
        };
        std::fs::write(dir.join(&file), bytes)
            .with_context(|| format!("writing tile {}", file))?;
        entries.push(TileEntry {
            file,
            bounds: &tile.bounds,
        });
    }

    let manifest = TileManifest {
        world_size: tiles.world_size(),
        tile_size: settings.render.tile_size,
        edge_fix: settings.render.edge_fix,
        channels: TileFormat::RgbF32.channels(),
        tiles: entries,
    };
    std::fs::write(dir.join("manifest.json"), serde_json::to_vec_pretty(&manifest)?)?;
    info!(path = %dir.display(), tiles = tiles.len(), "tiles written");
    Ok(())
}

fn run_repack(input: &Path, output: &Path, parallel: bool, verify: bool) -> Result<()> {
    let (bytes, world) = load(input)?;

    if verify {
        for name in world.map_names().filter(|n| MapKind::from_name(n).is_some()) {
            let map: TerrainMap = world
                .get_map_as_terrain(name)
                .with_context(|| format!("map '{}' has an unexpected layout", name))?;
            debug!(map = name, channels = map.channel_count(), "map verified");
        }
    }

    let encoded = if parallel {
        write_map_parallel(&world)
    } else {
        write_map(&world)
    };
    std::fs::write(output, &encoded).with_context(|| format!("writing {}", output.display()))?;

    info!(
        input_bytes = bytes.len(),
        output_bytes = encoded.len(),
        parallel,
        "map repacked"
    );
    Ok(())
}
