//! Benchmarks for terrain shading, tiled rendering and PNG encoding.
//!
//! Run with: cargo bench --package renderer --bench render_benchmarks

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use renderer::{
    png, plan_tiles, JobHandler, RenderConfig, Shader, ShadingConfig, TileFormat, TileJob,
    TileRenderer, TileShader,
};
use terrain_map::{ElementType, TerrainMap};
use test_utils::{create_u16_raster, create_u8_raster};

/// Rolling hills with a sea in one corner.
fn generate_height(size: usize) -> Arc<TerrainMap> {
    let blob = create_u16_raster(size, 1, |_, row, col| {
        let fx = row as f32 / size as f32;
        let fy = col as f32 / size as f32;
        let hills = ((fx * 12.0).sin() + (fy * 9.0).cos()) * 0.05;
        ((0.45 + fx * 0.2 + hills).clamp(0.0, 1.0) * u16::MAX as f32) as u16
    });
    Arc::new(TerrainMap::new(&blob, 1, ElementType::Short, size).unwrap())
}

/// Material bands so every splat channel is hit.
fn generate_splat(size: usize) -> Arc<TerrainMap> {
    let blob = create_u8_raster(size, 8, |channel, row, col| {
        if (row / 8 + col / 8) % 8 == channel {
            200
        } else {
            7
        }
    });
    Arc::new(TerrainMap::new(&blob, 8, ElementType::Byte, size).unwrap())
}

// =============================================================================
// SHADING BENCHMARKS
// =============================================================================

fn bench_tile_shading(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_shading");
    let size = 256;
    let height = generate_height(size);
    let splat = generate_splat(size);
    let shader = Arc::new(Shader::new(&ShadingConfig::default()));
    let bounds = plan_tiles(size as u32, size as u32, 0).unwrap()[0];
    group.throughput(Throughput::Elements((size * size) as u64));

    for format in [TileFormat::Rgba8, TileFormat::RgbF32] {
        group.bench_with_input(
            BenchmarkId::new("handle", format!("{:?}", format)),
            &format,
            |b, &format| {
                b.iter(|| {
                    let job = TileJob {
                        bounds,
                        format,
                        height: Arc::clone(&height),
                        splat: Arc::clone(&splat),
                        shader: Arc::clone(&shader),
                    };
                    TileShader.handle(black_box(job)).unwrap()
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// RENDER BENCHMARKS
// =============================================================================

fn bench_render_image(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_image");
    group.sample_size(10);
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let shading = ShadingConfig::default();

    for size in [256usize, 512] {
        let height = generate_height(size);
        let splat = generate_splat(size);
        group.throughput(Throughput::Elements((size * size) as u64));

        for tile_size in [64u32, 256] {
            let mut renderer = TileRenderer::new(RenderConfig {
                tile_size,
                ..Default::default()
            })
            .unwrap();

            group.bench_function(BenchmarkId::new(format!("{}px", size), tile_size), |b| {
                b.iter(|| {
                    runtime
                        .block_on(renderer.render_image(
                            Arc::clone(&height),
                            Arc::clone(&splat),
                            &shading,
                        ))
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

// =============================================================================
// PNG BENCHMARKS
// =============================================================================

fn bench_png_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encode");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let size = 512;
    let mut renderer = TileRenderer::new(RenderConfig::default()).unwrap();
    let image = runtime
        .block_on(renderer.render_image(
            generate_height(size),
            generate_splat(size),
            &ShadingConfig::default(),
        ))
        .unwrap();
    group.throughput(Throughput::Bytes(image.as_raw().len() as u64));

    group.bench_function("terrain_512", |b| {
        b.iter(|| png::encode_image(black_box(&image)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_tile_shading, bench_render_image, bench_png_encode);
criterion_main!(benches);
