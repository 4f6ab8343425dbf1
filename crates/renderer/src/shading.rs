//! Per-pixel terrain colouring.

use nalgebra::Vector3;
use terrain_map::TerrainMap;

use crate::config::{ShadingConfig, SplatColor};

/// Splat map channels and the order they are blended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplatLayer {
    Dirt = 0,
    Snow = 1,
    Sand = 2,
    Rock = 3,
    Grass = 4,
    Forest = 5,
    Pebble = 6,
    Gravel = 7,
}

impl SplatLayer {
    /// Later layers paint over earlier ones.
    pub const BLEND_ORDER: [SplatLayer; 8] = [
        SplatLayer::Gravel,
        SplatLayer::Pebble,
        SplatLayer::Rock,
        SplatLayer::Dirt,
        SplatLayer::Grass,
        SplatLayer::Forest,
        SplatLayer::Sand,
        SplatLayer::Snow,
    ];

    pub fn channel(&self) -> usize {
        *self as usize
    }

    fn material(&self, config: &ShadingConfig) -> SplatColor {
        match self {
            SplatLayer::Dirt => config.dirt,
            SplatLayer::Snow => config.snow,
            SplatLayer::Sand => config.sand,
            SplatLayer::Rock => config.rock,
            SplatLayer::Grass => config.grass,
            SplatLayer::Forest => config.forest,
            SplatLayer::Pebble => config.pebble,
            SplatLayer::Gravel => config.gravel,
        }
    }
}

/// A [`ShadingConfig`] resolved into vectors, built once per tile.
#[derive(Debug, Clone)]
pub struct Shader {
    start: Vector3<f32>,
    water: Vector3<f32>,
    off_shore: Vector3<f32>,
    layers: [(usize, Vector3<f32>, f32); 8],
    sun_direction: Vector3<f32>,
    sun_power: f32,
    brightness: f32,
    contrast: f32,
    water_level: f32,
    height_scale: f32,
    height_offset: f32,
    alpha: u8,
}

impl Shader {
    pub fn new(config: &ShadingConfig) -> Self {
        let layers = SplatLayer::BLEND_ORDER.map(|layer| {
            let material = layer.material(config);
            (layer.channel(), Vector3::from(material.color), material.weight)
        });

        Self {
            start: Vector3::from(config.start_color),
            water: Vector3::from(config.water_color),
            off_shore: Vector3::from(config.off_shore_color),
            layers,
            sun_direction: Vector3::from(config.sun_direction)
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros),
            sun_power: config.sun_power,
            brightness: config.brightness,
            contrast: config.contrast,
            water_level: config.ocean_water_level,
            height_scale: config.height_scale,
            height_offset: config.height_offset,
            alpha: to_u8(config.alpha),
        }
    }

    /// Output alpha for every pixel.
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Terrain height in metres at `(x, y)`.
    pub fn height_metres(&self, height: &TerrainMap, x: usize, y: usize) -> f32 {
        height.get_normalized(x, y, 0) * self.height_scale + self.height_offset
    }

    /// Linear RGB of one pixel, before 8-bit conversion.
    ///
    /// Values can leave `[0, 1]` after lighting and contrast.
    pub fn shade(&self, height: &TerrainMap, splat: &TerrainMap, x: usize, y: usize) -> Vector3<f32> {
        let mut pixel = self.start;
        for &(channel, color, weight) in &self.layers {
            let t = splat.get_normalized(x, y, channel) * weight;
            pixel = pixel.lerp(&color, t.clamp(0.0, 1.0));
        }

        let terrain_height = self.height_metres(height, x, y);
        let sun = if terrain_height < self.water_level {
            let depth = self.water_level - terrain_height;
            pixel = pixel.lerp(&self.water, (0.5 + depth / 5.0).clamp(0.0, 1.0));
            pixel = pixel.lerp(&self.off_shore, (depth / 50.0).clamp(0.0, 1.0));
            self.sun_power
        } else {
            height.get_normal(x, y, 0).dot(&self.sun_direction).max(0.0)
        };

        pixel += pixel * ((sun - self.sun_power) * self.sun_power);
        pixel = pixel.map(|c| (c - 0.5) * self.contrast + 0.5);
        pixel * self.brightness
    }

    /// [`Shader::shade`] converted to RGBA8.
    pub fn shade_rgba(&self, height: &TerrainMap, splat: &TerrainMap, x: usize, y: usize) -> [u8; 4] {
        let rgb = self.shade(height, splat, x, y);
        [to_u8(rgb.x), to_u8(rgb.y), to_u8(rgb.z), self.alpha]
    }
}

/// Scale a `[0, 1]` component to a byte, saturating out-of-range values and
/// truncating the fraction.
#[inline]
pub fn to_u8(value: f32) -> u8 {
    (value * 255.0) as u8
}
