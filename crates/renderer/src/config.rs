//! Shading and render configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use world_common::{WorldError, WorldResult};

/// A splat material colour and how strongly it blends in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplatColor {
    pub color: [f32; 3],
    /// Multiplier on the splat weight before blending.
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl SplatColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            color: [r, g, b],
            weight: 1.0,
        }
    }

    pub const fn weighted(r: f32, g: f32, b: f32, weight: f32) -> Self {
        Self {
            color: [r, g, b],
            weight,
        }
    }
}

/// Palette and lighting used to colour terrain.
///
/// Colours are linear RGB in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    pub start_color: [f32; 3],
    pub water_color: [f32; 3],
    pub off_shore_color: [f32; 3],

    pub gravel: SplatColor,
    pub dirt: SplatColor,
    pub sand: SplatColor,
    pub grass: SplatColor,
    pub forest: SplatColor,
    pub rock: SplatColor,
    pub snow: SplatColor,
    pub pebble: SplatColor,

    /// Direction towards the sun; normalised before use.
    pub sun_direction: [f32; 3],
    pub sun_power: f32,
    pub brightness: f32,
    pub contrast: f32,

    /// Sea level in metres.
    pub ocean_water_level: f32,
    /// Metres spanned by the full range of the height map.
    pub height_scale: f32,
    /// Metres at height value zero.
    pub height_offset: f32,

    /// Output alpha in `[0, 1]`.
    pub alpha: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            start_color: [0.286274523, 0.270588249, 0.247058839],
            water_color: [0.16941601, 0.317557573, 0.362000018],
            off_shore_color: [0.04090196, 0.220600322, 0.274509817],
            gravel: SplatColor::new(0.25, 0.243421048, 0.220394745),
            dirt: SplatColor::new(0.6, 0.479594618, 0.33),
            sand: SplatColor::new(0.7, 0.65968585, 0.5277487),
            grass: SplatColor::new(0.354863644, 0.37, 0.2035),
            forest: SplatColor::new(0.248437509, 0.3, 0.0703125),
            rock: SplatColor::new(0.4, 0.393798441, 0.375193775),
            snow: SplatColor::new(0.862745166, 0.9294118, 0.941176534),
            pebble: SplatColor::new(0.137254909, 0.2784314, 0.2761563),
            sun_direction: [0.95, 2.87, 2.37],
            sun_power: 0.65,
            brightness: 1.05,
            contrast: 0.94,
            ocean_water_level: 0.0,
            height_scale: 1000.0,
            height_offset: -500.0,
            alpha: 1.0,
        }
    }
}

impl ShadingConfig {
    /// The older, greener palette.
    pub fn legacy() -> Self {
        Self {
            start_color: [0.324313372, 0.397058845, 0.195609868],
            water_color: [0.269668937, 0.4205476, 0.5660378],
            off_shore_color: [0.166295841, 0.259337664, 0.3490566],
            gravel: SplatColor::weighted(0.139705867, 0.132621378, 0.114024632, 0.372),
            dirt: SplatColor::new(0.322227329, 0.375, 0.228860289),
            sand: SplatColor::new(1.0, 0.8250507, 0.448529422),
            grass: SplatColor::new(0.4509804, 0.5529412, 0.270588249),
            forest: SplatColor::new(0.5529412, 0.440000027, 0.270588249),
            rock: SplatColor::new(0.42344287, 0.4852941, 0.314013839),
            snow: SplatColor::new(0.8088235, 0.8088235, 0.8088235),
            pebble: SplatColor::new(0.121568628, 0.419607848, 0.627451),
            sun_power: 0.5,
            brightness: 1.0,
            contrast: 0.87,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override lighting fields from `SUN_POWER`, `BRIGHTNESS`, `CONTRAST`
    /// and `OCEAN_WATER_LEVEL`. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_f32("SUN_POWER") {
            self.sun_power = v;
        }
        if let Some(v) = env_f32("BRIGHTNESS") {
            self.brightness = v;
        }
        if let Some(v) = env_f32("CONTRAST") {
            self.contrast = v;
        }
        if let Some(v) = env_f32("OCEAN_WATER_LEVEL") {
            self.ocean_water_level = v;
        }
    }

    /// Parse a JSON document. Missing fields take their default.
    pub fn from_json(json: &str) -> WorldResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WorldError::config(format!("shading JSON: {}", e)))?;
        config.validate().map_err(WorldError::config)?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> WorldResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let direction = self.sun_direction;
        if direction.iter().all(|c| *c == 0.0) {
            return Err("sun_direction must not be the zero vector".to_string());
        }

        let scalars = [
            ("sun_power", self.sun_power),
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("ocean_water_level", self.ocean_water_level),
            ("height_scale", self.height_scale),
            ("height_offset", self.height_offset),
            ("alpha", self.alpha),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{} must be finite", name));
        }

        if !(0.0..=1.0).contains(&self.alpha) {
            return Err("alpha must be within 0-1".to_string());
        }

        if self.height_scale <= 0.0 {
            return Err("height_scale must be > 0".to_string());
        }

        Ok(())
    }
}

/// How a world is cut into tiles and how many threads shade them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Worker threads in the pool.
    pub workers: usize,
    /// Side length of a tile in pixels.
    pub tile_size: u32,
    /// Extra pixels each tile extends past its nominal end.
    pub edge_fix: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            tile_size: 512,
            edge_fix: 0,
        }
    }
}

impl RenderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RENDER_WORKERS") {
            if let Ok(workers) = val.parse() {
                config.workers = workers;
            }
        }

        if let Ok(val) = std::env::var("RENDER_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                config.tile_size = size;
            }
        }

        if let Ok(val) = std::env::var("RENDER_EDGE_FIX") {
            if let Ok(fix) = val.parse() {
                config.edge_fix = fix;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be > 0".to_string());
        }

        if self.tile_size == 0 {
            return Err("tile_size must be > 0".to_string());
        }

        Ok(())
    }
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(ShadingConfig::default().validate().is_ok());
        assert!(ShadingConfig::legacy().validate().is_ok());
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_legacy_palette() {
        let legacy = ShadingConfig::legacy();
        assert_eq!(legacy.gravel.weight, 0.372);
        assert_eq!(legacy.contrast, 0.87);
        assert_eq!(legacy.sun_direction, ShadingConfig::default().sun_direction);
    }

    #[test]
    fn test_json_partial_override() {
        let config = ShadingConfig::from_json(r#"{"sun_power": 0.3, "snow": {"color": [1, 1, 1]}}"#)
            .unwrap();
        assert_eq!(config.sun_power, 0.3);
        assert_eq!(config.snow.weight, 1.0);
        assert_eq!(config.brightness, ShadingConfig::default().brightness);
    }

    #[test]
    fn test_json_rejects_invalid() {
        assert!(matches!(
            ShadingConfig::from_json(r#"{"alpha": 2.0}"#),
            Err(WorldError::InvalidConfig(_))
        ));
        assert!(ShadingConfig::from_json("not json").is_err());
        assert!(ShadingConfig::from_json(r#"{"sun_direction": [0, 0, 0]}"#).is_err());
    }

    #[test]
    fn test_render_config_validation() {
        let config = RenderConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RenderConfig {
            tile_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
