//! Render settings resolved from defaults, environment, files and flags.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use renderer::{RenderConfig, ShadingConfig};
use tracing::debug;

/// Command-line overrides for a render. `None` keeps the lower layer.
#[derive(Debug, Clone, Default)]
pub struct RenderOverrides {
    pub workers: Option<usize>,
    pub tile_size: Option<u32>,
    pub edge_fix: Option<u32>,
    pub shading_file: Option<PathBuf>,
    pub legacy: bool,
    pub alpha: Option<f32>,
}

/// Everything a render needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub render: RenderConfig,
    pub shading: ShadingConfig,
}

impl RenderSettings {
    /// Layer defaults, then environment, then a shading file, then flags.
    ///
    /// A shading file replaces the palette wholesale; environment lighting
    /// overrides are applied on top of it.
    pub fn resolve(overrides: &RenderOverrides) -> Result<Self> {
        let mut render = RenderConfig::from_env();
        if let Some(workers) = overrides.workers {
            render.workers = workers;
        }
        if let Some(tile_size) = overrides.tile_size {
            render.tile_size = tile_size;
        }
        if let Some(edge_fix) = overrides.edge_fix {
            render.edge_fix = edge_fix;
        }

        let mut shading = match (&overrides.shading_file, overrides.legacy) {
            (Some(_), true) => bail!("--shading and --legacy are mutually exclusive"),
            (Some(path), false) => ShadingConfig::from_json_file(path)
                .with_context(|| format!("loading shading config {}", path.display()))?,
            (None, true) => ShadingConfig::legacy(),
            (None, false) => ShadingConfig::default(),
        };
        shading.apply_env();
        if let Some(alpha) = overrides.alpha {
            shading.alpha = alpha;
        }

        let settings = Self { render, shading };
        settings.validate()?;
        debug!(
            workers = settings.render.workers,
            tile_size = settings.render.tile_size,
            edge_fix = settings.render.edge_fix,
            legacy = overrides.legacy,
            "resolved render settings"
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.render
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid render config: {}", e))?;
        self.shading
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid shading config: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::TempMapDir;

    #[test]
    fn test_flags_override_defaults() {
        let settings = RenderSettings::resolve(&RenderOverrides {
            workers: Some(2),
            tile_size: Some(64),
            edge_fix: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.render.workers, 2);
        assert_eq!(settings.render.tile_size, 64);
        assert_eq!(settings.render.edge_fix, 1);
    }

    #[test]
    fn test_legacy_and_file_conflict() {
        let dir = TempMapDir::new();
        let path = dir.write("shading.json", b"{}");
        let err = RenderSettings::resolve(&RenderOverrides {
            shading_file: Some(path),
            legacy: true,
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_shading_file_is_loaded() {
        let dir = TempMapDir::new();
        let path = dir.write("shading.json", br#"{"contrast": 1.25}"#);
        let settings = RenderSettings::resolve(&RenderOverrides {
            shading_file: Some(path),
            workers: Some(1),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.shading.contrast, 1.25);
    }

    #[test]
    fn test_invalid_alpha_is_rejected() {
        let result = RenderSettings::resolve(&RenderOverrides {
            workers: Some(1),
            alpha: Some(3.0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_tile_size_is_rejected() {
        let result = RenderSettings::resolve(&RenderOverrides {
            workers: Some(1),
            tile_size: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
