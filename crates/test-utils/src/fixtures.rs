//! Common test fixtures for map tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Common raster sizes for testing.
pub mod sizes {
    /// Smallest raster that still has distinct neighbours in every direction.
    pub const TINY: usize = 4;

    /// Small enough for exhaustive per-pixel checks.
    pub const SMALL: usize = 16;

    /// World size used by the end-to-end render scenario.
    pub const E2E_WORLD: u32 = 4;

    /// Tile size used by the end-to-end render scenario.
    pub const E2E_TILE: u32 = 2;
}

/// Names of the maps every rendered world needs.
pub mod names {
    pub const HEIGHT: &str = "height";
    pub const SPLAT: &str = "splat";
    pub const WATER: &str = "water";
}

/// A temporary directory that is removed when dropped.
///
/// # Example
///
/// ```
/// use test_utils::TempMapDir;
///
/// let dir = TempMapDir::new();
/// let path = dir.file("world.map");
/// assert!(path.starts_with(dir.path()));
/// ```
pub struct TempMapDir {
    dir: TempDir,
}

impl TempMapDir {
    /// Create a fresh directory. Panics if the OS refuses, which fails the test.
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("map-test-")
            .tempdir()
            .expect("failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the directory; the file is not created.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `bytes` to `name` inside the directory and return its path.
    pub fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.file(name);
        std::fs::write(&path, bytes).expect("failed to write fixture file");
        path
    }
}

impl Default for TempMapDir {
    fn default() -> Self {
        Self::new()
    }
}
