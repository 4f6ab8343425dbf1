//! Terrain world maps.
//!
//! A `.map` file is a 4-byte version header and an LZ4 chunk stream whose
//! payload is a protobuf [`WorldData`]. Each named map inside it is a
//! channel-major raster blob that [`TerrainMap`] reinterprets as typed
//! channels at the world's resolution.
//!
//! ```text
//! file bytes ─► ChunkReader ─► WorldData ─► MapData("height") ─► TerrainMap
//! ```
//!
//! # Example
//!
//! ```
//! use terrain_map::{read_map, write_map, MapKind, WorldData};
//!
//! let mut world = WorldData::with_size(16);
//! let mut height = world.create_empty_terrain_map(MapKind::Height, Some(16)).unwrap();
//! height.set_normalized(3, 4, 0, 0.5);
//! world.set_map("height", &height);
//!
//! let decoded = read_map(&write_map(&world)).unwrap();
//! let restored = decoded.get_map_as_terrain("height").unwrap();
//! assert_eq!(restored.get(3, 4, 0), 32767);
//! ```

pub mod container;
pub mod element;
pub mod map;
pub mod resample;
pub mod schema;
pub mod world;

pub use container::{
    map_version, read_map, read_map_file, write_map, write_map_file, write_map_parallel,
    HEADER_LEN, MAP_VERSION,
};
pub use element::{ChannelData, ElementType};
pub use map::{RasterView, TerrainMap};
pub use resample::resample;
pub use schema::{MapData, PathData, PrefabData, VectorData, WorldData};
pub use world::MapKind;
