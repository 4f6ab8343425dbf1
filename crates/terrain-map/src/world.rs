//! World-level helpers over decoded [`WorldData`].

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use world_common::{WorldError, WorldResult};

use crate::element::ElementType;
use crate::map::TerrainMap;
use crate::schema::{MapData, WorldData};

/// Raster kinds with a fixed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    Terrain,
    Height,
    Water,
    Splat,
    Topology,
    Biome,
    Alpha,
}

impl MapKind {
    pub const ALL: [MapKind; 7] = [
        MapKind::Terrain,
        MapKind::Height,
        MapKind::Water,
        MapKind::Splat,
        MapKind::Topology,
        MapKind::Biome,
        MapKind::Alpha,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MapKind::Terrain => "terrain",
            MapKind::Height => "height",
            MapKind::Water => "water",
            MapKind::Splat => "splat",
            MapKind::Topology => "topology",
            MapKind::Biome => "biome",
            MapKind::Alpha => "alpha",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            MapKind::Terrain | MapKind::Height | MapKind::Water => ElementType::Short,
            MapKind::Splat | MapKind::Biome | MapKind::Alpha => ElementType::Byte,
            MapKind::Topology => ElementType::Int,
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            MapKind::Splat => 8,
            MapKind::Biome => 4,
            _ => 1,
        }
    }

    /// Height-like rasters are sampled at `2^n + 1`.
    pub fn is_height_like(&self) -> bool {
        matches!(self, MapKind::Terrain | MapKind::Height | MapKind::Water)
    }

    /// Resolution a freshly created raster of this kind gets in a world of
    /// `world_size`.
    pub fn default_resolution(&self, world_size: u32) -> usize {
        if self.is_height_like() {
            if world_size < 3072 {
                2049
            } else {
                4097
            }
        } else if world_size <= 2048 {
            1024
        } else {
            2048
        }
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MapKind {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| WorldError::UnknownMap(s.to_string()))
    }
}

impl WorldData {
    /// An empty world of the given size.
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// The first map named `name`.
    pub fn map(&self, name: &str) -> Option<&MapData> {
        self.maps.iter().find(|m| m.name == name)
    }

    pub fn map_names(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|m| m.name.as_str())
    }

    /// Decode a known map kind at world resolution.
    pub fn get_map_as_terrain(&self, name: &str) -> WorldResult<TerrainMap> {
        let kind = MapKind::from_name(name).ok_or_else(|| {
            WorldError::UnknownMap(format!("'{}' has no known layout", name))
        })?;
        self.get_map_as_terrain_with(name, kind.channels(), kind.element_type())
    }

    /// Decode any map with an explicit layout.
    pub fn get_map_as_terrain_with(
        &self,
        name: &str,
        channels: usize,
        element_type: ElementType,
    ) -> WorldResult<TerrainMap> {
        let map = self
            .map(name)
            .ok_or_else(|| WorldError::UnknownMap(name.to_string()))?;
        self.decode(map, channels, element_type)
    }

    /// Decode the map stored at position `index`, using the layout its name
    /// implies.
    pub fn get_map_as_terrain_at(&self, index: usize) -> WorldResult<TerrainMap> {
        let map = self.maps.get(index).ok_or_else(|| {
            WorldError::UnknownMap(format!("no map at index {} of {}", index, self.maps.len()))
        })?;
        let kind = MapKind::from_name(&map.name).ok_or_else(|| {
            WorldError::UnknownMap(format!("'{}' at index {} has no known layout", map.name, index))
        })?;
        self.decode(map, kind.channels(), kind.element_type())
    }

    fn decode(
        &self,
        map: &MapData,
        channels: usize,
        element_type: ElementType,
    ) -> WorldResult<TerrainMap> {
        debug!(
            map = %map.name,
            bytes = map.data.len(),
            channels,
            element_type = %element_type,
            "decoding raster"
        );
        TerrainMap::new(map.data.as_ref(), channels, element_type, self.size as usize)
    }

    /// Replace the data of `name`, adding the map if it is missing.
    pub fn set_map(&mut self, name: &str, map: &TerrainMap) {
        match self.maps.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.data = Bytes::from(map.to_bytes()),
            None => self.add_map(name, map),
        }
    }

    /// Append `map` under `name`, even if the name is taken.
    pub fn add_map(&mut self, name: &str, map: &TerrainMap) {
        self.maps.push(MapData {
            name: name.to_string(),
            data: Bytes::from(map.to_bytes()),
        });
    }

    /// A zero-filled raster of `kind` sized for this world.
    ///
    /// `resolution` defaults to [`MapKind::default_resolution`].
    pub fn create_empty_terrain_map(
        &self,
        kind: MapKind,
        resolution: Option<usize>,
    ) -> WorldResult<TerrainMap> {
        let resolution = resolution.unwrap_or_else(|| kind.default_resolution(self.size));
        TerrainMap::empty(
            kind.channels(),
            kind.element_type(),
            resolution,
            self.size as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{create_flat_height_blob, create_uniform_splat_blob};

    fn small_world() -> WorldData {
        let mut world = WorldData::with_size(4);
        world.maps.push(MapData {
            name: "height".to_string(),
            data: Bytes::from(create_flat_height_blob(4, 1000)),
        });
        world.maps.push(MapData {
            name: "splat".to_string(),
            data: Bytes::from(create_uniform_splat_blob(4, 4)),
        });
        world
    }

    #[test]
    fn test_kind_table() {
        assert_eq!(MapKind::Splat.channels(), 8);
        assert_eq!(MapKind::Biome.channels(), 4);
        assert_eq!(MapKind::Topology.element_type(), ElementType::Int);
        assert_eq!(MapKind::Water.element_type(), ElementType::Short);
        assert_eq!("alpha".parse::<MapKind>().unwrap(), MapKind::Alpha);
        assert!("roads".parse::<MapKind>().is_err());
    }

    #[test]
    fn test_default_resolutions() {
        assert_eq!(MapKind::Height.default_resolution(3071), 2049);
        assert_eq!(MapKind::Height.default_resolution(3072), 4097);
        assert_eq!(MapKind::Splat.default_resolution(2048), 1024);
        assert_eq!(MapKind::Splat.default_resolution(2049), 2048);
    }

    #[test]
    fn test_get_map_as_terrain() {
        let world = small_world();
        let height = world.get_map_as_terrain("height").unwrap();
        assert_eq!(height.get(2, 3, 0), 1000);

        let splat = world.get_map_as_terrain("splat").unwrap();
        assert_eq!(splat.channel_count(), 8);
        assert_eq!(splat.get(0, 0, 4), 255);

        assert!(matches!(
            world.get_map_as_terrain("biome"),
            Err(WorldError::UnknownMap(_))
        ));
        // 128 bytes read as two 8x8 byte channels
        let reread = world
            .get_map_as_terrain_with("splat", 2, ElementType::Byte)
            .unwrap();
        assert_eq!(reread.resolution(), 8);
        assert!(world
            .get_map_as_terrain_with("splat", 2, ElementType::Short)
            .is_err());
    }

    #[test]
    fn test_get_map_as_terrain_at_index() {
        let mut world = small_world();
        world.maps.push(MapData {
            name: "custom".to_string(),
            data: Bytes::from_static(&[0; 16]),
        });

        let splat = world.get_map_as_terrain_at(1).unwrap();
        assert_eq!(splat.channel_count(), 8);
        assert_eq!(splat, world.get_map_as_terrain("splat").unwrap());
        assert_eq!(world.get_map_as_terrain_at(0).unwrap().get(1, 1, 0), 1000);

        assert!(matches!(
            world.get_map_as_terrain_at(2),
            Err(WorldError::UnknownMap(msg)) if msg.contains("custom")
        ));
        assert!(matches!(
            world.get_map_as_terrain_at(9),
            Err(WorldError::UnknownMap(_))
        ));
    }

    #[test]
    fn test_set_map_replaces_or_adds() {
        let mut world = small_world();
        let mut height = world.get_map_as_terrain("height").unwrap();
        height.set(0, 0, 0, 5);
        world.set_map("height", &height);
        assert_eq!(world.maps.len(), 2);
        assert_eq!(world.get_map_as_terrain("height").unwrap().get(0, 0, 0), 5);

        let water = world.create_empty_terrain_map(MapKind::Water, Some(4)).unwrap();
        world.set_map("water", &water);
        assert_eq!(world.map_names().collect::<Vec<_>>(), vec!["height", "splat", "water"]);
    }

    #[test]
    fn test_create_empty_default_resolution() {
        let world = WorldData::with_size(16);
        let alpha = world.create_empty_terrain_map(MapKind::Alpha, None).unwrap();
        assert_eq!(alpha.resolution(), 1024);
        assert_eq!(alpha.world_size(), 16);
        assert_eq!(alpha.to_bytes().len(), 1024 * 1024);
    }
}
