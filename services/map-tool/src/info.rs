//! Summaries of a decoded world.

use std::fmt;

use lz4_stream::ChunkReader;
use serde::Serialize;
use terrain_map::{map_version, MapKind, WorldData, HEADER_LEN};
use world_common::WorldResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    pub name: String,
    pub bytes: usize,
    /// Known layout, if the name is one of the standard maps.
    pub kind: Option<MapKind>,
    pub channels: Option<usize>,
    pub element_type: Option<String>,
    /// Side of the stored raster when the blob is a whole number of squares.
    pub resolution: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub version: u32,
    pub file_bytes: usize,
    pub chunks: usize,
    pub payload_bytes: usize,
    pub size: u32,
    pub maps: Vec<MapSummary>,
    pub prefabs: usize,
    pub paths: usize,
}

impl WorldSummary {
    /// Summarise a raw `.map` file and its decoded world.
    pub fn from_file_bytes(bytes: &[u8], world: &WorldData) -> WorldResult<Self> {
        let version = map_version(bytes)?;
        let mut reader = ChunkReader::new(bytes.get(HEADER_LEN..).unwrap_or_default());
        let mut payload_bytes = 0;
        while let Some(chunk) = reader.next_chunk()? {
            payload_bytes += chunk.len();
        }

        Ok(Self {
            version,
            file_bytes: bytes.len(),
            chunks: reader.chunks_read(),
            payload_bytes,
            size: world.size,
            maps: world.maps.iter().map(|m| summarise_map(&m.name, m.data.len())).collect(),
            prefabs: world.prefabs.len(),
            paths: world.paths.len(),
        })
    }
}

fn summarise_map(name: &str, bytes: usize) -> MapSummary {
    let kind = MapKind::from_name(name);
    let resolution = kind.and_then(|kind| {
        let per_channel = kind.channels() * kind.element_type().width();
        if bytes % per_channel != 0 {
            return None;
        }
        square_side(bytes / per_channel)
    });

    MapSummary {
        name: name.to_string(),
        bytes,
        kind,
        channels: kind.map(|k| k.channels()),
        element_type: kind.map(|k| k.element_type().to_string()),
        resolution,
    }
}

fn square_side(elements: usize) -> Option<usize> {
    let side = (elements as f64).sqrt().round() as usize;
    (side * side == elements).then_some(side)
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:  {}", self.version)?;
        writeln!(
            f,
            "file:     {} bytes, {} chunks, {} payload bytes",
            self.file_bytes, self.chunks, self.payload_bytes
        )?;
        writeln!(f, "size:     {}", self.size)?;
        writeln!(f, "prefabs:  {}", self.prefabs)?;
        writeln!(f, "paths:    {}", self.paths)?;
        writeln!(f, "maps:")?;
        for map in &self.maps {
            match (map.channels, &map.element_type, map.resolution) {
                (Some(channels), Some(ty), Some(res)) => writeln!(
                    f,
                    "  {:<10} {:>12} bytes  {}x{} {} x{}",
                    map.name, map.bytes, res, res, ty, channels
                )?,
                _ => writeln!(f, "  {:<10} {:>12} bytes  (unknown layout)", map.name, map.bytes)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use terrain_map::{write_map, MapData};
    use test_utils::{create_flat_height_blob, create_uniform_splat_blob};

    #[test]
    fn test_summary_of_synthetic_world() {
        let mut world = WorldData::with_size(8);
        world.maps.push(MapData {
            name: "height".to_string(),
            data: Bytes::from(create_flat_height_blob(8, 100)),
        });
        world.maps.push(MapData {
            name: "splat".to_string(),
            data: Bytes::from(create_uniform_splat_blob(4, 2)),
        });
        world.maps.push(MapData {
            name: "custom".to_string(),
            data: Bytes::from_static(&[1, 2, 3]),
        });

        let file = write_map(&world);
        let summary = WorldSummary::from_file_bytes(&file, &world).unwrap();

        assert_eq!(summary.version, 9);
        assert_eq!(summary.file_bytes, file.len());
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.size, 8);
        assert_eq!(summary.maps[0].resolution, Some(8));
        assert_eq!(summary.maps[1].resolution, Some(4));
        assert_eq!(summary.maps[1].channels, Some(8));
        assert_eq!(summary.maps[2].kind, None);
        assert!(summary.to_string().contains("(unknown layout)"));
    }

    #[test]
    fn test_square_side() {
        assert_eq!(square_side(0), Some(0));
        assert_eq!(square_side(2049 * 2049), Some(2049));
        assert_eq!(square_side(10), None);
    }
}
