//! `.map` file framing: a version header followed by a chunk stream holding
//! the protobuf world payload.

use std::path::Path;

use bytes::Bytes;
use lz4_stream::{ChunkReader, ChunkWriter};
use prost::Message;
use tracing::{debug, info};
use world_common::{WorldError, WorldResult};

use crate::schema::WorldData;

/// Version written into new files.
pub const MAP_VERSION: u32 = 9;

/// Bytes of the version header.
pub const HEADER_LEN: usize = 4;

/// Version stored in a map file header.
pub fn map_version(bytes: &[u8]) -> WorldResult<u32> {
    let header: [u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(WorldError::TruncatedStream {
            expected: HEADER_LEN,
            available: bytes.len(),
        })?;
    Ok(u32::from_le_bytes(header))
}

/// Decode a complete map file held in memory.
///
/// The header version is not interpreted.
pub fn read_map(bytes: &[u8]) -> WorldResult<WorldData> {
    let version = map_version(bytes)?;
    let mut payload = Vec::new();
    ChunkReader::new(&bytes[HEADER_LEN..]).read_to_end(&mut payload)?;

    let world = WorldData::decode(Bytes::from(payload))
        .map_err(|e| WorldError::Schema(e.to_string()))?;

    debug!(
        version,
        size = world.size,
        maps = world.maps.len(),
        prefabs = world.prefabs.len(),
        paths = world.paths.len(),
        "world decoded"
    );
    Ok(world)
}

/// Encode a world into map file bytes.
pub fn write_map(world: &WorldData) -> Vec<u8> {
    frame(ChunkWriter::new().write(&world.encode_to_vec()))
}

/// Like [`write_map`], compressing blocks in parallel. Output is identical.
pub fn write_map_parallel(world: &WorldData) -> Vec<u8> {
    frame(ChunkWriter::new().write_parallel(&world.encode_to_vec()))
}

fn frame(stream: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + stream.len());
    out.extend_from_slice(&MAP_VERSION.to_le_bytes());
    out.extend_from_slice(&stream);
    out
}

pub fn read_map_file(path: impl AsRef<Path>) -> WorldResult<WorldData> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    info!(path = %path.display(), bytes = bytes.len(), "reading map file");
    read_map(&bytes)
}

pub fn write_map_file(path: impl AsRef<Path>, world: &WorldData) -> WorldResult<usize> {
    let path = path.as_ref();
    let bytes = write_map(world);
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote map file");
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_version() {
        let bytes = write_map(&WorldData::with_size(1000));
        assert_eq!(&bytes[..4], &[9, 0, 0, 0]);
        assert_eq!(map_version(&bytes).unwrap(), 9);
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            read_map(&[9, 0]),
            Err(WorldError::TruncatedStream { expected: 4, available: 2 })
        ));
    }

    #[test]
    fn test_schema_error() {
        // Stored chunk holding a truncated protobuf field.
        let mut bytes = vec![9, 0, 0, 0];
        bytes.extend_from_slice(&ChunkWriter::new().write(&[0x12, 0x05, 0x01]));
        assert!(matches!(read_map(&bytes), Err(WorldError::Schema(_))));
    }
}
