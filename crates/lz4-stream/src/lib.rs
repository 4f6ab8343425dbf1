//! Chunked LZ4 stream framing for terrain world containers.
//!
//! A stream is a sequence of self-describing chunks:
//!
//! ```text
//! ┌────────────┬──────────────────┬────────────────────┬──────────────┐
//! │ flags (vi) │ original len (vi)│ compressed len (vi)│ block bytes  │
//! │            │                  │ only if compressed │              │
//! └────────────┴──────────────────┴────────────────────┴──────────────┘
//! ```
//!
//! Every block except the last holds exactly [`BLOCK_SIZE`] uncompressed
//! bytes. The first chunk whose original length is below [`BLOCK_SIZE`] ends
//! the stream, so writers always emit one (possibly empty) short block.
//!
//! # Example
//!
//! ```
//! let payload = vec![7u8; 10_000];
//! let framed = lz4_stream::compress(&payload);
//! let restored = lz4_stream::decompress(&framed).unwrap();
//! assert_eq!(restored, payload);
//! ```

pub mod block;
pub mod flags;
pub mod reader;
pub mod varint;
pub mod writer;

pub use block::{BlockCompressor, Lz4Block, StoreOnly};
pub use flags::{ChunkFlags, ChunkHeader};
pub use reader::ChunkReader;
pub use varint::{decode_varint, encode_varint, try_decode_varint};
pub use writer::ChunkWriter;

use world_common::WorldResult;

/// Uncompressed size of every non-terminal block in a stream.
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// Decode a complete chunk stream held in memory.
pub fn decompress(bytes: &[u8]) -> WorldResult<Vec<u8>> {
    ChunkReader::new(bytes).read_all()
}

/// Frame and compress a payload into a chunk stream.
pub fn compress(payload: &[u8]) -> Vec<u8> {
    ChunkWriter::new().write(payload)
}
