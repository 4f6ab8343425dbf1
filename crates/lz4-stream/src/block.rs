//! Block compression primitives.

use world_common::{WorldError, WorldResult};

/// Compresses and restores a single chunk block.
///
/// Implementations are stateless with respect to the stream; framing,
/// length checks and buffer reuse belong to the reader and writer.
pub trait BlockCompressor: Send + Sync {
    /// Compress one block. An empty result means "store this block raw".
    fn compress(&self, block: &[u8]) -> Vec<u8>;

    /// Decompress `block` into `out`, returning the number of bytes written.
    fn decompress_into(&self, block: &[u8], out: &mut [u8]) -> WorldResult<usize>;
}

/// LZ4 block format, the codec used by map files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Block;

impl BlockCompressor for Lz4Block {
    fn compress(&self, block: &[u8]) -> Vec<u8> {
        lz4_flex::block::compress(block)
    }

    fn decompress_into(&self, block: &[u8], out: &mut [u8]) -> WorldResult<usize> {
        lz4_flex::block::decompress_into(block, out)
            .map_err(|e| WorldError::corrupt(format!("LZ4 block decode failed: {}", e)))
    }
}

/// Never compresses. Decoding a compressed chunk copies the bytes through.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOnly;

impl BlockCompressor for StoreOnly {
    fn compress(&self, _block: &[u8]) -> Vec<u8> {
        Vec::new()
    }

    fn decompress_into(&self, block: &[u8], out: &mut [u8]) -> WorldResult<usize> {
        let Some(target) = out.get_mut(..block.len()) else {
            return Err(WorldError::corrupt(format!(
                "block of {} bytes does not fit a {} byte buffer",
                block.len(),
                out.len()
            )));
        };
        target.copy_from_slice(block);
        Ok(block.len())
    }
}
