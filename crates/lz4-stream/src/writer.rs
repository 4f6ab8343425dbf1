//! Chunk stream encoding.

use std::io::Write;

use rayon::prelude::*;
use tracing::{debug, trace};
use world_common::WorldResult;

use crate::block::{BlockCompressor, Lz4Block};
use crate::flags::ChunkHeader;
use crate::BLOCK_SIZE;

/// Splits a payload into [`BLOCK_SIZE`] blocks and frames each one.
pub struct ChunkWriter<C = Lz4Block> {
    compressor: C,
}

impl ChunkWriter<Lz4Block> {
    pub fn new() -> Self {
        Self::with_compressor(Lz4Block)
    }
}

impl Default for ChunkWriter<Lz4Block> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BlockCompressor> ChunkWriter<C> {
    pub fn with_compressor(compressor: C) -> Self {
        Self { compressor }
    }

    /// Encode `payload` into a complete chunk stream.
    pub fn write(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() / 2 + 16);
        let mut compressed_blocks = 0usize;
        let blocks = split_blocks(payload);

        for block in &blocks {
            if self.encode_block(block, &mut out) {
                compressed_blocks += 1;
            }
        }

        debug!(
            payload = payload.len(),
            encoded = out.len(),
            blocks = blocks.len(),
            compressed_blocks,
            "chunk stream encoded"
        );
        out
    }

    /// Encode `payload` and write the stream to `sink`.
    ///
    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, payload: &[u8], sink: &mut W) -> WorldResult<usize> {
        let encoded = self.write(payload);
        sink.write_all(&encoded)?;
        Ok(encoded.len())
    }

    /// Compress blocks on the rayon pool, then emit them in source order.
    ///
    /// The output is byte-identical to [`ChunkWriter::write`].
    pub fn write_parallel(&self, payload: &[u8]) -> Vec<u8> {
        let blocks = split_blocks(payload);
        let framed: Vec<(Vec<u8>, bool)> = blocks
            .par_iter()
            .map(|block| {
                let mut out = Vec::with_capacity(block.len() / 2 + 16);
                let compressed = self.encode_block(block, &mut out);
                (out, compressed)
            })
            .collect();

        let total: usize = framed.iter().map(|(bytes, _)| bytes.len()).sum();
        let compressed_blocks = framed.iter().filter(|(_, compressed)| *compressed).count();

        let mut out = Vec::with_capacity(total);
        for (bytes, _) in &framed {
            out.extend_from_slice(bytes);
        }

        debug!(
            payload = payload.len(),
            encoded = out.len(),
            blocks = blocks.len(),
            compressed_blocks,
            "chunk stream encoded in parallel"
        );
        out
    }

    /// Append one framed block to `out`. Returns whether it was compressed.
    pub fn encode_block(&self, block: &[u8], out: &mut Vec<u8>) -> bool {
        let compressed = self.compressor.compress(block);

        if compressed.is_empty() || compressed.len() >= BLOCK_SIZE || compressed.len() >= block.len() {
            trace!(length = block.len(), "storing block raw");
            ChunkHeader::stored(block.len()).encode(out);
            out.extend_from_slice(block);
            return false;
        }

        trace!(
            length = block.len(),
            compressed = compressed.len(),
            "storing block compressed"
        );
        ChunkHeader::compressed(block.len(), compressed.len()).encode(out);
        out.extend_from_slice(&compressed);
        true
    }
}

/// Cut `payload` into full blocks plus the short terminal block.
///
/// When the payload length is a multiple of [`BLOCK_SIZE`] (zero included)
/// the terminal block is empty.
fn split_blocks(payload: &[u8]) -> Vec<&[u8]> {
    let mut blocks: Vec<&[u8]> = payload.chunks(BLOCK_SIZE).collect();
    if payload.len() % BLOCK_SIZE == 0 {
        blocks.push(&[]);
    }
    blocks
}
