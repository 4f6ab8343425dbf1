//! Chunk flags and headers.

use crate::varint::encode_varint;
use crate::BLOCK_SIZE;
use world_common::{WorldError, WorldResult};

/// Flag word at the start of every chunk.
///
/// Bit 0 marks a compressed block. Bit 1 is reserved and ignored when
/// decoding; stored blocks set it so their flag word is never the zero
/// end-of-data sentinel. Bits 2 and up hold a pass count, which must be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkFlags(u64);

impl ChunkFlags {
    pub const NONE: ChunkFlags = ChunkFlags(0);
    pub const COMPRESSED: ChunkFlags = ChunkFlags(1);
    pub const RESERVED: ChunkFlags = ChunkFlags(2);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn is_compressed(&self) -> bool {
        self.0 & Self::COMPRESSED.0 != 0
    }

    /// Number of extra compression passes encoded in the flags.
    pub fn passes(&self) -> u64 {
        self.0 >> 2
    }

    /// Reject flag words this decoder cannot honour.
    pub fn validate(&self) -> WorldResult<()> {
        match self.passes() {
            0 => Ok(()),
            passes => Err(WorldError::UnsupportedPassCount(passes)),
        }
    }
}

/// Decoded framing of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub flags: ChunkFlags,
    pub original_length: usize,
    pub compressed_length: usize,
}

impl ChunkHeader {
    /// Header for a block stored verbatim.
    pub fn stored(length: usize) -> Self {
        Self {
            flags: ChunkFlags::RESERVED,
            original_length: length,
            compressed_length: length,
        }
    }

    /// Header for an LZ4-compressed block.
    pub fn compressed(original_length: usize, compressed_length: usize) -> Self {
        Self {
            flags: ChunkFlags::COMPRESSED,
            original_length,
            compressed_length,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.flags.is_compressed()
    }

    /// Whether the block bytes are the payload itself.
    ///
    /// Some encoders flag incompressible blocks as compressed but write them
    /// raw with equal lengths. LZ4 output of that size is never produced by
    /// an encoder that stores raw once compression stops paying off.
    pub fn is_raw(&self) -> bool {
        !self.is_compressed() || self.compressed_length == self.original_length
    }

    /// The first short block ends the stream.
    pub fn is_final(&self) -> bool {
        self.original_length < BLOCK_SIZE
    }

    /// Check the length invariants before any buffer is sized from them.
    pub fn validate(&self) -> WorldResult<()> {
        if self.original_length > BLOCK_SIZE {
            return Err(WorldError::corrupt(format!(
                "original length {} exceeds block size {}",
                self.original_length, BLOCK_SIZE
            )));
        }
        if self.compressed_length > self.original_length {
            return Err(WorldError::corrupt(format!(
                "compressed length {} exceeds original length {}",
                self.compressed_length, self.original_length
            )));
        }
        Ok(())
    }

    /// Append the varint framing (not the block bytes) to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        encode_varint(self.flags.bits(), out);
        encode_varint(self.original_length as u64, out);
        if self.is_compressed() {
            encode_varint(self.compressed_length as u64, out);
        }
    }
}
