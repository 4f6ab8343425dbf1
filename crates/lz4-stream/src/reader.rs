//! Chunk stream decoding.

use std::io::{ErrorKind, Read};

use tracing::{debug, trace};
use world_common::{WorldError, WorldResult};

use crate::block::{BlockCompressor, Lz4Block};
use crate::flags::{ChunkFlags, ChunkHeader};
use crate::varint::{decode_with, Decoded};

/// Reassembles the payload of a chunk stream.
///
/// The reader pulls bytes from any [`Read`] source and never looks back at
/// consumed input, so a file can be decoded without knowing its
/// uncompressed size first. Varints are read one byte at a time; wrap file
/// handles in a `BufReader`.
///
/// Scratch buffers belong to the instance and only grow, which amortises
/// allocation over the 1 MiB blocks of a large map.
pub struct ChunkReader<R, C = Lz4Block> {
    source: R,
    compressor: C,
    position: u64,
    block: Vec<u8>,
    scratch: Vec<u8>,
    chunks_read: usize,
    ended: bool,
}

impl<R: Read> ChunkReader<R, Lz4Block> {
    /// Create a reader over an LZ4 chunk stream.
    pub fn new(source: R) -> Self {
        Self::with_compressor(source, Lz4Block)
    }
}

impl<R: Read, C: BlockCompressor> ChunkReader<R, C> {
    pub fn with_compressor(source: R, compressor: C) -> Self {
        Self {
            source,
            compressor,
            position: 0,
            block: Vec::new(),
            scratch: Vec::new(),
            chunks_read: 0,
            ended: false,
        }
    }

    /// Bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Chunks decoded so far.
    pub fn chunks_read(&self) -> usize {
        self.chunks_read
    }

    /// Whether the terminal chunk or the end-of-data sentinel was reached.
    pub fn is_finished(&self) -> bool {
        self.ended
    }

    /// Decode the next chunk and return its uncompressed bytes.
    ///
    /// Returns `Ok(None)` once the stream has ended. The slice borrows the
    /// reader's buffers and is only valid until the next call.
    pub fn next_chunk(&mut self) -> WorldResult<Option<&[u8]>> {
        if self.ended {
            return Ok(None);
        }

        let flags = match self.next_varint()? {
            Decoded::Value(bits) => ChunkFlags::from_bits(bits),
            Decoded::Sentinel | Decoded::Exhausted => {
                trace!(position = self.position, "end-of-data sentinel");
                self.ended = true;
                return Ok(None);
            }
        };
        flags.validate()?;

        let original_length = self.required_length()?;
        let compressed_length = if flags.is_compressed() {
            self.required_length()?
        } else {
            original_length
        };

        let header = ChunkHeader {
            flags,
            original_length,
            compressed_length,
        };
        header.validate()?;

        self.fill_block(compressed_length)?;
        self.chunks_read += 1;
        if header.is_final() {
            self.ended = true;
        }

        trace!(
            chunk = self.chunks_read,
            compressed = header.is_compressed(),
            original_length,
            compressed_length,
            "decoded chunk header"
        );

        if header.is_raw() {
            return Ok(Some(&self.block[..compressed_length]));
        }

        if self.scratch.len() < original_length {
            self.scratch.resize(original_length, 0);
        }
        let written = self.compressor.decompress_into(
            &self.block[..compressed_length],
            &mut self.scratch[..original_length],
        )?;
        if written != original_length {
            return Err(WorldError::corrupt(format!(
                "chunk {} decompressed to {} bytes, header declares {}",
                self.chunks_read, written, original_length
            )));
        }

        Ok(Some(&self.scratch[..original_length]))
    }

    /// Decode every remaining chunk, appending payload bytes to `out`.
    ///
    /// Returns the number of bytes appended.
    pub fn read_to_end(&mut self, out: &mut Vec<u8>) -> WorldResult<usize> {
        let start = out.len();
        while let Some(chunk) = self.next_chunk()? {
            out.extend_from_slice(chunk);
        }

        debug!(
            chunks = self.chunks_read,
            consumed = self.position,
            decoded = out.len() - start,
            "chunk stream decoded"
        );
        Ok(out.len() - start)
    }

    /// Decode the whole stream into a new buffer.
    pub fn read_all(mut self) -> WorldResult<Vec<u8>> {
        let mut out = Vec::new();
        self.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Recover the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn next_varint(&mut self) -> WorldResult<Decoded> {
        decode_with(|| self.read_byte())
    }

    fn required_length(&mut self) -> WorldResult<usize> {
        let value = match self.next_varint()? {
            Decoded::Value(value) => value,
            Decoded::Sentinel => 0,
            Decoded::Exhausted => {
                return Err(WorldError::TruncatedStream {
                    expected: 1,
                    available: 0,
                })
            }
        };
        usize::try_from(value)
            .map_err(|_| WorldError::corrupt(format!("chunk length {} does not fit in memory", value)))
    }

    fn read_byte(&mut self) -> WorldResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.source.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.position += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read exactly `length` bytes into the block buffer.
    ///
    /// Partial reads are retried; a zero-length read means the source ran
    /// dry before the chunk did.
    fn fill_block(&mut self, length: usize) -> WorldResult<()> {
        if self.block.len() < length {
            self.block.resize(length, 0);
        }

        let mut filled = 0;
        while filled < length {
            match self.source.read(&mut self.block[filled..length]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;

        if filled != length {
            return Err(WorldError::TruncatedStream {
                expected: length,
                available: filled,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::encode_varint;
    use crate::BLOCK_SIZE;

    /// A source that hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn stored_chunk(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ChunkHeader::stored(payload.len()).encode(&mut out);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_single_stored_chunk() {
        let stream = stored_chunk(b"hello");
        let mut reader = ChunkReader::new(stream.as_slice());
        assert_eq!(reader.next_chunk().unwrap(), Some(&b"hello"[..]));
        assert!(reader.is_finished());
        assert_eq!(reader.next_chunk().unwrap(), None);
        assert_eq!(reader.position(), stream.len() as u64);
    }

    #[test]
    fn test_partial_reads_are_retried() {
        let stream = stored_chunk(&[9u8; 300]);
        let reader = ChunkReader::new(Trickle { data: &stream, step: 7 });
        assert_eq!(reader.read_all().unwrap(), vec![9u8; 300]);
    }

    #[test]
    fn test_empty_input_is_empty_payload() {
        assert!(ChunkReader::new(&[][..]).read_all().unwrap().is_empty());
    }

    #[test]
    fn test_sentinel_stops_before_trailing_bytes() {
        let mut stream = Vec::new();
        ChunkHeader::stored(BLOCK_SIZE).encode(&mut stream);
        stream.extend(std::iter::repeat(1u8).take(BLOCK_SIZE));
        stream.extend_from_slice(&[0x00, 0xDE, 0xAD]);

        let mut reader = ChunkReader::new(stream.as_slice());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), BLOCK_SIZE);
        assert_eq!(reader.position(), (stream.len() - 2) as u64);
    }

    #[test]
    fn test_compressed_length_exceeding_original_is_corrupt() {
        let mut stream = Vec::new();
        encode_varint(1, &mut stream);
        encode_varint(4, &mut stream);
        encode_varint(8, &mut stream);
        stream.extend_from_slice(&[0u8; 8]);

        let mut reader = ChunkReader::new(stream.as_slice());
        let err = reader.next_chunk().unwrap_err();
        assert!(matches!(err, WorldError::StreamCorrupt(_)), "{:?}", err);
    }

    #[test]
    fn test_pass_count_is_rejected() {
        let mut stream = Vec::new();
        encode_varint(0b101, &mut stream);
        encode_varint(4, &mut stream);
        encode_varint(2, &mut stream);
        stream.extend_from_slice(&[0u8; 2]);

        let err = ChunkReader::new(stream.as_slice()).read_all().unwrap_err();
        assert!(matches!(err, WorldError::UnsupportedPassCount(1)));
    }

    #[test]
    fn test_truncated_block() {
        let mut stream = stored_chunk(&[5u8; 32]);
        stream.truncate(stream.len() - 10);

        let err = ChunkReader::new(stream.as_slice()).read_all().unwrap_err();
        match err {
            WorldError::TruncatedStream { expected, available } => {
                assert_eq!(expected, 32);
                assert_eq!(available, 22);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_length_is_truncated() {
        let err = ChunkReader::new(&[0x01][..]).read_all().unwrap_err();
        assert!(matches!(err, WorldError::TruncatedStream { .. }));
    }

    #[test]
    fn test_zero_flags_at_start_is_sentinel() {
        let mut reader = ChunkReader::new(&[0x00, 0x03, 1, 2, 3][..]);
        assert_eq!(reader.next_chunk().unwrap(), None);
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_compressed_flag_with_equal_lengths_is_raw() {
        let mut stream = Vec::new();
        ChunkHeader::compressed(3, 3).encode(&mut stream);
        stream.extend_from_slice(b"xyz");
        assert_eq!(ChunkReader::new(stream.as_slice()).read_all().unwrap(), b"xyz");
    }

    #[test]
    fn test_scratch_grows_and_is_reused() {
        let big: Vec<u8> = (0..BLOCK_SIZE * 2).map(|i| (i % 251) as u8).collect();
        let framed = crate::compress(&big);

        let mut reader = ChunkReader::new(framed.as_slice());
        assert_eq!(reader.next_chunk().unwrap().map(<[u8]>::len), Some(BLOCK_SIZE));
        let capacity = reader.scratch.len();
        assert_eq!(reader.next_chunk().unwrap().map(<[u8]>::len), Some(BLOCK_SIZE));
        assert_eq!(reader.scratch.len(), capacity);
        assert_eq!(reader.next_chunk().unwrap(), Some(&[][..]));
        assert_eq!(reader.next_chunk().unwrap(), None);
        assert_eq!(reader.chunks_read(), 3);
    }
}
