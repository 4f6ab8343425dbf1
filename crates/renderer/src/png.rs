//! PNG output for rendered maps.
//!
//! Images are written as 8-bit RGBA with the Sub filter on every scanline,
//! which suits the smooth gradients of shaded terrain. Compressed rows are
//! flushed in IDAT chunks of at most [`IDAT_CHUNK_LEN`] bytes while the
//! image is still being filtered, so a large map is never held twice.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use tracing::debug;
use world_common::{WorldError, WorldResult};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
const FILTER_SUB: u8 = 1;
const BYTES_PER_PIXEL: usize = 4;

/// Largest IDAT payload emitted.
pub const IDAT_CHUNK_LEN: usize = 256 * 1024;

/// Length-prefixed, CRC-suffixed chunks over any writer.
struct PngStream<W> {
    out: W,
    written: u64,
}

impl<W: Write> PngStream<W> {
    fn start(mut out: W, width: u32, height: u32) -> WorldResult<Self> {
        out.write_all(&SIGNATURE)?;
        let mut stream = Self {
            out,
            written: SIGNATURE.len() as u64,
        };

        let mut ihdr = [0u8; 13];
        ihdr[..4].copy_from_slice(&width.to_be_bytes());
        ihdr[4..8].copy_from_slice(&height.to_be_bytes());
        ihdr[8] = 8; // bit depth
        ihdr[9] = 6; // RGBA
        stream.chunk(b"IHDR", &ihdr)?;
        Ok(stream)
    }

    fn chunk(&mut self, kind: &[u8; 4], data: &[u8]) -> WorldResult<()> {
        let len = u32::try_from(data.len()).map_err(|_| {
            WorldError::Render(format!(
                "{} chunk of {} bytes",
                String::from_utf8_lossy(kind),
                data.len()
            ))
        })?;

        let mut crc = crc32fast::Hasher::new();
        crc.update(kind);
        crc.update(data);

        self.out.write_all(&len.to_be_bytes())?;
        self.out.write_all(kind)?;
        self.out.write_all(data)?;
        self.out.write_all(&crc.finalize().to_be_bytes())?;
        self.written += 12 + data.len() as u64;
        Ok(())
    }

    /// Emit whole IDAT chunks from the front of `pending`, and the
    /// remainder too when `all` is set.
    fn flush_idat(&mut self, pending: &mut Vec<u8>, all: bool) -> WorldResult<()> {
        let mut start = 0;
        while pending.len() - start >= IDAT_CHUNK_LEN || (all && start < pending.len()) {
            let end = (start + IDAT_CHUNK_LEN).min(pending.len());
            self.chunk(b"IDAT", &pending[start..end])?;
            start = end;
        }
        pending.drain(..start);
        Ok(())
    }

    fn finish(mut self) -> WorldResult<u64> {
        self.chunk(b"IEND", &[])?;
        self.out.flush()?;
        Ok(self.written)
    }
}

/// Sub filter: each byte minus the same channel of the pixel to its left.
fn filter_sub(row: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.push(FILTER_SUB);
    out.extend_from_slice(&row[..BYTES_PER_PIXEL]);
    out.extend(
        row.iter()
            .zip(&row[BYTES_PER_PIXEL..])
            .map(|(left, cur)| cur.wrapping_sub(*left)),
    );
}

/// Encode `image` into `out` and return the number of bytes written.
pub fn write_png<W: Write>(out: &mut W, image: &RgbaImage, level: Compression) -> WorldResult<u64> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(WorldError::Render(format!(
            "cannot encode a {}x{} image",
            width, height
        )));
    }

    let mut stream = PngStream::start(out, width, height)?;
    let stride = width as usize * BYTES_PER_PIXEL;
    let mut zlib = ZlibEncoder::new(Vec::with_capacity(IDAT_CHUNK_LEN), level);
    let mut filtered = Vec::with_capacity(stride + 1);

    for row in image.as_raw().chunks_exact(stride) {
        filter_sub(row, &mut filtered);
        zlib.write_all(&filtered)?;
        if zlib.get_ref().len() >= IDAT_CHUNK_LEN {
            stream.flush_idat(zlib.get_mut(), false)?;
        }
    }
    let mut tail = zlib.finish()?;
    stream.flush_idat(&mut tail, true)?;

    let written = stream.finish()?;
    debug!(width, height, bytes = written, "encoded PNG");
    Ok(written)
}

/// Encode an RGBA surface in memory.
pub fn encode_image(image: &RgbaImage) -> WorldResult<Vec<u8>> {
    let mut png = Vec::new();
    write_png(&mut png, image, Compression::fast())?;
    Ok(png)
}

/// Encode `image` straight to `path`. Returns the file size.
pub fn write_png_file(path: impl AsRef<Path>, image: &RgbaImage) -> WorldResult<usize> {
    let mut file = BufWriter::new(File::create(path)?);
    let written = write_png(&mut file, image, Compression::fast())?;
    Ok(written as usize)
}
