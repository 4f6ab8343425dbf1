//! Test data generators for creating synthetic map payloads.
//!
//! Rasters are produced in the on-disk layout: channel-major, each channel a
//! square of `resolution × resolution` elements, elements little-endian.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Creates a multi-channel 16-bit raster blob.
///
/// Element `k` of channel `c` holds `value(c, k / resolution, k % resolution)`.
///
/// # Arguments
///
/// * `resolution` - Side length of each square channel
/// * `channels` - Number of channels
/// * `value` - Function of `(channel, row, col)` producing the element
///
/// # Example
///
/// ```
/// use test_utils::create_u16_raster;
///
/// let blob = create_u16_raster(2, 1, |_, row, col| (row * 10 + col) as u16);
/// assert_eq!(blob, vec![0, 0, 1, 0, 10, 0, 11, 0]);
/// ```
pub fn create_u16_raster<F>(resolution: usize, channels: usize, value: F) -> Vec<u8>
where
    F: Fn(usize, usize, usize) -> u16,
{
    let mut blob = Vec::with_capacity(resolution * resolution * channels * 2);
    for channel in 0..channels {
        for row in 0..resolution {
            for col in 0..resolution {
                blob.extend_from_slice(&value(channel, row, col).to_le_bytes());
            }
        }
    }
    blob
}

/// Creates a multi-channel 8-bit raster blob.
///
/// Same layout as [`create_u16_raster`] with one byte per element.
pub fn create_u8_raster<F>(resolution: usize, channels: usize, value: F) -> Vec<u8>
where
    F: Fn(usize, usize, usize) -> u8,
{
    let mut blob = Vec::with_capacity(resolution * resolution * channels);
    for channel in 0..channels {
        for row in 0..resolution {
            for col in 0..resolution {
                blob.push(value(channel, row, col));
            }
        }
    }
    blob
}

/// Creates a multi-channel 32-bit raster blob.
pub fn create_u32_raster<F>(resolution: usize, channels: usize, value: F) -> Vec<u8>
where
    F: Fn(usize, usize, usize) -> u32,
{
    let mut blob = Vec::with_capacity(resolution * resolution * channels * 4);
    for channel in 0..channels {
        for row in 0..resolution {
            for col in 0..resolution {
                blob.extend_from_slice(&value(channel, row, col).to_le_bytes());
            }
        }
    }
    blob
}

/// Creates a single-channel height blob with every element set to `value`.
pub fn create_flat_height_blob(resolution: usize, value: u16) -> Vec<u8> {
    create_u16_raster(resolution, 1, |_, _, _| value)
}

/// Creates an 8-channel splat blob where one material covers everything.
///
/// # Arguments
///
/// * `resolution` - Side length of the splat map
/// * `dominant` - Channel set to 255; all other channels are 0
pub fn create_uniform_splat_blob(resolution: usize, dominant: usize) -> Vec<u8> {
    create_u8_raster(resolution, 8, |channel, _, _| {
        if channel == dominant {
            u8::MAX
        } else {
            0
        }
    })
}

/// Creates bytes following `index % 251`.
///
/// The prime period keeps the pattern from lining up with block boundaries
/// while staying very compressible.
pub fn create_indexed_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Creates long runs of repeated bytes, the best case for LZ4.
pub fn create_compressible_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i / 4096) % 7) as u8).collect()
}

/// Creates reproducible pseudo-random bytes, the worst case for LZ4.
///
/// # Arguments
///
/// * `len` - Number of bytes
/// * `seed` - Seed for the generator; equal seeds give equal output
pub fn create_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_raster_layout() {
        let blob = create_u16_raster(3, 2, |c, row, col| (c * 100 + row * 3 + col) as u16);
        assert_eq!(blob.len(), 3 * 3 * 2 * 2);
        // channel 1, row 0, col 2 is element 9 + 2
        let k = 11;
        assert_eq!(u16::from_le_bytes([blob[k * 2], blob[k * 2 + 1]]), 102);
    }

    #[test]
    fn test_uniform_splat() {
        let blob = create_uniform_splat_blob(4, 3);
        assert_eq!(blob.len(), 8 * 16);
        assert!(blob[3 * 16..4 * 16].iter().all(|&b| b == 255));
        assert!(blob[..3 * 16].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_random_bytes_are_reproducible() {
        assert_eq!(create_random_bytes(64, 7), create_random_bytes(64, 7));
        assert_ne!(create_random_bytes(64, 7), create_random_bytes(64, 8));
    }

    #[test]
    fn test_u32_raster_length() {
        assert_eq!(create_u32_raster(5, 1, |_, _, _| 1).len(), 100);
    }
}
