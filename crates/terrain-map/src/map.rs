//! Multi-channel raster store.

use nalgebra::Vector3;
use tracing::trace;
use world_common::{WorldError, WorldResult};

use crate::element::{ChannelData, ElementType};

/// A byte region inside a larger buffer.
///
/// `byte_offset` is the position of the region inside `buffer`, the way a
/// decoded message field sits inside its payload. Construction of a
/// [`TerrainMap`] advances the offset to the next multiple of the element
/// width before reading elements.
#[derive(Debug, Clone, Copy)]
pub struct RasterView<'a> {
    pub buffer: &'a [u8],
    pub byte_offset: usize,
    pub byte_len: usize,
}

impl<'a> RasterView<'a> {
    pub fn new(buffer: &'a [u8], byte_offset: usize, byte_len: usize) -> Self {
        Self {
            buffer,
            byte_offset,
            byte_len,
        }
    }

    /// The whole of `buffer`, offset zero.
    pub fn whole(buffer: &'a [u8]) -> Self {
        Self::new(buffer, 0, buffer.len())
    }

    /// The element-aligned bytes of the region.
    fn aligned(&self, element_type: ElementType) -> WorldResult<&'a [u8]> {
        let width = element_type.width();
        if self.byte_len % width != 0 {
            return Err(WorldError::raster_shape(format!(
                "{} bytes is not a whole number of {} elements",
                self.byte_len, element_type
            )));
        }

        let misalignment = self.byte_offset % width;
        let offset = if misalignment == 0 {
            self.byte_offset
        } else {
            self.byte_offset + (width - misalignment)
        };
        if offset != self.byte_offset {
            trace!(
                from = self.byte_offset,
                to = offset,
                "realigned raster offset"
            );
        }

        self.buffer
            .get(offset..offset + self.byte_len)
            .ok_or_else(|| {
                WorldError::raster_shape(format!(
                    "region {}..{} exceeds buffer of {} bytes",
                    offset,
                    offset + self.byte_len,
                    self.buffer.len()
                ))
            })
    }
}

impl<'a> From<&'a [u8]> for RasterView<'a> {
    fn from(buffer: &'a [u8]) -> Self {
        Self::whole(buffer)
    }
}

impl<'a> From<&'a Vec<u8>> for RasterView<'a> {
    fn from(buffer: &'a Vec<u8>) -> Self {
        Self::whole(buffer)
    }
}

/// One named raster of a world, reinterpreted at world resolution.
///
/// Channels are stored at `world_size × world_size` and indexed with `x` as
/// the outer stride: element `(x, y)` is `channel[x * world_size + y]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMap {
    element_type: ElementType,
    resolution: usize,
    world_size: usize,
    channels: Vec<ChannelData>,
}

impl TerrainMap {
    /// Extract `channel_count` channels from a channel-major blob.
    ///
    /// The blob holds `channel_count` squares of `resolution²` elements each;
    /// the resolution is derived from the element count. Each square is
    /// resampled to `world_size²`.
    pub fn new<'a>(
        source: impl Into<RasterView<'a>>,
        channel_count: usize,
        element_type: ElementType,
        world_size: usize,
    ) -> WorldResult<Self> {
        if channel_count == 0 {
            return Err(WorldError::raster_shape("a raster needs at least one channel"));
        }
        if world_size == 0 {
            return Err(WorldError::raster_shape("world size must be positive"));
        }

        let bytes = source.into().aligned(element_type)?;
        let elements = bytes.len() / element_type.width();
        if elements == 0 || elements % channel_count != 0 {
            return Err(WorldError::raster_shape(format!(
                "{} elements cannot be split into {} channels",
                elements, channel_count
            )));
        }

        let run = elements / channel_count;
        let resolution = perfect_sqrt(run).ok_or_else(|| {
            WorldError::raster_shape(format!(
                "channel of {} elements is not a square raster",
                run
            ))
        })?;

        let run_bytes = run * element_type.width();
        let channels = bytes
            .chunks_exact(run_bytes)
            .map(|slice| {
                ChannelData::from_le_bytes(element_type, slice).resample(
                    resolution, resolution, world_size, world_size,
                )
            })
            .collect();

        trace!(
            channels = channel_count,
            element_type = %element_type,
            resolution,
            world_size,
            "raster extracted"
        );

        Ok(Self {
            element_type,
            resolution,
            world_size,
            channels,
        })
    }

    /// Rebuild a store from channels already at world resolution.
    ///
    /// This is how a store is reconstructed from plain buffers, for example
    /// on the far side of a worker boundary.
    pub fn from_channels(
        channels: Vec<ChannelData>,
        resolution: usize,
        world_size: usize,
    ) -> WorldResult<Self> {
        let element_type = channels
            .first()
            .map(ChannelData::element_type)
            .ok_or_else(|| WorldError::raster_shape("a raster needs at least one channel"))?;
        if world_size == 0 {
            return Err(WorldError::raster_shape("world size must be positive"));
        }

        let expected = world_size * world_size;
        for (i, channel) in channels.iter().enumerate() {
            if channel.element_type() != element_type {
                return Err(WorldError::raster_shape(format!(
                    "channel {} is {}, channel 0 is {}",
                    i,
                    channel.element_type(),
                    element_type
                )));
            }
            if channel.len() != expected {
                return Err(WorldError::raster_shape(format!(
                    "channel {} holds {} elements, expected {}",
                    i,
                    channel.len(),
                    expected
                )));
            }
        }

        Ok(Self {
            element_type,
            resolution,
            world_size,
            channels,
        })
    }

    /// A zero-filled store at the given logical resolution.
    pub fn empty(
        channel_count: usize,
        element_type: ElementType,
        resolution: usize,
        world_size: usize,
    ) -> WorldResult<Self> {
        if resolution == 0 {
            return Err(WorldError::raster_shape("resolution must be positive"));
        }
        let channels = (0..channel_count)
            .map(|_| ChannelData::zeroed(element_type, world_size * world_size))
            .collect();
        Self::from_channels(channels, resolution, world_size)
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Side length of the stored (on-disk) raster.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Side length the channels are indexed at.
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelData> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[ChannelData] {
        &self.channels
    }

    /// Give up the channel buffers.
    pub fn into_channels(self) -> Vec<ChannelData> {
        self.channels
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        x * self.world_size + y
    }

    /// Raw element. Out-of-range coordinates panic.
    #[inline]
    pub fn get(&self, x: usize, y: usize, channel: usize) -> u32 {
        self.channels[channel].get(self.index(x, y))
    }

    /// Store a raw element, truncated to the element width.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: u32) {
        let index = self.index(x, y);
        self.channels[channel].set(index, value);
    }

    /// Element scaled to `[0, 1]` by the element type's maximum.
    #[inline]
    pub fn get_normalized(&self, x: usize, y: usize, channel: usize) -> f32 {
        (self.get(x, y, channel) as f64 / self.element_type.max_value() as f64) as f32
    }

    /// Store a `[0, 1]` value scaled to the element type's maximum.
    /// Values outside the range are clamped.
    pub fn set_normalized(&mut self, x: usize, y: usize, channel: usize, value: f32) {
        let scaled = (value.clamp(0.0, 1.0) as f64) * self.element_type.max_value() as f64;
        self.set(x, y, channel, scaled as u32);
    }

    /// Surface normal from forward differences along +x and +y.
    ///
    /// Tangents `(1, 0, h − h(x+1))` and `(0, 1, h − h(y+1))` are crossed and
    /// normalised. On the last row or column the neighbour is the sample
    /// itself, giving a flat difference.
    pub fn get_normal(&self, x: usize, y: usize, channel: usize) -> Vector3<f32> {
        let last = self.world_size - 1;
        let h = self.get(x, y, channel) as f32;
        let dx = h - self.get((x + 1).min(last), y, channel) as f32;
        let dy = h - self.get(x, (y + 1).min(last), channel) as f32;

        let tangent_x = Vector3::new(1.0, 0.0, dx);
        let tangent_y = Vector3::new(0.0, 1.0, dy);
        tangent_x
            .cross(&tangent_y)
            .try_normalize(0.0)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Encode back to the channel-major blob at logical resolution.
    ///
    /// Each channel is resampled from world size to the logical resolution,
    /// which undoes the row flip applied on construction.
    pub fn to_bytes(&self) -> Vec<u8> {
        let per_channel = self.resolution * self.resolution * self.element_type.width();
        let mut out = Vec::with_capacity(per_channel * self.channels.len());
        for channel in &self.channels {
            channel
                .resample(self.world_size, self.world_size, self.resolution, self.resolution)
                .write_le(&mut out);
        }
        out
    }

    /// The same raster reinterpreted at another world size.
    pub fn resampled(&self, world_size: usize) -> WorldResult<TerrainMap> {
        let bytes = self.to_bytes();
        TerrainMap::new(&bytes, self.channels.len(), self.element_type, world_size)
    }
}

/// Integer square root of `n` if `n` is a perfect square.
fn perfect_sqrt(n: usize) -> Option<usize> {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    (root * root == n).then_some(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{
        assert_approx_eq, assert_vec3_approx_eq, create_u16_raster, create_u32_raster,
        create_u8_raster,
    };

    #[test]
    fn test_perfect_sqrt() {
        assert_eq!(perfect_sqrt(0), Some(0));
        assert_eq!(perfect_sqrt(16), Some(4));
        assert_eq!(perfect_sqrt(2049 * 2049), Some(2049));
        assert_eq!(perfect_sqrt(15), None);
    }

    #[test]
    fn test_channel_extraction_eight_bytes() {
        let n = 4;
        let blob = create_u8_raster(n, 8, |c, row, col| (c * 16 + row * 4 + col) as u8);
        let map = TerrainMap::new(&blob, 8, ElementType::Byte, n).unwrap();

        assert_eq!(map.channel_count(), 8);
        assert_eq!(map.resolution(), n);
        for c in 0..8 {
            assert_eq!(map.channel(c).unwrap().len(), n * n);
            for x in 0..n {
                for y in 0..n {
                    // store row x came from source row n-1-x
                    let source = c * n * n + (n - 1 - x) * n + y;
                    assert_eq!(map.get(x, y, c), blob[source] as u32);
                }
            }
        }
    }

    #[test]
    fn test_misaligned_offset_is_advanced() {
        // One padding byte before a 2x2 short raster at offset 1.
        let mut buffer = vec![0xEEu8, 0x00];
        buffer.extend_from_slice(&create_u16_raster(2, 1, |_, row, col| (row * 2 + col + 1) as u16));
        let view = RasterView::new(&buffer, 1, 8);

        let map = TerrainMap::new(view, 1, ElementType::Short, 2).unwrap();
        assert_eq!(map.get(1, 0, 0), 1);
        assert_eq!(map.get(0, 1, 0), 4);
    }

    #[test]
    fn test_misaligned_region_past_end_fails() {
        let buffer = vec![0u8; 9];
        let err = TerrainMap::new(RasterView::new(&buffer, 1, 8), 1, ElementType::Short, 2)
            .unwrap_err();
        assert!(matches!(err, WorldError::InvalidRasterShape(_)));
    }

    #[test]
    fn test_invalid_shapes() {
        let odd = vec![0u8; 15];
        assert!(TerrainMap::new(&odd, 1, ElementType::Byte, 4).is_err());
        assert!(TerrainMap::new(&odd, 1, ElementType::Short, 4).is_err());
        assert!(TerrainMap::new(&vec![0u8; 16], 3, ElementType::Byte, 4).is_err());
        assert!(TerrainMap::new(&vec![0u8; 16], 0, ElementType::Byte, 4).is_err());
        assert!(TerrainMap::new(&Vec::<u8>::new(), 1, ElementType::Byte, 4).is_err());
    }

    #[test]
    fn test_normalized_access() {
        let mut map = TerrainMap::empty(1, ElementType::Short, 2, 2).unwrap();
        map.set_normalized(0, 1, 0, 1.5);
        assert_eq!(map.get(0, 1, 0), 65535);
        map.set_normalized(1, 1, 0, 0.5);
        assert_eq!(map.get(1, 1, 0), 32767);
        assert_approx_eq!(map.get_normalized(1, 1, 0), 0.5, 0.0001);
        map.set_normalized(1, 0, 0, -1.0);
        assert_eq!(map.get(1, 0, 0), 0);
    }

    #[test]
    fn test_flat_normal_points_up() {
        let map = TerrainMap::empty(1, ElementType::Short, 4, 4).unwrap();
        let n = map.get_normal(1, 1, 0);
        assert_eq!(n, Vector3::new(0.0, 0.0, 1.0));
        // edges use a flat difference
        assert_eq!(map.get_normal(3, 3, 0), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_sloped_normal() {
        let mut map = TerrainMap::empty(1, ElementType::Short, 2, 2).unwrap();
        map.set(1, 0, 0, 1);
        let n = map.get_normal(0, 0, 0);
        // tangent (1, 0, -1) x (0, 1, 0) = (1, 0, 1)
        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert_vec3_approx_eq!((n.x, n.y, n.z), (s, 0.0, s), 1e-6);
    }

    #[test]
    fn test_sloped_normal_along_y() {
        let mut map = TerrainMap::empty(1, ElementType::Short, 3, 3).unwrap();
        map.set(1, 1, 0, 2);
        let n = map.get_normal(1, 1, 0);
        // tangents (1, 0, 2) and (0, 1, 2)
        let len = 3.0f32;
        assert_vec3_approx_eq!((n.x, n.y, n.z), (-2.0 / len, -2.0 / len, 1.0 / len), 1e-6);
    }

    #[test]
    fn test_int_channels_keep_full_range() {
        let blob = create_u32_raster(2, 1, |_, row, col| 70_000 + (row * 2 + col) as u32);
        let map = TerrainMap::new(&blob, 1, ElementType::Int, 2).unwrap();
        // store row 0 is source row 1
        assert_eq!(map.get(0, 0, 0), 70_002);
        assert_eq!(map.get(1, 1, 0), 70_001);
        assert_eq!(map.to_bytes(), blob);
    }

    #[test]
    fn test_to_bytes_restores_source() {
        let blob = create_u16_raster(4, 2, |c, row, col| (c * 1000 + row * 10 + col) as u16);
        let map = TerrainMap::new(&blob, 2, ElementType::Short, 4).unwrap();
        assert_eq!(map.to_bytes(), blob);
    }

    #[test]
    fn test_resampled_keeps_resolution() {
        let blob = create_u8_raster(4, 1, |_, row, col| (row * 4 + col) as u8);
        let map = TerrainMap::new(&blob, 1, ElementType::Byte, 4).unwrap();
        let big = map.resampled(8).unwrap();
        assert_eq!(big.world_size(), 8);
        assert_eq!(big.resolution(), 4);
        assert_eq!(big.to_bytes(), blob);
    }

    #[test]
    fn test_from_channels_rejects_mixed() {
        let channels = vec![
            ChannelData::zeroed(ElementType::Byte, 4),
            ChannelData::zeroed(ElementType::Short, 4),
        ];
        assert!(TerrainMap::from_channels(channels, 2, 2).is_err());
        assert!(TerrainMap::from_channels(vec![ChannelData::zeroed(ElementType::Byte, 3)], 2, 2).is_err());
        assert!(TerrainMap::from_channels(Vec::new(), 2, 2).is_err());
    }
}
