//! Element widths and typed channel buffers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use world_common::WorldError;

use crate::resample::resample;

/// Width of one raster element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// 8-bit unsigned
    Byte,
    /// 16-bit unsigned
    Short,
    /// 32-bit unsigned
    Int,
}

impl ElementType {
    /// Bytes per element.
    pub fn width(&self) -> usize {
        match self {
            ElementType::Byte => 1,
            ElementType::Short => 2,
            ElementType::Int => 4,
        }
    }

    /// Largest storable value, `2^(8·width) − 1`.
    pub fn max_value(&self) -> u32 {
        match self {
            ElementType::Byte => u8::MAX as u32,
            ElementType::Short => u16::MAX as u32,
            ElementType::Int => u32::MAX,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Byte => "byte",
            ElementType::Short => "short",
            ElementType::Int => "int",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "byte" | "u8" => Ok(ElementType::Byte),
            "short" | "u16" => Ok(ElementType::Short),
            "int" | "u32" => Ok(ElementType::Int),
            other => Err(WorldError::raster_shape(format!(
                "unknown element type '{}'",
                other
            ))),
        }
    }
}

/// One channel of a raster, stored at its native width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl ChannelData {
    /// A zero-filled channel of `len` elements.
    pub fn zeroed(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Byte => ChannelData::U8(vec![0; len]),
            ElementType::Short => ChannelData::U16(vec![0; len]),
            ElementType::Int => ChannelData::U32(vec![0; len]),
        }
    }

    /// Decode little-endian elements. Trailing bytes that do not fill a
    /// whole element are ignored.
    pub fn from_le_bytes(element_type: ElementType, bytes: &[u8]) -> Self {
        match element_type {
            ElementType::Byte => ChannelData::U8(bytes.to_vec()),
            ElementType::Short => ChannelData::U16(
                bytes
                    .chunks_exact(2)
                    .map(|b| u16::from_le_bytes([b[0], b[1]]))
                    .collect(),
            ),
            ElementType::Int => ChannelData::U32(
                bytes
                    .chunks_exact(4)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            ),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ChannelData::U8(_) => ElementType::Byte,
            ChannelData::U16(_) => ElementType::Short,
            ChannelData::U32(_) => ElementType::Int,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChannelData::U8(v) => v.len(),
            ChannelData::U16(v) => v.len(),
            ChannelData::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, widened to `u32`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        match self {
            ChannelData::U8(v) => v[index] as u32,
            ChannelData::U16(v) => v[index] as u32,
            ChannelData::U32(v) => v[index],
        }
    }

    /// Store `value` at `index`, keeping only the low bits that fit.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        match self {
            ChannelData::U8(v) => v[index] = value as u8,
            ChannelData::U16(v) => v[index] = value as u16,
            ChannelData::U32(v) => v[index] = value,
        }
    }

    /// Nearest-neighbour resample with the row flip, see [`resample`].
    pub fn resample(&self, src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Self {
        match self {
            ChannelData::U8(v) => ChannelData::U8(resample(v, src_w, src_h, dst_w, dst_h)),
            ChannelData::U16(v) => ChannelData::U16(resample(v, src_w, src_h, dst_w, dst_h)),
            ChannelData::U32(v) => ChannelData::U32(resample(v, src_w, src_h, dst_w, dst_h)),
        }
    }

    /// Append the elements to `out` as little-endian bytes.
    pub fn write_le(&self, out: &mut Vec<u8>) {
        match self {
            ChannelData::U8(v) => out.extend_from_slice(v),
            ChannelData::U16(v) => v.iter().for_each(|e| out.extend_from_slice(&e.to_le_bytes())),
            ChannelData::U32(v) => v.iter().for_each(|e| out.extend_from_slice(&e.to_le_bytes())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_and_max() {
        assert_eq!(ElementType::Byte.width(), 1);
        assert_eq!(ElementType::Short.max_value(), 65535);
        assert_eq!(ElementType::Int.max_value(), u32::MAX);
        assert_eq!("SHORT".parse::<ElementType>().unwrap(), ElementType::Short);
        assert!("float".parse::<ElementType>().is_err());
    }

    #[test]
    fn test_le_decode_and_encode() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0xFF];
        let data = ChannelData::from_le_bytes(ElementType::Short, &bytes);
        assert_eq!(data, ChannelData::U16(vec![0x0201, 0x0403]));

        let mut out = Vec::new();
        data.write_le(&mut out);
        assert_eq!(out, &bytes[..4]);
    }

    #[test]
    fn test_set_truncates_to_width() {
        let mut data = ChannelData::zeroed(ElementType::Byte, 2);
        data.set(1, 0x1FF);
        assert_eq!(data.get(1), 0xFF);
    }
}
