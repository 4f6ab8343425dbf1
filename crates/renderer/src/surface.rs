//! Destination for finished tiles.

use image::RgbaImage;
use world_common::{WorldError, WorldResult};

/// Something RGBA8 pixel blocks can be painted into.
pub trait RasterSurface {
    /// Copy a row-major `width × height` RGBA8 block so that its top-left
    /// pixel lands at column `origin_x`, row `origin_y`.
    fn put_pixels(
        &mut self,
        buffer: &[u8],
        origin_x: u32,
        origin_y: u32,
        width: u32,
        height: u32,
    ) -> WorldResult<()>;
}

impl RasterSurface for RgbaImage {
    fn put_pixels(
        &mut self,
        buffer: &[u8],
        origin_x: u32,
        origin_y: u32,
        width: u32,
        height: u32,
    ) -> WorldResult<()> {
        let stride = width as usize * 4;
        if buffer.len() != stride * height as usize {
            return Err(WorldError::Render(format!(
                "block of {} bytes is not {}x{} RGBA",
                buffer.len(),
                width,
                height
            )));
        }
        if origin_x as u64 + width as u64 > self.width() as u64
            || origin_y as u64 + height as u64 > self.height() as u64
        {
            return Err(WorldError::Render(format!(
                "{}x{} block at ({}, {}) overflows a {}x{} surface",
                width,
                height,
                origin_x,
                origin_y,
                self.width(),
                self.height()
            )));
        }
        if stride == 0 {
            return Ok(());
        }

        let surface_stride = self.width() as usize * 4;
        let column = origin_x as usize * 4;
        let raw: &mut [u8] = self;
        for (row, src) in buffer.chunks_exact(stride).enumerate() {
            let offset = (origin_y as usize + row) * surface_stride + column;
            raw[offset..offset + stride].copy_from_slice(src);
        }
        Ok(())
    }
}
