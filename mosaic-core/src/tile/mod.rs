//! # Tiles
//!
//! A [`TiledBuffer`] stores its pixels in fixed-size tiles, created on first access. When a validator is attached,
//! every tile fetch first asks it whether the tile is stale, and if so the validator recomputes the stale pixels
//! before the tile is handed out.
//!
//! Validators are built from a [`TileHandlerValidate`], which tracks the stale region and renders a graph node
//! into tiles. [`TileHandlerProjectable`] additionally brackets each validation with its projectable's
//! `begin_render`/`end_render` hooks.

mod projectable;
mod region;
mod validate;

pub use projectable::{Projectable, TileHandlerProjectable};
pub use region::Region;
pub use validate::{RenderBracket, RenderNode, TileHandlerValidate, TileValidator};

use crate::buffer::{BufferError, PixelBuffer, PixelFormat, PixelSource};
use crate::util::Rect;

/// Default width and height of a tile, in pixels.
pub const TILE_SIZE: u32 = 64;

pub struct TiledBuffer {
    extent: Rect,
    format: PixelFormat,
    tile_size: u32,
    tiles: hashbrown::HashMap<(i32, i32), PixelBuffer>,
    validator: Option<Box<dyn TileValidator>>,
}
impl TiledBuffer {
    #[must_use]
    pub fn new(extent: Rect, format: PixelFormat) -> Self {
        Self::with_tile_size(extent, format, TILE_SIZE)
    }
    /// # Panics
    /// If `tile_size` is zero.
    #[must_use]
    pub fn with_tile_size(extent: Rect, format: PixelFormat, tile_size: u32) -> Self {
        assert!(tile_size > 0, "tiles must not be empty");
        Self {
            extent,
            format,
            tile_size,
            tiles: hashbrown::HashMap::new(),
            validator: None,
        }
    }
    #[must_use]
    pub fn extent(&self) -> Rect {
        self.extent
    }
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }
    #[must_use]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }
    /// Attach a validator, returning the previous one.
    pub fn set_validator(
        &mut self,
        validator: impl TileValidator + 'static,
    ) -> Option<Box<dyn TileValidator>> {
        self.validator.replace(Box::new(validator))
    }
    pub fn take_validator(&mut self) -> Option<Box<dyn TileValidator>> {
        self.validator.take()
    }
    pub fn validator_mut(&mut self) -> Option<&mut (dyn TileValidator + 'static)> {
        self.validator.as_deref_mut()
    }
    /// Mark an area as stale. It will be recomputed on next access.
    pub fn invalidate(&mut self, rect: Rect) {
        if let Some(rect) = rect.intersect(&self.extent) {
            if let Some(validator) = self.validator.as_deref_mut() {
                validator.handler_mut().invalidate(rect);
            }
        }
    }
    /// Pixel rect covered by tile `(tx, ty)`, clipped to the extent.
    #[must_use]
    pub fn tile_rect(&self, tx: i32, ty: i32) -> Option<Rect> {
        let size = self.tile_size as i32;
        Rect::from_size(tx * size, ty * size, self.tile_size, self.tile_size).intersect(&self.extent)
    }
    /// Index of the tile containing pixel `(x, y)`.
    #[must_use]
    pub fn tile_index(&self, x: i32, y: i32) -> (i32, i32) {
        let size = self.tile_size as i32;
        (x.div_euclid(size), y.div_euclid(size))
    }
    /// Fetch a tile, validating it first if it is stale. `None` if the tile lies outside the extent.
    pub fn tile(&mut self, tx: i32, ty: i32) -> Option<&PixelBuffer> {
        let rect = self.tile_rect(tx, ty)?;
        let format = self.format;
        let tile = self
            .tiles
            .entry((tx, ty))
            .or_insert_with(|| PixelBuffer::new(rect, format));
        if let Some(validator) = self.validator.as_deref_mut() {
            validator.validate_tile(tile);
        }
        Some(tile)
    }
    /// Copy out an area of the buffer, validating every tile it touches.
    pub fn read(&mut self, rect: Rect) -> Result<PixelBuffer, BufferError> {
        if !self.extent.contains_rect(&rect) {
            return Err(BufferError::OutOfBounds);
        }
        let mut out = PixelBuffer::new(rect, self.format);
        if rect.is_empty() {
            return Ok(out);
        }
        let (tx1, ty1) = self.tile_index(rect.x1, rect.y1);
        let (tx2, ty2) = self.tile_index(rect.x2 - 1, rect.y2 - 1);
        for ty in ty1..=ty2 {
            for tx in tx1..=tx2 {
                let Some(tile) = self.tile(tx, ty) else {
                    continue;
                };
                if let Some(part) = tile.extent().intersect(&rect) {
                    out.copy_from(tile, part)?;
                }
            }
        }
        Ok(out)
    }
    /// Number of tiles currently allocated.
    #[must_use]
    pub fn n_tiles(&self) -> usize {
        self.tiles.len()
    }
}

#[cfg(test)]
mod test {
    use super::{RenderNode, TileHandlerValidate, TiledBuffer};
    use crate::buffer::{PixelBuffer, PixelFormat, PixelSource};
    use crate::util::Rect;
    use std::sync::Arc;

    #[test]
    fn tiles_clip_to_extent() {
        let buffer = TiledBuffer::with_tile_size(Rect::from_size(0, 0, 100, 50), PixelFormat::MASK_U8, 64);
        assert_eq!(buffer.tile_rect(1, 0), Some(Rect::from_corners(64, 0, 100, 50)));
        assert_eq!(buffer.tile_rect(2, 0), None);
        assert_eq!(buffer.tile_index(-1, 64), (-1, 1));
    }
    #[test]
    fn read_without_validator_is_blank() {
        let mut buffer = TiledBuffer::with_tile_size(Rect::from_size(0, 0, 16, 16), PixelFormat::MASK_U8, 8);
        let read = buffer.read(Rect::from_size(4, 4, 8, 8)).unwrap();
        assert!(read.data().iter().all(|&v| v == 0));
        assert_eq!(buffer.n_tiles(), 4);
        assert!(buffer.read(Rect::from_size(10, 10, 8, 8)).is_err());
    }
    #[test]
    fn read_renders_source() {
        let extent = Rect::from_size(0, 0, 20, 12);
        let source = Arc::new(PixelBuffer::from_fn(extent, PixelFormat::MASK_U8, |x, y| {
            if (x + y) % 2 == 0 {
                1.0
            } else {
                0.0
            }
        }));
        let mut buffer = TiledBuffer::with_tile_size(extent, PixelFormat::MASK_U8, 8);
        let mut handler = TileHandlerValidate::new(source.clone() as Arc<dyn RenderNode>, PixelFormat::MASK_U8);
        handler.invalidate(extent);
        buffer.set_validator(handler);
        let read = buffer.read(extent).unwrap();
        assert_eq!(read.data(), source.data());
        assert_eq!(read.pixel(3, 5), source.pixel(3, 5));
    }
}
