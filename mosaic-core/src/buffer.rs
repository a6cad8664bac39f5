//! # Pixel buffers
//!
//! The tracer and the tile cache read pixels through [`PixelSource`], a 2D store addressable by `(x, y)` with
//! a [`PixelFormat`] describing its memory layout. [`PixelBuffer`] is the plain linear implementation.

use crate::util::Rect;

#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Layout {
    /// Gray.
    Y,
    /// Gray + alpha.
    YA,
    Rgb,
    Rgba,
}
impl Layout {
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            Self::Y => 1,
            Self::YA => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
    #[must_use]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::YA | Self::Rgba)
    }
}

/// Storage type of every channel.
#[derive(strum::AsRefStr, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Depth {
    U8,
    U16,
    F32,
}
impl Depth {
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
    /// Read one channel value, normalized so that the full range is `[0, 1]`.
    /// `bytes` must be exactly [`Self::bytes`] long.
    #[must_use]
    pub fn read_normalized(self, bytes: &[u8]) -> f32 {
        match self {
            Self::U8 => f32::from(bytes[0]) / f32::from(u8::MAX),
            Self::U16 => f32::from(bytemuck::pod_read_unaligned::<u16>(bytes)) / f32::from(u16::MAX),
            Self::F32 => bytemuck::pod_read_unaligned::<f32>(bytes),
        }
    }
    /// Write a normalized channel value. Inverse of [`Self::read_normalized`], up to quantization.
    pub fn write_normalized(self, value: f32, bytes: &mut [u8]) {
        match self {
            Self::U8 => bytes[0] = (value.clamp(0.0, 1.0) * f32::from(u8::MAX)).round() as u8,
            Self::U16 => {
                let v = (value.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16;
                bytes.copy_from_slice(bytemuck::bytes_of(&v));
            }
            Self::F32 => bytes.copy_from_slice(bytemuck::bytes_of(&value)),
        }
    }
}

/// Memory layout of one pixel.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct PixelFormat {
    pub layout: Layout,
    pub depth: Depth,
}
impl PixelFormat {
    /// 8 bit gray, the usual mask format.
    pub const MASK_U8: Self = Self {
        layout: Layout::Y,
        depth: Depth::U8,
    };
    pub const MASK_F32: Self = Self {
        layout: Layout::Y,
        depth: Depth::F32,
    };
    pub const RGBA_U8: Self = Self {
        layout: Layout::Rgba,
        depth: Depth::U8,
    };
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        self.layout.channels() * self.depth.bytes()
    }
    /// Read channel `channel` of `pixel` as a normalized float.
    #[must_use]
    pub fn channel(self, pixel: &[u8], channel: usize) -> f32 {
        let size = self.depth.bytes();
        self.depth
            .read_normalized(&pixel[channel * size..(channel + 1) * size])
    }
    /// Luminance of the pixel, ignoring alpha. Rec. 709 weights for color.
    #[must_use]
    pub fn luminance(self, pixel: &[u8]) -> f32 {
        match self.layout {
            Layout::Y | Layout::YA => self.channel(pixel, 0),
            Layout::Rgb | Layout::Rgba => {
                0.2126 * self.channel(pixel, 0)
                    + 0.7152 * self.channel(pixel, 1)
                    + 0.0722 * self.channel(pixel, 2)
            }
        }
    }
    /// Alpha of the pixel. Formats without alpha are fully opaque.
    #[must_use]
    pub fn alpha(self, pixel: &[u8]) -> f32 {
        if self.layout.has_alpha() {
            self.channel(pixel, self.layout.channels() - 1)
        } else {
            1.0
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("data length {actual} does not match the {expected} bytes required by the extent and format")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("rectangle is not within the buffer's extent")]
    OutOfBounds,
    #[error("buffers differ in pixel format")]
    FormatMismatch,
}

/// A read-only 2D pixel store.
pub trait PixelSource {
    /// The area covered by this source. Pixels are addressable everywhere within.
    fn extent(&self) -> Rect;
    fn format(&self) -> PixelFormat;
    /// The bytes of the pixel at `(x, y)`. `(x, y)` must lie within [`Self::extent`].
    fn pixel(&self, x: i32, y: i32) -> &[u8];
}

/// A linear, row-major buffer of pixels covering some extent.
#[derive(Clone, PartialEq, Debug)]
pub struct PixelBuffer {
    extent: Rect,
    format: PixelFormat,
    data: Vec<u8>,
}
impl PixelBuffer {
    /// A buffer of all-zero pixels.
    #[must_use]
    pub fn new(extent: Rect, format: PixelFormat) -> Self {
        let len = Self::byte_len(extent, format);
        Self {
            extent,
            format,
            data: vec![0; len],
        }
    }
    /// Wrap existing row-major pixel data.
    pub fn from_data(extent: Rect, format: PixelFormat, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = Self::byte_len(extent, format);
        if data.len() != expected {
            return Err(BufferError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            extent,
            format,
            data,
        })
    }
    /// Build a mask from a closure producing a normalized value per pixel.
    #[must_use]
    pub fn from_fn(extent: Rect, format: PixelFormat, mut f: impl FnMut(i32, i32) -> f32) -> Self {
        let mut buffer = Self::new(extent, format);
        for y in extent.y1..extent.y2 {
            for x in extent.x1..extent.x2 {
                let value = f(x, y);
                buffer.set_all_channels(x, y, value);
            }
        }
        buffer
    }
    fn byte_len(extent: Rect, format: PixelFormat) -> usize {
        extent.width() as usize * extent.height() as usize * format.bytes_per_pixel()
    }
    fn offset(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.extent.contains(x, y));
        let col = (x - self.extent.x1) as usize;
        let row = (y - self.extent.y1) as usize;
        (row * self.extent.width() as usize + col) * self.format.bytes_per_pixel()
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
    pub fn pixel_mut(&mut self, x: i32, y: i32) -> &mut [u8] {
        let start = self.offset(x, y);
        let bpp = self.format.bytes_per_pixel();
        &mut self.data[start..start + bpp]
    }
    /// Set every channel of a pixel, alpha included, to `value`.
    pub fn set_all_channels(&mut self, x: i32, y: i32, value: f32) {
        let depth = self.format.depth;
        let size = depth.bytes();
        for channel in self.pixel_mut(x, y).chunks_exact_mut(size) {
            depth.write_normalized(value, channel);
        }
    }
    /// Fill every pixel of `rect` (clipped to the extent) with the given pixel bytes.
    pub fn fill(&mut self, rect: Rect, pixel: &[u8]) {
        debug_assert_eq!(pixel.len(), self.format.bytes_per_pixel());
        let Some(rect) = rect.intersect(&self.extent) else {
            return;
        };
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                self.pixel_mut(x, y).copy_from_slice(pixel);
            }
        }
    }
    /// Copy the pixels of `rect` from `source`. Both must cover `rect` and share a format.
    pub fn copy_from(&mut self, source: &impl PixelSource, rect: Rect) -> Result<(), BufferError> {
        if !self.extent.contains_rect(&rect) || !source.extent().contains_rect(&rect) {
            return Err(BufferError::OutOfBounds);
        }
        debug_assert_eq!(source.format(), self.format);
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                self.pixel_mut(x, y).copy_from_slice(source.pixel(x, y));
            }
        }
        Ok(())
    }
}
impl PixelBuffer {
    /// Move the buffer's extent, keeping its pixels.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.extent = self.extent.translate(dx, dy);
    }
    /// Exchange pixels with `other` over the whole of `other`'s extent, which must lie within `self`.
    pub fn swap_region(&mut self, other: &mut Self) -> Result<(), BufferError> {
        if self.format != other.format {
            return Err(BufferError::FormatMismatch);
        }
        let rect = other.extent;
        if !self.extent.contains_rect(&rect) {
            return Err(BufferError::OutOfBounds);
        }
        if rect.is_empty() {
            return Ok(());
        }
        // Whole rows at a time.
        let row = rect.width() as usize * self.format.bytes_per_pixel();
        for (y, theirs) in (rect.y1..rect.y2).zip(other.data.chunks_exact_mut(row)) {
            let start = self.offset(rect.x1, y);
            self.data[start..start + row].swap_with_slice(theirs);
        }
        Ok(())
    }
}
impl PixelSource for PixelBuffer {
    fn extent(&self) -> Rect {
        self.extent
    }
    fn format(&self) -> PixelFormat {
        self.format
    }
    fn pixel(&self, x: i32, y: i32) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + self.format.bytes_per_pixel()]
    }
}
