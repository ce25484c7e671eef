use crate::foundation::core::{Bgra8Premul, Rect, Size};
use crate::foundation::error::{StrataError, StrataResult};

/// Owned, row-major grid of premultiplied BGRA8 pixels.
///
/// Dimensions are fixed at construction. Rows are tightly packed: row `y`
/// starts at pixel index `y * width`.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    size: Size,
    pixels: Vec<Bgra8Premul>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Allocate a buffer cleared to transparent black.
    pub fn new(width: u32, height: u32) -> StrataResult<Self> {
        Self::filled(width, height, Bgra8Premul::TRANSPARENT)
    }

    /// Allocate a buffer with every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: Bgra8Premul) -> StrataResult<Self> {
        let size = validated_size(width, height)?;
        let len = pixel_len(size)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|e| {
            StrataError::allocation(format!("{size} pixel buffer ({len} pixels): {e}"))
        })?;
        pixels.resize(len, color);
        Ok(Self { size, pixels })
    }

    /// Take ownership of an existing pixel vector.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Bgra8Premul>) -> StrataResult<Self> {
        let size = validated_size(width, height)?;
        let len = pixel_len(size)?;
        if pixels.len() != len {
            return Err(StrataError::precondition(format!(
                "{size} pixel buffer needs {len} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self { size, pixels })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Buffer dimensions.
    pub fn size(&self) -> Size {
        self.size
    }

    /// `[0, 0, width, height]`.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Bgra8Premul] {
        &self.pixels
    }

    /// All pixels, row-major, mutable.
    pub fn pixels_mut(&mut self) -> &mut [Bgra8Premul] {
        &mut self.pixels
    }

    /// Give up the buffer and return its pixels.
    pub fn into_pixels(self) -> Vec<Bgra8Premul> {
        self.pixels
    }

    /// Row `y`. Panics when `y >= height`.
    pub fn row(&self, y: u32) -> &[Bgra8Premul] {
        let w = self.size.width as usize;
        let start = y as usize * w;
        &self.pixels[start..start + w]
    }

    /// Row `y`, mutable. Panics when `y >= height`.
    pub fn row_mut(&mut self, y: u32) -> &mut [Bgra8Premul] {
        let w = self.size.width as usize;
        let start = y as usize * w;
        &mut self.pixels[start..start + w]
    }

    /// Every row in top-to-bottom order, each borrowed independently.
    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, Bgra8Premul> {
        self.pixels.chunks_exact_mut(self.size.width as usize)
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Bgra8Premul> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(self.pixels[y as usize * self.size.width as usize + x as usize])
    }

    /// Overwrite the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Bgra8Premul) -> StrataResult<()> {
        if x >= self.size.width || y >= self.size.height {
            return Err(StrataError::precondition(format!(
                "pixel ({x}, {y}) is outside {} buffer",
                self.size
            )));
        }
        let w = self.size.width as usize;
        self.pixels[y as usize * w + x as usize] = color;
        Ok(())
    }

    /// Set every pixel to `color`.
    pub fn clear(&mut self, color: Bgra8Premul) {
        self.pixels.fill(color);
    }

    /// Set every pixel inside `rect` to `color`. `rect` must lie within the buffer.
    pub fn fill_rect(&mut self, rect: Rect, color: Bgra8Premul) -> StrataResult<()> {
        self.check_roi(rect)?;
        if rect.is_empty() {
            return Ok(());
        }
        let (x0, x1) = (rect.left() as usize, rect.right() as usize);
        for y in rect.top()..rect.bottom() {
            self.row_mut(y as u32)[x0..x1].fill(color);
        }
        Ok(())
    }

    /// Copy `rect` from `src` into the same location of `self`.
    ///
    /// Both buffers must have the same size and `rect` must lie within them.
    pub fn copy_rect_from(&mut self, src: &PixelBuffer, rect: Rect) -> StrataResult<()> {
        if src.size != self.size {
            return Err(StrataError::precondition(format!(
                "copy source is {} but destination is {}",
                src.size, self.size
            )));
        }
        self.check_roi(rect)?;
        if rect.is_empty() {
            return Ok(());
        }
        let (x0, x1) = (rect.left() as usize, rect.right() as usize);
        for y in rect.top()..rect.bottom() {
            let y = y as u32;
            self.row_mut(y)[x0..x1].copy_from_slice(&src.row(y)[x0..x1]);
        }
        Ok(())
    }

    /// Export as a straight-alpha RGBA image.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut img = image::RgbaImage::new(self.size.width, self.size.height);
        for (dst, src) in img.pixels_mut().zip(self.pixels.iter()) {
            let [b, g, r, a] = src.to_straight();
            *dst = image::Rgba([r, g, b, a]);
        }
        img
    }

    /// Import a straight-alpha RGBA image, premultiplying each pixel.
    pub fn from_rgba_image(img: &image::RgbaImage) -> StrataResult<Self> {
        let pixels = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                Bgra8Premul::from_straight(b, g, r, a)
            })
            .collect();
        Self::from_pixels(img.width(), img.height(), pixels)
    }

    pub(crate) fn check_roi(&self, roi: Rect) -> StrataResult<()> {
        if roi.x < 0 || roi.y < 0 || roi.width < 0 || roi.height < 0 {
            return Err(StrataError::precondition(format!(
                "region of interest {roi:?} has negative components"
            )));
        }
        if !self.bounds().contains_rect(roi) {
            return Err(StrataError::precondition(format!(
                "region of interest {roi:?} is outside {} buffer",
                self.size
            )));
        }
        Ok(())
    }
}

fn validated_size(width: u32, height: u32) -> StrataResult<Size> {
    if width == 0 || height == 0 {
        return Err(StrataError::precondition(format!(
            "pixel buffer dimensions must be non-zero, got {width}x{height}"
        )));
    }
    Size::checked(width, height)
}

fn pixel_len(size: Size) -> StrataResult<usize> {
    usize::try_from(size.pixel_count())
        .map_err(|_| StrataError::allocation(format!("{size} pixel buffer overflows usize")))
}

/// Write access to a buffer whose dimensions are owned by someone else.
///
/// Every pixel can be changed, but the buffer itself cannot be replaced, so
/// its size stays what the owner checked.
///
/// ```compile_fail
/// let mut layer = strata::Layer::bitmap(4, 4).unwrap();
/// *layer.surface_mut().unwrap() = strata::PixelBuffer::new(8, 4).unwrap();
/// ```
#[derive(Debug)]
pub struct SurfaceMut<'a> {
    buf: &'a mut PixelBuffer,
}

impl<'a> SurfaceMut<'a> {
    pub(crate) fn new(buf: &'a mut PixelBuffer) -> Self {
        Self { buf }
    }

    /// All pixels, row-major, mutable.
    pub fn pixels_mut(&mut self) -> &mut [Bgra8Premul] {
        self.buf.pixels_mut()
    }

    /// Row `y`, mutable. Panics when `y >= height`.
    pub fn row_mut(&mut self, y: u32) -> &mut [Bgra8Premul] {
        self.buf.row_mut(y)
    }

    /// Every row in top-to-bottom order.
    pub fn rows_mut(&mut self) -> std::slice::ChunksExactMut<'_, Bgra8Premul> {
        self.buf.rows_mut()
    }

    /// See [`PixelBuffer::set_pixel`].
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Bgra8Premul) -> StrataResult<()> {
        self.buf.set_pixel(x, y, color)
    }

    /// See [`PixelBuffer::clear`].
    pub fn clear(&mut self, color: Bgra8Premul) {
        self.buf.clear(color);
    }

    /// See [`PixelBuffer::fill_rect`].
    pub fn fill_rect(&mut self, rect: Rect, color: Bgra8Premul) -> StrataResult<()> {
        self.buf.fill_rect(rect, color)
    }

    /// See [`PixelBuffer::copy_rect_from`].
    pub fn copy_rect_from(&mut self, src: &PixelBuffer, rect: Rect) -> StrataResult<()> {
        self.buf.copy_rect_from(src, rect)
    }
}

impl std::ops::Deref for SurfaceMut<'_> {
    type Target = PixelBuffer;

    fn deref(&self) -> &PixelBuffer {
        self.buf
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/pixel_buffer.rs"]
mod tests;
