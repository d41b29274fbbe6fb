use image::{Rgb, RgbImage};

use crate::error::CanvasError;

/// 8-bit RGB color. Every pixel and every tool color uses this type.
pub type Color = Rgb<u8>;

pub const BLACK: Color = Rgb([0, 0, 0]);
pub const WHITE: Color = Rgb([255, 255, 255]);

/// Integer pixel coordinate in image space.
///
/// Signed so that positions left of or above the canvas (which the view
/// mapping produces when the pointer is outside the image) stay representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PixelPos {
    pub x: i32,
    pub y: i32,
}

impl PixelPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for PixelPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// The project's single raster: `width * height` RGB pixels, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: RgbImage,
}

impl PixelBuffer {
    /// A black canvas. Both dimensions must be at least 1.
    pub fn new(width: u32, height: u32) -> Result<Self, CanvasError> {
        Self::filled(width, height, BLACK)
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self, CanvasError> {
        if width == 0 || height == 0 {
            return Err(CanvasError::InvalidSize { width, height });
        }
        Ok(Self {
            pixels: RgbImage::from_pixel(width, height, color),
        })
    }

    /// Rebuild a buffer from the flat row-major RGB layout used by the project file.
    pub fn from_flat(data: Vec<u8>, width: u32, height: u32) -> Result<Self, CanvasError> {
        if width == 0 || height == 0 {
            return Err(CanvasError::InvalidSize { width, height });
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CanvasError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        let actual = data.len();
        let pixels = RgbImage::from_raw(width, height, data)
            .ok_or(CanvasError::DataLength { expected, actual })?;
        Ok(Self { pixels })
    }

    pub fn to_flat(&self) -> Vec<u8> {
        self.pixels.as_raw().clone()
    }

    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn contains(&self, pos: PixelPos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && (pos.x as u32) < self.pixels.width()
            && (pos.y as u32) < self.pixels.height()
    }

    pub fn get(&self, x: i32, y: i32) -> Result<Color, CanvasError> {
        self.check(x, y)?;
        Ok(*self.pixels.get_pixel(x as u32, y as u32))
    }

    pub fn set(&mut self, x: i32, y: i32, color: Color) -> Result<(), CanvasError> {
        self.check(x, y)?;
        self.pixels.put_pixel(x as u32, y as u32, color);
        Ok(())
    }

    pub fn get_at(&self, pos: PixelPos) -> Result<Color, CanvasError> {
        self.get(pos.x, pos.y)
    }

    pub fn set_at(&mut self, pos: PixelPos, color: Color) -> Result<(), CanvasError> {
        self.set(pos.x, pos.y, color)
    }

    /// Write `color` to every in-bounds position in `points`, skipping the rest.
    /// Returns how many cells were written.
    pub fn set_many<I>(&mut self, points: I, color: Color) -> usize
    where
        I: IntoIterator<Item = PixelPos>,
    {
        let mut written = 0;
        for p in points {
            if self.contains(p) {
                self.pixels.put_pixel(p.x as u32, p.y as u32, color);
                written += 1;
            }
        }
        written
    }

    /// Overwrite the whole buffer with `other`'s contents (same-size restore).
    pub fn restore_from(&mut self, other: &PixelBuffer) {
        if self.size() == other.size() {
            self.pixels.clone_from(&other.pixels);
        } else {
            *self = other.clone();
        }
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.pixels
    }

    /// Bytes held by the pixel store.
    pub fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len()
    }

    fn check(&self, x: i32, y: i32) -> Result<(), CanvasError> {
        if self.contains(PixelPos::new(x, y)) {
            Ok(())
        } else {
            Err(CanvasError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                width: self.pixels.width(),
                height: self.pixels.height(),
            })
        }
    }
}
