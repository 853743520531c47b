use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

/// Decoded RGBA image shared between the asset cache and every renderer that
/// blits from it. Cloning is cheap.
#[derive(Clone)]
pub struct Image {
    pixels: Arc<RgbaImage>,
}

impl Image {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Decode PNG (or any enabled format) bytes.
    pub fn from_encoded(bytes: &[u8], label: &str) -> Result<Self, String> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| format!("Failed to decode image '{label}': {e}"))?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    /// Fully transparent image of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// True when both handles point at the same decoded buffer.
    pub fn ptr_eq(a: &Image, b: &Image) -> bool {
        Arc::ptr_eq(&a.pixels, &b.pixels)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({}x{})", self.width(), self.height())
    }
}
