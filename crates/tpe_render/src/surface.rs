//! Drawing-surface abstraction and the CPU raster implementation.
//!
//! A host hands the engine one [`DrawingSurface`]. The surface must be able to
//! produce a [`Context2d`], the three primitives everything else is built on:
//! clear a rectangle, fill a rectangle, blit a region of an image into a
//! destination rectangle. Coordinates are surface pixels as `f32`.
//!
//! [`PixelSurface`] rasterises into an in-memory RGBA buffer with
//! nearest-neighbour sampling (pixel art must not be smoothed) and
//! source-over alpha blending.

use std::cell::RefCell;
use std::ops::Range;
use std::path::Path;
use std::rc::Rc;

use image::{Rgba, RgbaImage};

use crate::texture::Image;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);
    pub const GREEN: Self = Self([0.0, 1.0, 0.0, 1.0]);
    pub const BLUE: Self = Self([0.0, 0.0, 1.0, 1.0]);
    pub const YELLOW: Self = Self([1.0, 1.0, 0.0, 1.0]);
    pub const MAGENTA: Self = Self([1.0, 0.0, 1.0, 1.0]);
    pub const TRANSPARENT: Self = Self([0.0, 0.0, 0.0, 0.0]);

    pub fn with_alpha(self, alpha: f32) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, alpha.clamp(0.0, 1.0)])
    }

    pub fn alpha(self) -> f32 {
        self.0[3]
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.w * factor, self.h * factor)
    }

    pub fn is_empty(self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }
}

pub trait Context2d {
    fn clear_rect(&mut self, rect: Rect);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Blit the `src` region of `image` scaled into `dst`.
    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect);
}

pub trait DrawingSurface {
    fn size(&self) -> (u32, u32);
    /// `None` when the surface cannot be drawn to at all.
    fn context_2d(&mut self) -> Option<Box<dyn Context2d>>;
}

/// In-memory RGBA surface. Contexts created from it draw into the same buffer.
#[derive(Clone)]
pub struct PixelSurface {
    buffer: Rc<RefCell<RgbaImage>>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: Rc::new(RefCell::new(RgbaImage::new(width, height))),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let buffer = self.buffer.borrow();
        if x < buffer.width() && y < buffer.height() {
            Some(buffer.get_pixel(x, y).0)
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.buffer.borrow().clone()
    }

    pub fn save_png(&self, path: &Path) -> Result<(), String> {
        self.buffer
            .borrow()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))
    }
}

impl DrawingSurface for PixelSurface {
    fn size(&self) -> (u32, u32) {
        self.buffer.borrow().dimensions()
    }

    fn context_2d(&mut self) -> Option<Box<dyn Context2d>> {
        Some(Box::new(PixelContext {
            buffer: self.buffer.clone(),
        }))
    }
}

struct PixelContext {
    buffer: Rc<RefCell<RgbaImage>>,
}

impl Context2d for PixelContext {
    fn clear_rect(&mut self, rect: Rect) {
        let mut buffer = self.buffer.borrow_mut();
        let (width, height) = buffer.dimensions();
        for y in pixel_range(rect.y, rect.h, height) {
            for x in pixel_range(rect.x, rect.w, width) {
                buffer.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() || color.alpha() <= 0.0 {
            return;
        }
        let src = color.to_rgba8();
        let mut buffer = self.buffer.borrow_mut();
        let (width, height) = buffer.dimensions();
        for y in pixel_range(rect.y, rect.h, height) {
            for x in pixel_range(rect.x, rect.w, width) {
                let dst = buffer.get_pixel_mut(x, y);
                dst.0 = blend_over(src, dst.0);
            }
        }
    }

    fn draw_image(&mut self, image: &Image, src: Rect, dst: Rect) {
        if src.is_empty() || dst.is_empty() {
            return;
        }
        let pixels = image.pixels();
        let (img_w, img_h) = pixels.dimensions();
        let mut buffer = self.buffer.borrow_mut();
        let (width, height) = buffer.dimensions();

        for y in pixel_range(dst.y, dst.h, height) {
            let center_y = y as f32 + 0.5;
            if center_y < dst.y || center_y >= dst.y + dst.h {
                continue;
            }
            let sy = (src.y + (center_y - dst.y) / dst.h * src.h).floor();
            if sy < 0.0 || sy >= img_h as f32 || sy < src.y.floor() {
                continue;
            }
            for x in pixel_range(dst.x, dst.w, width) {
                let center_x = x as f32 + 0.5;
                if center_x < dst.x || center_x >= dst.x + dst.w {
                    continue;
                }
                let sx = (src.x + (center_x - dst.x) / dst.w * src.w).floor();
                if sx < 0.0 || sx >= img_w as f32 || sx < src.x.floor() {
                    continue;
                }
                let texel = pixels.get_pixel(sx as u32, sy as u32).0;
                let out = buffer.get_pixel_mut(x, y);
                out.0 = blend_over(texel, out.0);
            }
        }
    }
}

/// Integer pixel span covering `[start, start + len)`, clipped to `[0, limit)`.
fn pixel_range(start: f32, len: f32, limit: u32) -> Range<u32> {
    if len <= 0.0 || !start.is_finite() || !len.is_finite() {
        return 0..0;
    }
    let lo = start.floor().max(0.0);
    let hi = (start + len).ceil().min(limit as f32);
    if hi <= lo {
        return 0..0;
    }
    lo as u32..hi as u32
}

/// Source-over compositing of straight (non-premultiplied) RGBA8 colors.
fn blend_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        out[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}
