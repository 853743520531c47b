//! Generated stand-in for images that could not be loaded: a magenta/black
//! checker with "MISSING" written across the middle, impossible to mistake
//! for real art.

use image::{Rgba, RgbaImage};
use tpe_render::Image;

pub const FALLBACK_SIZE: u32 = 128;

const MAGENTA: Rgba<u8> = Rgba([255, 0, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SCALE: u32 = 2;
const LABEL: &str = "MISSING";

/// 5x7 rows, most significant of the low five bits is the leftmost column.
fn glyph(c: char) -> [u8; 7] {
    match c {
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        _ => [0; 7],
    }
}

pub fn missing_image() -> Image {
    let half = FALLBACK_SIZE / 2;
    let mut pixels = RgbaImage::from_fn(FALLBACK_SIZE, FALLBACK_SIZE, |x, y| {
        if (x < half) == (y < half) {
            BLACK
        } else {
            MAGENTA
        }
    });
    draw_label(&mut pixels, LABEL);
    Image::new(pixels)
}

/// Centered horizontally with the baseline on the middle row.
fn draw_label(pixels: &mut RgbaImage, text: &str) {
    let advance = (GLYPH_WIDTH + 1) * GLYPH_SCALE;
    let count = text.chars().count() as u32;
    let text_width = (count * advance).saturating_sub(GLYPH_SCALE);
    let left = pixels.width().saturating_sub(text_width) / 2;
    let top = (pixels.height() / 2).saturating_sub(GLYPH_HEIGHT * GLYPH_SCALE);

    for (i, c) in text.chars().enumerate() {
        let origin_x = left + i as u32 * advance;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1u8 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..GLYPH_SCALE {
                    for dx in 0..GLYPH_SCALE {
                        let x = origin_x + col * GLYPH_SCALE + dx;
                        let y = top + row as u32 * GLYPH_SCALE + dy;
                        if x < pixels.width() && y < pixels.height() {
                            pixels.put_pixel(x, y, WHITE);
                        }
                    }
                }
            }
        }
    }
}
