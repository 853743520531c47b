use crate::surface::{Color, Context2d, DrawingSurface, Rect};
use crate::texture::Image;

/// Thin drawing front-end over one surface's 2D context.
///
/// All destination coordinates are multiplied by `scale` before reaching the
/// context, so game code works in unscaled "world" pixels while the surface
/// shows them enlarged (2x gives the chunky retro look).
pub struct Renderer {
    ctx: Box<dyn Context2d>,
    width: u32,
    height: u32,
    scale: f32,
    draw_calls: u64,
}

impl Renderer {
    /// Fails only when the surface cannot provide a 2D context; nothing can
    /// be drawn without one.
    pub fn new(surface: &mut dyn DrawingSurface) -> Result<Self, String> {
        let (width, height) = surface.size();
        let ctx = surface
            .context_2d()
            .ok_or_else(|| "Could not get 2D context from drawing surface".to_string())?;
        log::debug!("Renderer attached to {}x{} surface", width, height);
        Ok(Self {
            ctx,
            width,
            height,
            scale: 1.0,
            draw_calls: 0,
        })
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        } else {
            log::warn!("Ignoring invalid render scale {scale}; keeping {}", self.scale);
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Surface size in device pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Draw calls issued since construction or the last reset.
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    pub fn reset_draw_calls(&mut self) {
        self.draw_calls = 0;
    }

    /// Wipe the whole surface, independent of scale.
    pub fn clear(&mut self) {
        self.ctx
            .clear_rect(Rect::new(0.0, 0.0, self.width as f32, self.height as f32));
    }

    pub fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.draw_calls += 1;
        self.ctx
            .fill_rect(Rect::new(x, y, width, height).scaled(self.scale), color);
    }

    /// Blit a whole image at `(x, y)`, at its native size unless `size` is given.
    pub fn draw_image(&mut self, image: &Image, x: f32, y: f32, size: Option<(f32, f32)>) {
        let (iw, ih) = (image.width() as f32, image.height() as f32);
        let (w, h) = size.unwrap_or((iw, ih));
        self.draw_calls += 1;
        self.ctx.draw_image(
            image,
            Rect::new(0.0, 0.0, iw, ih),
            Rect::new(x, y, w, h).scaled(self.scale),
        );
    }

    /// Blit the atlas cell `(sx, sy, sw, sh)` into the display cell
    /// `(dx, dy, dw, dh)`. Source and destination sizes may differ.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_tile(
        &mut self,
        image: &Image,
        sx: f32,
        sy: f32,
        sw: f32,
        sh: f32,
        dx: f32,
        dy: f32,
        dw: f32,
        dh: f32,
    ) {
        self.draw_calls += 1;
        self.ctx.draw_image(
            image,
            Rect::new(sx, sy, sw, sh),
            Rect::new(dx, dy, dw, dh).scaled(self.scale),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawOp, RecordingSurface};
    use crate::surface::PixelSurface;

    struct DetachedSurface;

    impl DrawingSurface for DetachedSurface {
        fn size(&self) -> (u32, u32) {
            (800, 600)
        }

        fn context_2d(&mut self) -> Option<Box<dyn Context2d>> {
            None
        }
    }

    #[test]
    fn new_fails_without_context() {
        let err = Renderer::new(&mut DetachedSurface)
            .err()
            .expect("missing context is fatal");
        assert!(err.contains("2D context"));
    }

    #[test]
    fn clear_covers_whole_surface() {
        let mut surface = RecordingSurface::new(800, 600);
        let mut renderer = Renderer::new(&mut surface).expect("renderer");
        renderer.clear();
        assert_eq!(
            surface.ops(),
            vec![DrawOp::Clear(Rect::new(0.0, 0.0, 800.0, 600.0))]
        );
    }

    #[test]
    fn draw_rect_fills_with_color() {
        let mut surface = RecordingSurface::new(800, 600);
        let mut renderer = Renderer::new(&mut surface).expect("renderer");
        renderer.draw_rect(10.0, 20.0, 30.0, 40.0, Color::GREEN);
        assert_eq!(
            surface.ops(),
            vec![DrawOp::Fill {
                rect: Rect::new(10.0, 20.0, 30.0, 40.0),
                color: Color::GREEN,
            }]
        );
        assert_eq!(renderer.draw_calls(), 1);
    }

    #[test]
    fn draw_image_defaults_to_native_size() {
        let mut surface = RecordingSurface::new(800, 600);
        let mut renderer = Renderer::new(&mut surface).expect("renderer");
        let image = Image::blank(16, 8);
        renderer.draw_image(&image, 10.0, 20.0, None);
        renderer.draw_image(&image, 0.0, 0.0, Some((32.0, 32.0)));
        assert_eq!(
            surface.image_ops(),
            vec![
                (Rect::new(0.0, 0.0, 16.0, 8.0), Rect::new(10.0, 20.0, 16.0, 8.0)),
                (Rect::new(0.0, 0.0, 16.0, 8.0), Rect::new(0.0, 0.0, 32.0, 32.0)),
            ]
        );
    }

    #[test]
    fn draw_tile_passes_source_and_destination() {
        let mut surface = RecordingSurface::new(800, 600);
        let mut renderer = Renderer::new(&mut surface).expect("renderer");
        let image = Image::blank(256, 256);
        renderer.draw_tile(&image, 128.0, 0.0, 128.0, 128.0, 32.0, 0.0, 32.0, 32.0);
        assert_eq!(
            surface.image_ops(),
            vec![(
                Rect::new(128.0, 0.0, 128.0, 128.0),
                Rect::new(32.0, 0.0, 32.0, 32.0)
            )]
        );
    }

    #[test]
    fn scale_applies_to_destinations_only() {
        let mut surface = RecordingSurface::new(100, 100);
        let mut renderer = Renderer::new(&mut surface).expect("renderer").with_scale(2.0);
        let image = Image::blank(64, 64);
        renderer.draw_tile(&image, 32.0, 32.0, 32.0, 32.0, 10.0, 5.0, 16.0, 16.0);
        renderer.clear();
        let ops = surface.ops();
        assert_eq!(
            ops[0],
            DrawOp::Image {
                image_size: (64, 64),
                src: Rect::new(32.0, 32.0, 32.0, 32.0),
                dst: Rect::new(20.0, 10.0, 32.0, 32.0),
            }
        );
        assert_eq!(ops[1], DrawOp::Clear(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn invalid_scale_is_ignored() {
        let mut surface = RecordingSurface::new(10, 10);
        let mut renderer = Renderer::new(&mut surface).expect("renderer");
        renderer.set_scale(0.0);
        renderer.set_scale(f32::NAN);
        assert_eq!(renderer.scale(), 1.0);
    }

    #[test]
    fn draws_into_pixel_surface() {
        let mut surface = PixelSurface::new(8, 8);
        let mut renderer = Renderer::new(&mut surface).expect("renderer").with_scale(2.0);
        renderer.draw_rect(1.0, 1.0, 1.0, 1.0, Color::YELLOW);
        assert_eq!(surface.pixel(2, 2), Some([255, 255, 0, 255]));
        assert_eq!(surface.pixel(3, 3), Some([255, 255, 0, 255]));
        assert_eq!(surface.pixel(1, 1), Some([0, 0, 0, 0]));
        renderer.clear();
        assert_eq!(surface.pixel(2, 2), Some([0, 0, 0, 0]));
    }
}
