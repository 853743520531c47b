use std::sync::Arc;

use tpe_core::animation::AnimationState;
use tpe_core::model::Sprite;

use crate::renderer::Renderer;
use crate::texture::Image;

/// One animated instance of a sprite sheet.
///
/// The sheet record and decoded image are shared; the animation state is per
/// instance, so several characters can use the same sheet out of phase.
#[derive(Clone)]
pub struct SpriteRenderer {
    sprite: Arc<Sprite>,
    image: Image,
    state: AnimationState,
}

impl SpriteRenderer {
    pub fn new(sprite: Arc<Sprite>, image: Image) -> Self {
        if let Err(err) = sprite.check_frames(image.width(), image.height()) {
            log::warn!("{err}");
        }
        Self {
            sprite,
            image,
            state: AnimationState::default(),
        }
    }

    pub fn sprite(&self) -> &Sprite {
        &self.sprite
    }

    pub fn animation(&self) -> &str {
        &self.state.current
    }

    pub fn frame_index(&self) -> usize {
        self.state.frame_index
    }

    pub fn update(&mut self, dt_ms: f64) {
        let frame_count = self.sprite.frames(&self.state.current).map_or(0, <[u32]>::len);
        self.state.tick(dt_ms, frame_count);
    }

    /// Draw the current frame at `(x, y)`, at `size` or the native frame size.
    /// Returns false when the current animation has nothing to draw.
    pub fn render(&self, renderer: &mut Renderer, x: f32, y: f32, size: Option<(f32, f32)>) -> bool {
        let Some(&frame) = self
            .sprite
            .frames(&self.state.current)
            .and_then(|frames| frames.get(self.state.frame_index))
        else {
            return false;
        };

        let (fw, fh) = (self.sprite.frame_width, self.sprite.frame_height);
        let cols = match fw {
            0 => 1,
            fw => (self.image.width() / fw).max(1),
        };
        let sx = (frame % cols * fw) as f32;
        let sy = (frame / cols * fh) as f32;
        let (dw, dh) = size.unwrap_or((fw as f32, fh as f32));

        renderer.draw_tile(&self.image, sx, sy, fw as f32, fh as f32, x, y, dw, dh);
        true
    }

    /// Switch animation; ignored when already playing `name` or the sheet
    /// does not define it.
    pub fn set_animation(&mut self, name: &str) {
        let defined = self.sprite.animations.contains_key(name);
        if self.state.switch_to(name, defined) {
            log::trace!("Sprite '{}' -> animation '{}'", self.sprite.id, name);
        }
    }
}
