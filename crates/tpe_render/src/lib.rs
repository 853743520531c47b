pub mod entity_renderer;
pub mod map_renderer;
pub mod recording;
pub mod renderer;
pub mod sprite_renderer;
pub mod surface;
pub mod texture;

pub use entity_renderer::EntityRenderer;
pub use map_renderer::MapRenderer;
pub use recording::{DrawOp, RecordingSurface};
pub use renderer::Renderer;
pub use sprite_renderer::SpriteRenderer;
pub use surface::{Color, Context2d, DrawingSurface, PixelSurface, Rect};
pub use texture::Image;
