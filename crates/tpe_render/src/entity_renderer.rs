use tpe_core::model::{EntityKind, PlacedEntity};

use crate::renderer::Renderer;
use crate::sprite_renderer::SpriteRenderer;
use crate::surface::Color;

const PLACEHOLDER_ALPHA: f32 = 0.5;
/// Inset on each side of the tile, as a fraction of the tile size.
const PLACEHOLDER_PADDING: f32 = 0.25;

pub fn placeholder_color(kind: &EntityKind) -> Color {
    match kind {
        EntityKind::PlayerSpawn { .. } => Color::GREEN,
        EntityKind::Npc { .. } => Color::BLUE,
        EntityKind::Interaction => Color::YELLOW,
        EntityKind::Unknown => Color::MAGENTA,
    }
}

/// A placed map entity: its sprite when it has one, otherwise a translucent
/// marker coloured by kind.
pub struct EntityRenderer {
    entity: PlacedEntity,
    sprite: Option<SpriteRenderer>,
    tile_width: f32,
    tile_height: f32,
}

impl EntityRenderer {
    pub fn new(
        entity: PlacedEntity,
        sprite: Option<SpriteRenderer>,
        tile_width: f32,
        tile_height: f32,
    ) -> Self {
        let sprite = match (&entity.kind, sprite) {
            (EntityKind::PlayerSpawn { .. } | EntityKind::Npc { .. }, sprite) => sprite,
            (EntityKind::Interaction | EntityKind::Unknown, Some(_)) => {
                log::warn!(
                    "Entity '{}' cannot carry a sprite; drawing a placeholder",
                    entity.id
                );
                None
            }
            (EntityKind::Interaction | EntityKind::Unknown, None) => None,
        };
        Self {
            entity,
            sprite,
            tile_width,
            tile_height,
        }
    }

    pub fn entity(&self) -> &PlacedEntity {
        &self.entity
    }

    pub fn set_entity(&mut self, entity: PlacedEntity) {
        self.entity = entity;
    }

    pub fn has_sprite(&self) -> bool {
        self.sprite.is_some()
    }

    pub fn update(&mut self, dt_ms: f64) {
        if let Some(sprite) = &mut self.sprite {
            sprite.update(dt_ms);
        }
    }

    pub fn render(&self, renderer: &mut Renderer) {
        let x = self.entity.x as f32 * self.tile_width;
        let y = self.entity.y as f32 * self.tile_height;

        match &self.sprite {
            Some(sprite) => {
                sprite.render(renderer, x, y, Some((self.tile_width, self.tile_height)));
            }
            None => {
                let pad_x = self.tile_width * PLACEHOLDER_PADDING;
                let pad_y = self.tile_height * PLACEHOLDER_PADDING;
                renderer.draw_rect(
                    x + pad_x,
                    y + pad_y,
                    self.tile_width - pad_x * 2.0,
                    self.tile_height - pad_y * 2.0,
                    placeholder_color(&self.entity.kind).with_alpha(PLACEHOLDER_ALPHA),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingSurface;
    use crate::surface::Rect;
    use crate::texture::Image;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tpe_core::model::Sprite;

    fn entity(kind: EntityKind, x: i32, y: i32) -> PlacedEntity {
        PlacedEntity {
            id: "e1".to_string(),
            name: "Entity".to_string(),
            x,
            y,
            kind,
        }
    }

    fn sprite() -> SpriteRenderer {
        let sheet = Sprite {
            id: "s1".to_string(),
            name: "Guard".to_string(),
            image_source: "guard.png".to_string(),
            frame_width: 16,
            frame_height: 16,
            animations: HashMap::from([("idle".to_string(), vec![0, 1])]),
        };
        SpriteRenderer::new(Arc::new(sheet), Image::blank(32, 16))
    }

    fn draw(renderer_under_test: &EntityRenderer) -> RecordingSurface {
        let mut surface = RecordingSurface::new(256, 256);
        let mut renderer = Renderer::new(&mut surface).expect("renderer");
        renderer_under_test.render(&mut renderer);
        surface
    }

    #[test]
    fn placeholder_is_centered_half_size_and_translucent() {
        let entity = EntityRenderer::new(entity(EntityKind::Interaction, 2, 1), None, 32.0, 32.0);
        let fills = draw(&entity).fill_ops();
        assert_eq!(
            fills,
            vec![(
                Rect::new(72.0, 40.0, 16.0, 16.0),
                Color::YELLOW.with_alpha(0.5)
            )]
        );
    }

    #[test]
    fn placeholder_colors_follow_kind() {
        assert_eq!(
            placeholder_color(&EntityKind::PlayerSpawn { sprite_id: None }),
            Color::GREEN
        );
        assert_eq!(
            placeholder_color(&EntityKind::Npc {
                sprite_id: None,
                character_id: None
            }),
            Color::BLUE
        );
        assert_eq!(placeholder_color(&EntityKind::Unknown), Color::MAGENTA);
    }

    #[test]
    fn sprite_is_drawn_at_tile_position_and_size() {
        let kind = EntityKind::Npc {
            sprite_id: Some("s1".to_string()),
            character_id: None,
        };
        let entity = EntityRenderer::new(entity(kind, 3, 2), Some(sprite()), 32.0, 32.0);
        let surface = draw(&entity);
        assert!(surface.fill_ops().is_empty());
        assert_eq!(
            surface.image_ops(),
            vec![(
                Rect::new(0.0, 0.0, 16.0, 16.0),
                Rect::new(96.0, 64.0, 32.0, 32.0)
            )]
        );
    }

    #[test]
    fn interaction_entities_drop_sprites() {
        let entity = EntityRenderer::new(entity(EntityKind::Interaction, 0, 0), Some(sprite()), 32.0, 32.0);
        assert!(!entity.has_sprite());
        assert_eq!(draw(&entity).fill_ops().len(), 1);
    }

    #[test]
    fn update_animates_sprite() {
        let kind = EntityKind::PlayerSpawn {
            sprite_id: Some("s1".to_string()),
        };
        let mut entity = EntityRenderer::new(entity(kind, 0, 0), Some(sprite()), 32.0, 32.0);
        entity.update(100.0);
        let ops = draw(&entity).image_ops();
        assert_eq!(ops[0].0, Rect::new(16.0, 0.0, 16.0, 16.0));
    }
}
