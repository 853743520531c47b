//! Everything drawn in one frame and the per-frame player movement.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use tpe_core::input::{InputManager, ARROW_DOWN, ARROW_LEFT, ARROW_RIGHT, ARROW_UP};
use tpe_core::model::{Character, EntityKind, PlacedEntity, TileMap};
use tpe_devtools::{CharacterSnapshot, EntitySnapshot, SceneSnapshot};
use tpe_render::{EntityRenderer, MapRenderer, Renderer, SpriteRenderer};

/// Player walking speed in world pixels per millisecond.
pub const MOVE_SPEED_PX_PER_MS: f32 = 0.1;
/// On-screen side of a character (and of a map cell) unless the engine says otherwise.
pub const CHARACTER_SIZE: f32 = 32.0;

/// Key checked first wins; only one direction applies per frame.
const MOVES: [(&str, Vec2, &str); 4] = [
    (ARROW_RIGHT, Vec2::X, "walk_right"),
    (ARROW_LEFT, Vec2::NEG_X, "walk_left"),
    (ARROW_DOWN, Vec2::Y, "walk_down"),
    (ARROW_UP, Vec2::NEG_Y, "walk_up"),
];
const IDLE: &str = "idle";

pub struct SceneCharacter {
    pub data: Character,
    pub position: Vec2,
    pub sprite: SpriteRenderer,
}

pub struct Scene {
    map: Option<Arc<TileMap>>,
    map_renderer: Option<MapRenderer>,
    characters: Vec<SceneCharacter>,
    entities: Vec<EntityRenderer>,
    tile_size: f32,
    /// Row height of the drawn map; differs from `tile_size` for non-square tilesets.
    tile_height: f32,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            map: None,
            map_renderer: None,
            characters: Vec::new(),
            entities: Vec::new(),
            tile_size: CHARACTER_SIZE,
            tile_height: CHARACTER_SIZE,
        }
    }

    pub fn load_map(&mut self, map: Arc<TileMap>) {
        self.map = Some(map);
    }

    pub fn map(&self) -> Option<&TileMap> {
        self.map.as_deref()
    }

    pub fn set_map_renderer(&mut self, renderer: MapRenderer) {
        self.map_renderer = Some(renderer);
    }

    /// On-screen map cell size. The width is also the side of a drawn
    /// character.
    pub fn set_tile_size(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.tile_size = width;
            self.tile_height = height;
        } else {
            log::warn!("Ignoring non-positive tile size {width}x{height}");
        }
    }

    /// Character side.
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tile_height(&self) -> f32 {
        self.tile_height
    }

    /// The first character added is the player.
    pub fn add_character(&mut self, data: Character, sprite: SpriteRenderer, x: f32, y: f32) {
        self.characters.push(SceneCharacter {
            data,
            position: Vec2::new(x, y),
            sprite,
        });
    }

    pub fn characters(&self) -> &[SceneCharacter] {
        &self.characters
    }

    pub fn player_position(&self) -> Option<Vec2> {
        self.characters.first().map(|c| c.position)
    }

    /// Replace the placed entities. `sprites` is keyed by sprite id; entities
    /// whose sprite is missing get a placeholder.
    pub fn load_entities(
        &mut self,
        entities: &[PlacedEntity],
        tile_width: f32,
        tile_height: f32,
        sprites: &HashMap<String, SpriteRenderer>,
    ) {
        self.entities = entities
            .iter()
            .map(|entity| {
                let sprite = entity.sprite_id().and_then(|id| sprites.get(id)).cloned();
                EntityRenderer::new(entity.clone(), sprite, tile_width, tile_height)
            })
            .collect();
    }

    pub fn entities(&self) -> Vec<&PlacedEntity> {
        self.entities.iter().map(EntityRenderer::entity).collect()
    }

    pub fn entity_by_id(&self, id: &str) -> Option<&PlacedEntity> {
        self.entities
            .iter()
            .map(EntityRenderer::entity)
            .find(|entity| entity.id == id)
    }

    pub fn entities_at_position(&self, x: i32, y: i32) -> Vec<&PlacedEntity> {
        self.entities
            .iter()
            .map(EntityRenderer::entity)
            .filter(|entity| entity.x == x && entity.y == y)
            .collect()
    }

    pub fn update(&mut self, dt_ms: f64, input: &InputManager) {
        for entity in &mut self.entities {
            entity.update(dt_ms);
        }
        for character in &mut self.characters {
            character.sprite.update(dt_ms);
        }

        let bounds = self.movement_bounds();
        let Some(player) = self.characters.first_mut() else {
            return;
        };

        let step = MOVE_SPEED_PX_PER_MS * dt_ms as f32;
        match MOVES.iter().find(|(key, _, _)| input.is_key_down(key)) {
            Some(&(_, direction, animation)) => {
                player.sprite.set_animation(animation);
                let next = player.position + direction * step;
                player.position = match bounds {
                    Some(max) => next.clamp(Vec2::ZERO, max),
                    None => next,
                };
            }
            None => player.sprite.set_animation(IDLE),
        }
    }

    /// Largest top-left position that keeps the character inside the map.
    fn movement_bounds(&self) -> Option<Vec2> {
        let map = self.map.as_ref()?;
        let (width, height) = map.pixel_size(self.tile_size, self.tile_height);
        Some(Vec2::new(
            (width - self.tile_size).max(0.0),
            (height - self.tile_size).max(0.0),
        ))
    }

    /// Map, then entities, then characters.
    pub fn render(&self, renderer: &mut Renderer) {
        if let Some(map_renderer) = &self.map_renderer {
            map_renderer.render(renderer);
        }
        for entity in &self.entities {
            entity.render(renderer);
        }
        let side = self.tile_size;
        for character in &self.characters {
            character.sprite.render(
                renderer,
                character.position.x,
                character.position.y,
                Some((side, side)),
            );
        }
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            map_id: self.map.as_ref().map(|m| m.id.clone()),
            tile_size: self.tile_size,
            characters: self
                .characters
                .iter()
                .map(|c| CharacterSnapshot {
                    id: c.data.id.clone(),
                    name: c.data.name.clone(),
                    x: c.position.x,
                    y: c.position.y,
                    animation: c.sprite.animation().to_string(),
                    frame_index: c.sprite.frame_index(),
                })
                .collect(),
            entities: self
                .entities
                .iter()
                .map(|e| {
                    let entity = e.entity();
                    EntitySnapshot {
                        id: entity.id.clone(),
                        kind: kind_label(&entity.kind).to_string(),
                        x: entity.x,
                        y: entity.y,
                        has_sprite: e.has_sprite(),
                    }
                })
                .collect(),
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_label(kind: &EntityKind) -> &'static str {
    match kind {
        EntityKind::PlayerSpawn { .. } => "player_spawn",
        EntityKind::Npc { .. } => "npc",
        EntityKind::Interaction => "interaction",
        EntityKind::Unknown => "unknown",
    }
}
