//! Data records consumed by the engine: maps, tilesets, sprites, characters,
//! placed entities and the project reference tying them together.
//!
//! These are produced by the editor backend as JSON and are immutable once the
//! engine has been initialised with them. Field names follow the producer
//! (snake_case), with camelCase aliases for the reference fields that older
//! payloads still emit (`tilesetId`, `spriteId`, ...).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Tile index meaning "no tile in this cell". Renderers skip it.
pub const EMPTY_TILE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub data: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMap {
    pub id: String,
    pub name: String,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    #[serde(default, alias = "tilesetId")]
    pub tileset_id: Option<String>,
    /// Composited bottom-to-top.
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub entities: Vec<PlacedEntity>,
}

impl TileMap {
    pub fn tile_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Map extent in pixels for a given on-screen tile size.
    pub fn pixel_size(&self, tile_width: f32, tile_height: f32) -> (f32, f32) {
        (
            self.width as f32 * tile_width,
            self.height as f32 * tile_height,
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "Map '{}' validation failed: size {}x{} must be non-zero",
                self.id, self.width, self.height
            ));
        }
        let expected = self.tile_count();
        for layer in &self.layers {
            if layer.data.len() != expected {
                return Err(format!(
                    "Map '{}' validation failed: layer '{}' has {} cells, expected {}",
                    self.id,
                    layer.name,
                    layer.data.len(),
                    expected
                ));
            }
        }
        let mut entity_ids = HashSet::new();
        for entity in &self.entities {
            if !entity_ids.insert(entity.id.as_str()) {
                return Err(format!(
                    "Map '{}' validation failed: duplicate entity id '{}'",
                    self.id, entity.id
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub id: String,
    pub name: String,
    pub image_source: String,
    /// Atlas cell width in source pixels.
    pub tile_width: u32,
    /// Atlas cell height in source pixels.
    pub tile_height: u32,
}

impl Tileset {
    /// Descriptor used when a map references a tileset that was not supplied.
    pub fn default_descriptor() -> Self {
        Self {
            id: "ts1".to_string(),
            name: "Fixed Tileset".to_string(),
            image_source: "/tileset_fixed.png".to_string(),
            tile_width: 128,
            tile_height: 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub id: String,
    pub name: String,
    pub image_source: String,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Animation name -> frame indices into the sprite sheet grid.
    #[serde(default)]
    pub animations: HashMap<String, Vec<u32>>,
}

impl Sprite {
    /// Four-direction character sheet used when a character has no sprite of its own.
    pub fn default_character(id: &str) -> Self {
        let animations = [
            ("idle", vec![0]),
            ("walk_down", vec![0, 1, 2, 3]),
            ("walk_left", vec![4, 5, 6, 7]),
            ("walk_right", vec![8, 9, 10, 11]),
            ("walk_up", vec![12, 13, 14, 15]),
        ]
        .into_iter()
        .map(|(name, frames)| (name.to_string(), frames))
        .collect();

        Self {
            id: id.to_string(),
            name: "Default Character Sprite".to_string(),
            image_source: "/charset_transparent.png".to_string(),
            frame_width: 256,
            frame_height: 256,
            animations,
        }
    }

    pub fn frames(&self, animation: &str) -> Option<&[u32]> {
        self.animations.get(animation).map(Vec::as_slice)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(format!(
                "Sprite '{}' validation failed: frame size {}x{} must be non-zero",
                self.id, self.frame_width, self.frame_height
            ));
        }
        for (name, frames) in &self.animations {
            if frames.is_empty() {
                return Err(format!(
                    "Sprite '{}' validation failed: animation '{}' has no frames",
                    self.id, name
                ));
            }
        }
        Ok(())
    }

    /// Check that every frame index addresses a cell inside an image of the given size.
    pub fn check_frames(&self, image_width: u32, image_height: u32) -> Result<(), String> {
        let cols = image_width / self.frame_width.max(1);
        let rows = image_height / self.frame_height.max(1);
        let capacity = cols * rows;
        for (name, frames) in &self.animations {
            if let Some(&bad) = frames.iter().find(|&&f| f >= capacity) {
                return Err(format!(
                    "Sprite '{}' animation '{}' references frame {} but the {}x{} sheet holds {} frames",
                    self.id, name, bad, image_width, image_height, capacity
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hp: i32,
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub defense: i32,
    #[serde(default, alias = "spriteId")]
    pub sprite_id: Option<String>,
    /// Some payloads embed the sprite record instead of referencing it.
    #[serde(default)]
    pub sprite: Option<Sprite>,
}

impl Character {
    /// Minimal record for a character id the catalog does not know about.
    pub fn stub(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            hp: 0,
            attack: 0,
            defense: 0,
            sprite_id: None,
            sprite: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    PlayerSpawn {
        #[serde(default, alias = "spriteId")]
        sprite_id: Option<String>,
    },
    Npc {
        #[serde(default, alias = "spriteId")]
        sprite_id: Option<String>,
        #[serde(default, alias = "characterId")]
        character_id: Option<String>,
    },
    Interaction,
    /// Any tag this engine does not know. Rendered as a magenta marker.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedEntity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
    #[serde(flatten)]
    pub kind: EntityKind,
}

impl PlacedEntity {
    /// Sprite reference; only spawn points and NPCs can carry one.
    pub fn sprite_id(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::PlayerSpawn { sprite_id } | EntityKind::Npc { sprite_id, .. } => {
                sprite_id.as_deref()
            }
            EntityKind::Interaction | EntityKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameProjectRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub maps: Vec<String>,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub tilesets: Vec<String>,
    #[serde(default, alias = "userId")]
    pub user_id: String,
}

/// Everything the engine needs for one preview session, as delivered in a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectBundle {
    pub project: GameProjectRef,
    #[serde(default)]
    pub maps: Vec<TileMap>,
    #[serde(default)]
    pub tilesets: Vec<Tileset>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub sprites: Vec<Sprite>,
}

impl ProjectBundle {
    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        let bundle: ProjectBundle =
            serde_json::from_str(raw).map_err(|e| format!("Failed to parse bundle JSON: {e}"))?;
        validate_bundle(&bundle)?;
        Ok(bundle)
    }
}

pub fn load_bundle_from_path(path: &Path) -> Result<ProjectBundle, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read bundle {}: {e}", path.display()))?;
    ProjectBundle::from_json_str(&raw).map_err(|e| format!("{}: {e}", path.display()))
}

fn validate_bundle(bundle: &ProjectBundle) -> Result<(), String> {
    // Identifier clashes make catalog lookups ambiguous, so they are rejected
    // outright. Shape problems inside a map only degrade rendering.
    let mut map_ids = HashSet::new();
    for map in &bundle.maps {
        if !map_ids.insert(map.id.as_str()) {
            return Err(format!(
                "Bundle validation failed: duplicate map id '{}'",
                map.id
            ));
        }
        if let Err(err) = map.validate() {
            log::warn!("{err}");
        }
    }

    let mut sprite_ids = HashSet::new();
    for sprite in &bundle.sprites {
        if !sprite_ids.insert(sprite.id.as_str()) {
            return Err(format!(
                "Bundle validation failed: duplicate sprite id '{}'",
                sprite.id
            ));
        }
    }

    for map_id in &bundle.project.maps {
        if !map_ids.contains(map_id.as_str()) {
            log::warn!(
                "Project '{}' lists map '{}' that is not part of the bundle",
                bundle.project.id,
                map_id
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map(data: Vec<i32>) -> TileMap {
        TileMap {
            id: "m1".to_string(),
            name: "Test Map".to_string(),
            width: 2,
            height: 2,
            tileset_id: Some("ts1".to_string()),
            layers: vec![Layer {
                name: "Ground".to_string(),
                data,
            }],
            entities: Vec::new(),
        }
    }

    #[test]
    fn map_validate_accepts_matching_layer_length() {
        assert!(sample_map(vec![0, 1, -1, 2]).validate().is_ok());
    }

    #[test]
    fn map_validate_rejects_short_layer() {
        let err = sample_map(vec![0, 1, 2]).validate().expect_err("short layer");
        assert!(err.contains("has 3 cells, expected 4"));
    }

    #[test]
    fn map_pixel_size_uses_tile_size() {
        let map = sample_map(vec![0; 4]);
        assert_eq!(map.pixel_size(32.0, 16.0), (64.0, 32.0));
    }

    #[test]
    fn map_parses_camel_case_tileset_reference() {
        let json = r#"{
            "id": "m1", "name": "Town", "width": 1, "height": 1,
            "tilesetId": "ts9",
            "layers": [{ "name": "Ground", "data": [3] }]
        }"#;
        let map: TileMap = serde_json::from_str(json).expect("map parses");
        assert_eq!(map.tileset_id.as_deref(), Some("ts9"));
        assert!(map.entities.is_empty());
    }

    #[test]
    fn entity_variants_parse_from_type_tag() {
        let json = r#"[
            { "id": "e1", "type": "player_spawn", "x": 1, "y": 2, "name": "Start", "spriteId": "hero" },
            { "id": "e2", "type": "npc", "x": 3, "y": 4, "name": "Bob", "sprite_id": "bob", "characterId": "c1" },
            { "id": "e3", "type": "interaction", "x": 5, "y": 6, "name": "Chest" },
            { "id": "e4", "type": "teleporter", "x": 7, "y": 8, "name": "???" }
        ]"#;
        let entities: Vec<PlacedEntity> = serde_json::from_str(json).expect("entities parse");

        assert_eq!(
            entities[0].kind,
            EntityKind::PlayerSpawn {
                sprite_id: Some("hero".to_string())
            }
        );
        assert_eq!(entities[1].sprite_id(), Some("bob"));
        assert!(matches!(
            &entities[1].kind,
            EntityKind::Npc { character_id: Some(c), .. } if c == "c1"
        ));
        assert_eq!(entities[2].kind, EntityKind::Interaction);
        assert_eq!(entities[2].sprite_id(), None);
        assert_eq!(entities[3].kind, EntityKind::Unknown);
        assert_eq!((entities[3].x, entities[3].y), (7, 8));
    }

    #[test]
    fn sprite_validate_rejects_empty_animation() {
        let mut sprite = Sprite::default_character("hero");
        sprite.animations.insert("broken".to_string(), Vec::new());
        let err = sprite.validate().expect_err("empty animation");
        assert!(err.contains("'broken' has no frames"));
    }

    #[test]
    fn sprite_check_frames_against_sheet_size() {
        let sprite = Sprite::default_character("hero");
        // 4x4 grid of 256px frames holds indices 0..16.
        assert!(sprite.check_frames(1024, 1024).is_ok());
        let err = sprite.check_frames(1024, 512).expect_err("sheet too small");
        assert!(err.contains("holds 8 frames"));
    }

    #[test]
    fn default_character_sprite_has_directional_walks() {
        let sprite = Sprite::default_character("c1");
        assert_eq!(sprite.id, "c1");
        assert_eq!(sprite.frames("idle"), Some(&[0][..]));
        assert_eq!(sprite.frames("walk_right"), Some(&[8, 9, 10, 11][..]));
        assert!(sprite.frames("jump").is_none());
    }

    #[test]
    fn bundle_rejects_duplicate_map_ids() {
        let json = r#"{
            "project": { "id": "p1", "name": "Demo", "maps": ["m1"], "characters": [], "userId": "u1" },
            "maps": [
                { "id": "m1", "name": "A", "width": 1, "height": 1, "layers": [] },
                { "id": "m1", "name": "B", "width": 1, "height": 1, "layers": [] }
            ]
        }"#;
        let err = ProjectBundle::from_json_str(json).expect_err("duplicate ids");
        assert!(err.contains("duplicate map id 'm1'"));
    }

    #[test]
    fn bundle_parses_with_optional_sections_missing() {
        let json = r#"{
            "project": { "id": "p1", "name": "Demo", "maps": [], "characters": ["c1"], "user_id": "u1" }
        }"#;
        let bundle = ProjectBundle::from_json_str(json).expect("bundle parses");
        assert_eq!(bundle.project.user_id, "u1");
        assert!(bundle.maps.is_empty());
        assert!(bundle.sprites.is_empty());
    }
}
