//! Engine lifecycle: load a project's first map and player, then drive the
//! scene from host display refreshes.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tpe_assets::{AssetLoader, ImageSource, LoadOptions, MAX_RETRIES};
use tpe_core::input::{InputManager, KeyboardHub};
use tpe_core::model::{Character, GameProjectRef, Sprite, TileMap, Tileset};
use tpe_core::time::{Clock, FrameStats, GameLoop, SystemClock};
use tpe_devtools::{DiagnosticsHook, NoopDiagnostics, RenderStats, SceneSnapshot};
use tpe_render::{DrawingSurface, MapRenderer, Renderer, SpriteRenderer};

use crate::scene::Scene;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Uniform scale from world pixels to surface pixels.
    pub scale: f32,
    pub asset_timeout_ms: u64,
    pub asset_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            asset_timeout_ms: 15_000,
            asset_retries: 3,
        }
    }
}

impl EngineConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::new(Duration::from_millis(self.asset_timeout_ms), self.asset_retries)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse engine config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &EngineConfig) -> Result<(), String> {
    if !(config.scale.is_finite() && config.scale > 0.0) {
        return Err("Engine config validation failed: scale must be > 0".to_string());
    }
    if config.asset_timeout_ms == 0 {
        return Err("Engine config validation failed: asset_timeout_ms must be > 0".to_string());
    }
    if config.asset_retries > MAX_RETRIES {
        return Err(format!(
            "Engine config validation failed: asset_retries must be <= {MAX_RETRIES}"
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Frame-time state shared with the game loop callback.
struct Stage {
    renderer: Renderer,
    input: InputManager,
    scene: Scene,
    last_draw_calls: u64,
}

impl Stage {
    fn frame(&mut self, dt_ms: f64) {
        self.renderer.reset_draw_calls();
        self.renderer.clear();
        self.scene.update(dt_ms, &self.input);
        self.scene.render(&mut self.renderer);
        self.last_draw_calls = self.renderer.draw_calls();
    }

    fn render_stats(&self) -> RenderStats {
        RenderStats {
            draw_calls: self.last_draw_calls,
            character_count: self.scene.characters().len(),
            entity_count: self.scene.entities().len(),
        }
    }
}

pub struct GameEngine {
    stage: Rc<RefCell<Stage>>,
    game_loop: GameLoop<Box<dyn FnMut(f64)>>,
    loader: AssetLoader,
    config: EngineConfig,
    characters: HashMap<String, Character>,
    sprites: HashMap<String, Arc<Sprite>>,
    diagnostics: Box<dyn DiagnosticsHook>,
    state: EngineState,
}

impl GameEngine {
    pub fn new(
        surface: &mut dyn DrawingSurface,
        source: Arc<dyn ImageSource>,
        keyboard: &KeyboardHub,
        config: EngineConfig,
    ) -> Result<Self, String> {
        Self::with_clock(surface, source, keyboard, config, Box::new(SystemClock::new()))
    }

    pub fn with_clock(
        surface: &mut dyn DrawingSurface,
        source: Arc<dyn ImageSource>,
        keyboard: &KeyboardHub,
        config: EngineConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self, String> {
        let renderer = Renderer::new(surface)?.with_scale(config.scale);
        let stage = Rc::new(RefCell::new(Stage {
            renderer,
            input: InputManager::new(keyboard),
            scene: Scene::new(),
            last_draw_calls: 0,
        }));

        let frame_stage = stage.clone();
        let callback: Box<dyn FnMut(f64)> =
            Box::new(move |dt_ms| frame_stage.borrow_mut().frame(dt_ms));

        Ok(Self {
            stage,
            game_loop: GameLoop::with_clock(callback, clock),
            loader: AssetLoader::new(source),
            config,
            characters: HashMap::new(),
            sprites: HashMap::new(),
            diagnostics: Box::new(NoopDiagnostics),
            state: EngineState::Idle,
        })
    }

    pub fn set_diagnostics(&mut self, hook: Box<dyn DiagnosticsHook>) {
        self.diagnostics = hook;
    }

    /// Character records used to resolve the project's character ids.
    pub fn register_characters(&mut self, characters: impl IntoIterator<Item = Character>) {
        for character in characters {
            self.characters.insert(character.id.clone(), character);
        }
    }

    /// Sprite records used for the player and for map entities.
    pub fn register_sprites(&mut self, sprites: impl IntoIterator<Item = Sprite>) {
        for sprite in sprites {
            if let Err(err) = sprite.validate() {
                log::warn!("{err}");
            }
            self.sprites.insert(sprite.id.clone(), Arc::new(sprite));
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.game_loop.stats()
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        self.stage.borrow().scene.snapshot()
    }

    pub fn with_scene<R>(&self, f: impl FnOnce(&Scene) -> R) -> R {
        f(&self.stage.borrow().scene)
    }

    /// Build the scene for the first map. Asset failures degrade to fallback
    /// images or skipped characters; an empty map list leaves the engine inert.
    pub async fn init(&mut self, project: &GameProjectRef, maps: &[TileMap], tilesets: &[Tileset]) {
        log::info!(
            "Initialising project '{}' ({} maps, {} tilesets)",
            project.name,
            maps.len(),
            tilesets.len()
        );
        let Some(first_map) = maps.first() else {
            log::warn!("No maps provided to the engine; nothing to show");
            return;
        };
        if let Err(err) = first_map.validate() {
            log::warn!("{err}");
        }
        let map = Arc::new(first_map.clone());
        let options = self.config.load_options();

        let tileset = map
            .tileset_id
            .as_ref()
            .and_then(|id| tilesets.iter().find(|t| &t.id == id))
            .cloned()
            .unwrap_or_else(|| {
                log::warn!(
                    "Map '{}' has no usable tileset reference; using the built-in tileset",
                    map.name
                );
                Tileset::default_descriptor()
            });

        log::info!("Loading tileset image {}", tileset.image_source);
        let tileset_image = self.loader.load_image(&tileset.image_source, &options).await;
        if !tileset_image.success {
            log::error!(
                "Tileset load failed: {}",
                tileset_image.error.as_deref().unwrap_or("unknown error")
            );
            log::warn!("Using fallback tileset image");
        }

        let (tile_width, tile_height) = (tileset.tile_width as f32, tileset.tile_height as f32);
        log::info!(
            "Map '{}': {}x{} tiles, {} layers, tileset '{}' ({}x{})",
            map.name,
            map.width,
            map.height,
            map.layers.len(),
            tileset.name,
            tileset.tile_width,
            tileset.tile_height
        );

        let mut scene = Scene::new();
        scene.set_tile_size(tile_width, tile_height);
        scene.load_map(map.clone());
        scene.set_map_renderer(MapRenderer::new(
            map.clone(),
            tileset,
            tileset_image.asset,
            None,
        ));

        match project.characters.first() {
            Some(character_id) => {
                self.add_player(&mut scene, character_id, &map, (tile_width, tile_height), &options)
                    .await;
            }
            None => log::info!("No characters in project; skipping character rendering"),
        }

        let entity_sprites = self.load_entity_sprites(&map, &options).await;
        scene.load_entities(&map.entities, tile_width, tile_height, &entity_sprites);

        let snapshot = scene.snapshot();
        self.stage.borrow_mut().scene = scene;
        if self.state == EngineState::Stopped {
            self.state = EngineState::Idle;
        }
        self.diagnostics.scene_ready(&snapshot);
        log::info!("Engine initialised with map '{}'", map.name);
    }

    async fn add_player(
        &self,
        scene: &mut Scene,
        character_id: &str,
        map: &TileMap,
        tile: (f32, f32),
        options: &LoadOptions,
    ) {
        let character = self
            .characters
            .get(character_id)
            .cloned()
            .unwrap_or_else(|| Character::stub(character_id));
        let sprite = self.resolve_character_sprite(&character);

        log::info!("Loading character sprite {}", sprite.image_source);
        let loaded = self.loader.load_image(&sprite.image_source, options).await;
        if !loaded.success {
            log::error!(
                "Character sprite load failed: {}",
                loaded.error.as_deref().unwrap_or("unknown error")
            );
            log::warn!("Skipping character rendering");
            return;
        }

        let (width, height) = map.pixel_size(tile.0, tile.1);
        let (x, y) = (width / 2.0, height / 2.0);
        log::info!("Added character '{}' at ({}, {})", character.name, x, y);
        scene.add_character(character, SpriteRenderer::new(sprite, loaded.asset), x, y);
    }

    /// Embedded sprite, then catalog entry, then the built-in character sheet.
    fn resolve_character_sprite(&self, character: &Character) -> Arc<Sprite> {
        if let Some(sprite) = &character.sprite {
            return Arc::new(sprite.clone());
        }
        let sprite_id = character.sprite_id.as_deref();
        if let Some(sprite) = sprite_id.and_then(|id| self.sprites.get(id)) {
            return sprite.clone();
        }
        if let Some(id) = sprite_id {
            log::warn!("Sprite '{id}' not registered; using the default character sprite");
        }
        Arc::new(Sprite::default_character(sprite_id.unwrap_or("default")))
    }

    /// Sprite renderers for every entity sprite that resolves and loads.
    async fn load_entity_sprites(
        &self,
        map: &TileMap,
        options: &LoadOptions,
    ) -> HashMap<String, SpriteRenderer> {
        let sprite_ids: BTreeSet<&str> = map.entities.iter().filter_map(|e| e.sprite_id()).collect();
        let sprites: Vec<Arc<Sprite>> = sprite_ids
            .into_iter()
            .filter_map(|id| {
                let sprite = self.sprites.get(id).cloned();
                if sprite.is_none() {
                    log::warn!("Entity sprite '{id}' not registered; drawing placeholders");
                }
                sprite
            })
            .collect();
        if sprites.is_empty() {
            return HashMap::new();
        }

        let paths: Vec<String> = sprites
            .iter()
            .map(|s| s.image_source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let images: HashMap<String, _> = self
            .loader
            .preload_images(&paths, options)
            .await
            .into_iter()
            .map(|result| (result.path.clone(), result))
            .collect();

        sprites
            .into_iter()
            .filter_map(|sprite| match images.get(&sprite.image_source) {
                Some(result) if result.success => Some((
                    sprite.id.clone(),
                    SpriteRenderer::new(sprite.clone(), result.asset.clone()),
                )),
                _ => {
                    log::warn!("Entity sprite '{}' failed to load; drawing placeholders", sprite.id);
                    None
                }
            })
            .collect()
    }

    pub fn start(&mut self) {
        if self.state == EngineState::Running {
            return;
        }
        self.game_loop.start();
        self.state = EngineState::Running;
        log::info!("Engine started");
    }

    pub fn pause(&mut self) {
        self.game_loop.stop();
        if self.state == EngineState::Running {
            self.state = EngineState::Paused;
            log::info!("Engine paused");
        }
    }

    pub fn resume(&mut self) {
        self.start();
    }

    /// Halt, wipe the surface and drop the scene. A new `init` is needed
    /// before anything is drawn again.
    pub fn stop(&mut self) {
        self.game_loop.stop();
        let mut stage = self.stage.borrow_mut();
        stage.renderer.clear();
        stage.scene = Scene::new();
        self.state = EngineState::Stopped;
        log::info!("Engine stopped");
    }

    /// Host display refresh. Returns whether a frame ran.
    pub fn frame(&mut self, timestamp_ms: f64) -> bool {
        if !self.game_loop.on_refresh(timestamp_ms) {
            return false;
        }
        let stats = self.game_loop.stats();
        let render = self.stage.borrow().render_stats();
        self.diagnostics.frame_end(&stats, &render);
        true
    }
}
