use std::sync::Arc;

use tpe_core::model::{TileMap, Tileset, EMPTY_TILE};

use crate::renderer::Renderer;
use crate::texture::Image;

/// Draws every layer of a tile map from one tileset atlas.
///
/// Source cells use the tileset's `tile_width`/`tile_height`; destination
/// cells default to the same size but can be overridden so a 128 px atlas can
/// be shown as 32 px tiles.
pub struct MapRenderer {
    map: Arc<TileMap>,
    tileset: Tileset,
    image: Image,
    dest_tile: (f32, f32),
}

impl MapRenderer {
    pub fn new(map: Arc<TileMap>, tileset: Tileset, image: Image, dest_tile: Option<(f32, f32)>) -> Self {
        let dest_tile =
            dest_tile.unwrap_or((tileset.tile_width as f32, tileset.tile_height as f32));
        Self {
            map,
            tileset,
            image,
            dest_tile,
        }
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    pub fn dest_tile_size(&self) -> (f32, f32) {
        self.dest_tile
    }

    /// Atlas columns; at least 1 even when the image is narrower than a tile.
    pub fn atlas_columns(&self) -> u32 {
        match self.tileset.tile_width {
            0 => 1,
            tw => (self.image.width() / tw).max(1),
        }
    }

    /// Layers in order, cells in row-major order. Returns tiles drawn.
    pub fn render(&self, renderer: &mut Renderer) -> usize {
        let (sw, sh) = (self.tileset.tile_width as f32, self.tileset.tile_height as f32);
        let (dw, dh) = self.dest_tile;
        let map_width = self.map.width.max(1) as usize;
        let cols = i64::from(self.atlas_columns());
        let mut drawn = 0;

        for layer in &self.map.layers {
            for (i, &tile) in layer.data.iter().enumerate() {
                if tile == EMPTY_TILE {
                    continue;
                }
                let dx = (i % map_width) as f32 * dw;
                let dy = (i / map_width) as f32 * dh;

                let tile = i64::from(tile);
                let sx = (tile % cols) as f32 * sw;
                let sy = tile.div_euclid(cols) as f32 * sh;

                renderer.draw_tile(&self.image, sx, sy, sw, sh, dx, dy, dw, dh);
                drawn += 1;
            }
        }
        drawn
    }
}
