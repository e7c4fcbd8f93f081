//! Placeholder allocation for keys no input tileset resolves
//!
//! One [`MissingTileAllocator`] lives for a whole conversion run and is shared
//! by every layer and both key kinds, so ids are gap-free and follow the order
//! in which keys were first seen. After resolution the allocator's table is
//! turned into a tileset in the same schema as the inputs.

use indexmap::IndexMap;

use crate::models::{TileKey, TILE_PIXELS};
use crate::tileset::{GeneratedTileset, TileImage, TileProperties};

/// Default image reference given to every synthesized tile.
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "./../../../../tiled/packed/../packed/invalid.png";

/// Ordered key → local id table for unresolved keys.
#[derive(Debug, Clone, Default)]
pub struct MissingTileAllocator {
    ids: IndexMap<TileKey, u32>,
}

impl MissingTileAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `key`, assigning the next free id on first sight.
    ///
    /// A first sighting is reported once; later calls return the same id
    /// without side effects.
    pub fn allocate(&mut self, key: &TileKey) -> u32 {
        if let Some(id) = self.ids.get(key) {
            return *id;
        }
        let id = self.ids.len() as u32;
        tracing::warn!(
            target: "world2tiled::resolve",
            local_id = id,
            "{} not found in any tileset. Assigning local ID '{}'",
            key,
            id
        );
        self.ids.insert(key.clone(), id);
        id
    }

    pub fn get(&self, key: &TileKey) -> Option<u32> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Keys with their ids, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (&TileKey, u32)> {
        self.ids.iter().map(|(key, id)| (key, *id))
    }

    /// Build the tileset describing every allocated key.
    pub fn synthesize(&self, name: &str, placeholder_image: &str) -> GeneratedTileset {
        let mut tiles = IndexMap::with_capacity(self.ids.len());
        let mut tileproperties = IndexMap::with_capacity(self.ids.len());

        for (key, id) in self.iter() {
            tiles.insert(
                id.to_string(),
                TileImage {
                    image: placeholder_image.to_string(),
                },
            );
            tileproperties.insert(id.to_string(), TileProperties::from_key(key));
        }

        GeneratedTileset {
            name: name.to_string(),
            tilewidth: TILE_PIXELS as u32,
            tileheight: TILE_PIXELS as u32,
            spacing: 0,
            margin: 0,
            tilecount: self.ids.len() as u32,
            tiles,
            tileproperties,
        }
    }
}
