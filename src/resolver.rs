//! Resolving cell identities against tilesets
//!
//! Tilesets are searched in the order given. For a material the candidate
//! keys are tried in priority order inside each tileset:
//!
//! 1. `(name, variant, mod)` exactly
//! 2. `(name, -, mod)` when a variant was present
//! 3. `(name, variant, -)` when a mod was present
//!
//! A key with neither variant nor mod is its own bare fallback. The first
//! tileset with any match wins. Liquids use their exact key only. Anything
//! left unresolved is handed to the [`MissingTileAllocator`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::grid::Grid;
use crate::missing::MissingTileAllocator;
use crate::models::{
    LiquidInput, LiquidKey, MaterialInput, MaterialKey, ResolvedTile, TileKey, EMPTY_TILESET,
    GENERATED_TILESET,
};
use crate::tileset::TileLookup;

/// Highest color variant a material cell may carry.
pub const MAX_COLOR_VARIANT: u8 = 8;

/// Resolves material and liquid cells to `(tileset, local id)` pairs.
#[derive(Debug, Clone)]
pub struct TileIdentityResolver {
    tilesets: Vec<TileLookup>,
    empty: Arc<str>,
    generated: Arc<str>,
}

impl TileIdentityResolver {
    /// Create a resolver over tilesets in lookup order.
    pub fn new(tilesets: Vec<TileLookup>) -> Self {
        Self {
            tilesets,
            empty: Arc::from(EMPTY_TILESET),
            generated: Arc::from(GENERATED_TILESET),
        }
    }

    /// Name under which unresolved keys are placed.
    pub fn generated_name(&self) -> &str {
        &self.generated
    }

    pub fn empty_tile(&self) -> ResolvedTile {
        ResolvedTile::new(self.empty.clone(), 0)
    }

    /// Key of a material cell, or `None` for an empty cell.
    ///
    /// A cell is empty when its name is blank or its variant is out of range.
    pub fn material_key(input: &MaterialInput) -> Option<MaterialKey> {
        if input.material.trim().is_empty() || input.variant > MAX_COLOR_VARIANT {
            return None;
        }
        Some(MaterialKey::new(
            input.material.clone(),
            input.variant,
            input.mod_name.as_deref(),
        ))
    }

    /// Key of a liquid cell, or `None` for an empty cell.
    pub fn liquid_key(input: &LiquidInput) -> Option<LiquidKey> {
        if input.liquid.trim().is_empty() {
            return None;
        }
        Some(LiquidKey::new(input.liquid.clone(), input.source))
    }

    /// Candidate keys for a material, highest priority first.
    pub fn material_candidates(key: &MaterialKey) -> Vec<TileKey> {
        let mut candidates = vec![TileKey::Material(key.clone())];
        if key.color_variant.is_some() {
            candidates.push(TileKey::Material(MaterialKey {
                color_variant: None,
                ..key.clone()
            }));
        }
        if key.mod_name.is_some() {
            candidates.push(TileKey::Material(MaterialKey {
                mod_name: None,
                ..key.clone()
            }));
        }
        candidates
    }

    /// First tileset match over `candidates`, in tileset order.
    pub fn lookup(&self, candidates: &[TileKey]) -> Option<ResolvedTile> {
        self.tilesets.iter().find_map(|tileset| {
            candidates
                .iter()
                .find_map(|key| tileset.get(key))
                .map(|local_id| ResolvedTile::new(tileset.name.clone(), local_id))
        })
    }

    fn resolve_key(
        &self,
        key: TileKey,
        candidates: &[TileKey],
        allocator: &mut MissingTileAllocator,
    ) -> ResolvedTile {
        match self.lookup(candidates) {
            Some(tile) => tile,
            None => ResolvedTile::new(self.generated.clone(), allocator.allocate(&key)),
        }
    }

    pub fn resolve_material(
        &self,
        input: &MaterialInput,
        allocator: &mut MissingTileAllocator,
    ) -> ResolvedTile {
        let Some(key) = Self::material_key(input) else {
            return self.empty_tile();
        };
        let candidates = Self::material_candidates(&key);
        self.resolve_key(TileKey::Material(key), &candidates, allocator)
    }

    pub fn resolve_liquid(
        &self,
        input: &LiquidInput,
        allocator: &mut MissingTileAllocator,
    ) -> ResolvedTile {
        let Some(key) = Self::liquid_key(input) else {
            return self.empty_tile();
        };
        let key = TileKey::Liquid(key);
        self.resolve_key(key.clone(), std::slice::from_ref(&key), allocator)
    }

    /// Resolve a whole material layer, row 0 first.
    pub fn resolve_material_grid(
        &self,
        grid: &Grid<MaterialInput>,
        allocator: &mut MissingTileAllocator,
    ) -> Grid<ResolvedTile> {
        let mut cache: HashMap<&MaterialInput, ResolvedTile> = HashMap::new();
        Grid::from_fn(grid.width(), grid.height(), |x, y| match grid.get(x, y) {
            Some(input) => cache
                .entry(input)
                .or_insert_with(|| self.resolve_material(input, allocator))
                .clone(),
            None => self.empty_tile(),
        })
    }

    /// Resolve a whole liquid layer, row 0 first.
    pub fn resolve_liquid_grid(
        &self,
        grid: &Grid<LiquidInput>,
        allocator: &mut MissingTileAllocator,
    ) -> Grid<ResolvedTile> {
        let mut cache: HashMap<&LiquidInput, ResolvedTile> = HashMap::new();
        Grid::from_fn(grid.width(), grid.height(), |x, y| match grid.get(x, y) {
            Some(input) => cache
                .entry(input)
                .or_insert_with(|| self.resolve_liquid(input, allocator))
                .clone(),
            None => self.empty_tile(),
        })
    }
}
