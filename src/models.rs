//! Data types shared across the conversion pipeline.
//!
//! Raw cells come from the world reader; keys are the semantic identity of a
//! cell before it is resolved against a tileset; resolved tiles carry the
//! owning tileset name and a local id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

/// Tileset name used for cells without a tile. Always maps to GID 0.
pub const EMPTY_TILESET: &str = "empty";

/// Tileset name under which unresolved keys are allocated.
pub const GENERATED_TILESET: &str = "generated_tiles";

/// Edge length of one tile in document pixels.
pub const TILE_PIXELS: i64 = 8;

/// Edge length of one world region in tiles.
pub const REGION_SIZE: usize = 32;

// ============================================================================
// Raw world cells
// ============================================================================

/// Raw per-position surface descriptor as decoded by the world reader.
///
/// Ids are kept signed: the upstream reader hands out sign-extended values
/// that are masked during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCell {
    pub foreground_material: i32,
    pub foreground_variant: i32,
    pub foreground_mod: i32,
    pub background_material: i32,
    pub background_variant: i32,
    pub background_mod: i32,
    pub liquid: i32,
    pub liquid_infinite: bool,
}

impl TileCell {
    pub fn foreground(&self) -> RawMaterial {
        RawMaterial {
            material: self.foreground_material,
            variant: self.foreground_variant,
            mod_id: self.foreground_mod,
        }
    }

    pub fn background(&self) -> RawMaterial {
        RawMaterial {
            material: self.background_material,
            variant: self.background_variant,
            mod_id: self.background_mod,
        }
    }

    pub fn liquid(&self) -> RawLiquid {
        RawLiquid {
            liquid: self.liquid,
            infinite: self.liquid_infinite,
        }
    }
}

/// Numeric material triple of one cell layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMaterial {
    pub material: i32,
    pub variant: i32,
    pub mod_id: i32,
}

/// Numeric liquid pair of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLiquid {
    pub liquid: i32,
    pub infinite: bool,
}

// ============================================================================
// Named cell inputs
// ============================================================================

/// A material cell after id→name lookup, before key normalization.
///
/// An empty `material` means the cell holds no material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MaterialInput {
    pub material: String,
    pub variant: u8,
    pub mod_name: Option<String>,
}

/// A liquid cell after id→name lookup. An empty `liquid` means no liquid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LiquidInput {
    pub liquid: String,
    pub source: bool,
}

// ============================================================================
// Keys
// ============================================================================

/// Material identity: name plus optional color variant (1-8) and mod.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub material: String,
    pub color_variant: Option<u8>,
    pub mod_name: Option<String>,
}

impl MaterialKey {
    /// Build a key, normalizing variant 0 and blank mods to absent.
    pub fn new(material: impl Into<String>, color_variant: u8, mod_name: Option<&str>) -> Self {
        Self {
            material: material.into(),
            color_variant: (color_variant != 0).then_some(color_variant),
            mod_name: mod_name
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }
}

/// Liquid identity: name plus whether the cell is an infinite source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiquidKey {
    pub liquid: String,
    pub source: bool,
}

impl LiquidKey {
    pub fn new(liquid: impl Into<String>, source: bool) -> Self {
        Self {
            liquid: liquid.into(),
            source,
        }
    }
}

/// Tagged identity of a cell, shared by tileset lookup and missing-tile
/// allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TileKey {
    Material(MaterialKey),
    Liquid(LiquidKey),
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileKey::Material(key) => {
                write!(f, "material '{}'", key.material)?;
                if let Some(variant) = key.color_variant {
                    write!(f, " with colorVariant '{}'", variant)?;
                }
                if let Some(mod_name) = &key.mod_name {
                    write!(f, " and mod '{}'", mod_name)?;
                }
                Ok(())
            }
            TileKey::Liquid(key) => write!(f, "liquid '{}' with source={}", key.liquid, key.source),
        }
    }
}

impl From<MaterialKey> for TileKey {
    fn from(key: MaterialKey) -> Self {
        TileKey::Material(key)
    }
}

impl From<LiquidKey> for TileKey {
    fn from(key: LiquidKey) -> Self {
        TileKey::Liquid(key)
    }
}

// ============================================================================
// Resolved tiles
// ============================================================================

/// A cell resolved to a tileset-local id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTile {
    pub tileset: Arc<str>,
    pub local_id: u32,
}

impl ResolvedTile {
    pub fn new(tileset: Arc<str>, local_id: u32) -> Self {
        Self { tileset, local_id }
    }

    pub fn is_empty(&self) -> bool {
        &*self.tileset == EMPTY_TILESET
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A tile position in document space (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TilePoint {
    pub x: i64,
    pub y: i64,
}

impl TilePoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// A persistent monster.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterRecord {
    /// World position, Y-up.
    pub position: (i64, i64),
    pub seed: Option<Number>,
    pub monster_type: String,
    pub unique_parameters: Map<String, Value>,
}

/// An npc.
#[derive(Debug, Clone, PartialEq)]
pub struct NpcRecord {
    /// World position, Y-up.
    pub position: (i64, i64),
    pub seed: Option<Number>,
    pub species: String,
    pub type_name: String,
    pub overrides: Map<String, Value>,
}

/// One connection carried by an output pin. `target` uses the world's Y-up axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireLink {
    pub target: (i64, i64),
    pub index: usize,
}

/// A placed object with its wire pins.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub name: String,
    /// Tile position, already flipped to the document's top-left origin.
    pub tile_position: TilePoint,
    pub orientation_index: Option<i64>,
    pub parameters: Map<String, Value>,
    /// Connections per input pin, in pin order.
    pub input_pins: Vec<Vec<WireLink>>,
    /// Connections per output pin, in pin order.
    pub output_pins: Vec<Vec<WireLink>>,
}

/// Seed rendered as an unsigned 64-bit decimal string.
///
/// Negative seeds are sign-extended 64-bit values from the upstream reader
/// and get `2^64` added back. An absent seed renders as `None`, as existing
/// maps store it.
pub fn seed_to_string(seed: Option<&Number>) -> String {
    match seed {
        Some(number) => match number.as_i64() {
            Some(value) if value < 0 => (i128::from(value) + (1i128 << 64)).to_string(),
            _ => number.to_string(),
        },
        None => "None".to_string(),
    }
}
