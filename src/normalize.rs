//! Raw id → name normalization
//!
//! Turns the numeric ids of a world cell into named material and liquid
//! inputs using the config's lookup tables. Ids are masked to the widths the
//! upstream reader stores them in (16-bit materials and mods, 8-bit variants
//! and liquids) before lookup. Unknown ids are reported once per distinct id.

use std::collections::HashSet;

use crate::config::{ConversionConfig, EMPTY_NAME};
use crate::models::{LiquidInput, MaterialInput, RawLiquid, RawMaterial};

pub const MATERIAL_MASK: i32 = 0xFFFF;
pub const MOD_MASK: i32 = 0xFFFF;
pub const VARIANT_MASK: i32 = 0xFF;
pub const LIQUID_MASK: i32 = 0xFF;

/// Normalizes raw cells against the lookup tables of one run.
#[derive(Debug)]
pub struct Normalizer<'a> {
    config: &'a ConversionConfig,
    unknown_materials: HashSet<u16>,
    unknown_mods: HashSet<u16>,
    unknown_liquids: HashSet<u8>,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self {
            config,
            unknown_materials: HashSet::new(),
            unknown_mods: HashSet::new(),
            unknown_liquids: HashSet::new(),
        }
    }

    /// Name the material, variant and mod of one cell layer.
    ///
    /// An unknown material id yields an empty name (an empty cell); an
    /// unknown mod id yields no mod.
    pub fn material(&mut self, raw: RawMaterial) -> MaterialInput {
        let material_id = (raw.material & MATERIAL_MASK) as u16;
        let mod_id = (raw.mod_id & MOD_MASK) as u16;
        let variant = (raw.variant & VARIANT_MASK) as u8;

        let material = match self.config.material_name(material_id) {
            Some(EMPTY_NAME) => String::new(),
            Some(name) => name.to_string(),
            None => {
                if self.unknown_materials.insert(material_id) {
                    tracing::warn!(
                        target: "world2tiled::normalize",
                        material_id,
                        "Failed to convert material ID '{}' to material name",
                        material_id
                    );
                }
                String::new()
            }
        };

        let mod_name = match self.config.mod_name(mod_id) {
            Some(EMPTY_NAME) => None,
            Some(name) => Some(name.to_string()),
            None => {
                if self.unknown_mods.insert(mod_id) {
                    tracing::warn!(
                        target: "world2tiled::normalize",
                        mod_id,
                        "Failed to convert material mod ID '{}' to material mod name",
                        mod_id
                    );
                }
                None
            }
        };

        MaterialInput {
            material,
            variant,
            mod_name,
        }
    }

    /// Name the liquid of one cell. An unknown liquid id yields no liquid.
    pub fn liquid(&mut self, raw: RawLiquid) -> LiquidInput {
        let liquid_id = (raw.liquid & LIQUID_MASK) as u8;

        let liquid = match self.config.liquid_name(liquid_id) {
            Some(EMPTY_NAME) => String::new(),
            Some(name) => name.to_string(),
            None => {
                if self.unknown_liquids.insert(liquid_id) {
                    tracing::warn!(
                        target: "world2tiled::normalize",
                        liquid_id,
                        "Failed to convert liquid ID '{}' to liquid name",
                        liquid_id
                    );
                }
                String::new()
            }
        };

        LiquidInput {
            liquid,
            source: raw.infinite,
        }
    }

    /// Distinct material ids that had no table entry.
    pub fn unknown_material_count(&self) -> usize {
        self.unknown_materials.len()
    }

    /// Distinct mod ids that had no table entry.
    pub fn unknown_mod_count(&self) -> usize {
        self.unknown_mods.len()
    }

    /// Distinct liquid ids that had no table entry.
    pub fn unknown_liquid_count(&self) -> usize {
        self.unknown_liquids.len()
    }
}
