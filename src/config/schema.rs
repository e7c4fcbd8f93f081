//! Configuration schema types for the conversion config file
//!
//! The file holds a `worldToTiled` object with four tables:
//!
//! ```json
//! {
//!   "worldToTiled": {
//!     "material": { "1": "dirt", "65535": "empty" },
//!     "mod": { "0": "empty", "3": "grass" },
//!     "liquid": { "0": "empty", "1": "water" },
//!     "wire": { "smallwallswitch": { "o_0": [0, 0] } }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::loader::ConfigError;
use crate::models::TilePoint;

/// Name that marks a lookup entry as "nothing here".
pub const EMPTY_NAME: &str = "empty";

/// Numeric id (as decimal string) → name.
pub type IdTable = HashMap<String, String>;

/// Pin name (`i_{n}` / `o_{n}`) → `[dx, dy]` tile offset.
pub type PinOffsets = HashMap<String, [i64; 2]>;

/// Direction of a wire pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    /// Short tag used in pin names and node keys.
    pub fn tag(self) -> &'static str {
        match self {
            PinDirection::Input => "i",
            PinDirection::Output => "o",
        }
    }

    /// Pin name as written in the offset table, e.g. `i_0`.
    pub fn pin_name(self, index: usize) -> String {
        format!("{}_{}", self.tag(), index)
    }
}

/// Lookup tables for one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Material id → material name
    pub material: IdTable,
    /// Material mod id → mod name
    #[serde(rename = "mod")]
    pub mods: IdTable,
    /// Liquid id → liquid name
    pub liquid: IdTable,
    /// Object type → pin offsets
    pub wire: HashMap<String, PinOffsets>,
}

impl ConversionConfig {
    pub fn material_name(&self, id: u16) -> Option<&str> {
        self.material.get(&id.to_string()).map(String::as_str)
    }

    pub fn mod_name(&self, id: u16) -> Option<&str> {
        self.mods.get(&id.to_string()).map(String::as_str)
    }

    pub fn liquid_name(&self, id: u8) -> Option<&str> {
        self.liquid.get(&id.to_string()).map(String::as_str)
    }

    /// Offset of pin `direction`/`index` on objects of type `object`.
    ///
    /// The offset is authored in the world's Y-up axis.
    pub fn wire_offset(
        &self,
        object: &str,
        direction: PinDirection,
        index: usize,
    ) -> Result<TilePoint, ConfigError> {
        let pin = direction.pin_name(index);
        self.wire
            .get(object)
            .and_then(|pins| pins.get(&pin))
            .map(|[dx, dy]| TilePoint::new(*dx, *dy))
            .ok_or_else(|| ConfigError::MissingWireOffset {
                object: object.to_string(),
                pin,
            })
    }
}
