//! Wire graph reconstruction
//!
//! Objects record their wiring per pin: each connected output pin lists the
//! `(target position, target pin)` pairs it drives. While objects are
//! extracted, connected input pins are registered under their owner's tile
//! position and connected output pins under their own pin position. Once all
//! objects are in, every output → input pair whose input was registered
//! becomes one polyline connector. Targets that were never registered (e.g.
//! outside the processed area) are skipped.

use indexmap::IndexMap;
use std::fmt;

use crate::config::{ConfigError, ConversionConfig, PinDirection};
use crate::document::{MapObject, Point};
use crate::models::{ObjectRecord, TilePoint, TILE_PIXELS};

/// Identity of a wire pin: a tile position, a direction and a pin index.
///
/// Displays as `{x}_{y}_{i|o}_{index}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireNodeKey {
    pub position: TilePoint,
    pub direction: PinDirection,
    pub index: usize,
}

impl WireNodeKey {
    pub fn input(position: TilePoint, index: usize) -> Self {
        Self {
            position,
            direction: PinDirection::Input,
            index,
        }
    }

    pub fn output(position: TilePoint, index: usize) -> Self {
        Self {
            position,
            direction: PinDirection::Output,
            index,
        }
    }
}

impl fmt::Display for WireNodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.position.x,
            self.position.y,
            self.direction.tag(),
            self.index
        )
    }
}

/// Absolute position of a pin: the object's (flipped) tile position plus
/// an offset authored in the world's Y-up axis.
pub fn pin_position(object: TilePoint, offset: TilePoint) -> TilePoint {
    TilePoint::new(object.x + offset.x, object.y - offset.y)
}

/// Accumulates wire pins during extraction and emits connectors afterwards.
#[derive(Debug, Clone)]
pub struct WireGraphBuilder {
    world_height: i64,
    /// Input key (owner position) → absolute pin position
    inputs: IndexMap<WireNodeKey, TilePoint>,
    /// Output key (pin position) → input keys it drives, in connection order
    outputs: IndexMap<WireNodeKey, Vec<WireNodeKey>>,
}

impl WireGraphBuilder {
    pub fn new(world_height: usize) -> Self {
        Self {
            world_height: world_height as i64,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Convert a Y-up world row to the document's top-left origin.
    pub fn flip_y(&self, y: i64) -> i64 {
        self.world_height - y - 1
    }

    /// Register every connected pin of one object.
    ///
    /// Pins without connections are ignored and need no offset entry.
    pub fn register_object(
        &mut self,
        object: &ObjectRecord,
        config: &ConversionConfig,
    ) -> Result<(), ConfigError> {
        for (index, links) in object.input_pins.iter().enumerate() {
            if links.is_empty() {
                continue;
            }
            let offset = config.wire_offset(&object.name, PinDirection::Input, index)?;
            self.inputs.insert(
                WireNodeKey::input(object.tile_position, index),
                pin_position(object.tile_position, offset),
            );
        }

        for (index, links) in object.output_pins.iter().enumerate() {
            if links.is_empty() {
                continue;
            }
            let offset = config.wire_offset(&object.name, PinDirection::Output, index)?;
            let key = WireNodeKey::output(pin_position(object.tile_position, offset), index);
            for link in links {
                let target = TilePoint::new(link.target.0, self.flip_y(link.target.1));
                let target_key = WireNodeKey::input(target, link.index);
                self.outputs.entry(key).or_default().push(target_key);
            }
        }

        Ok(())
    }

    pub fn input(&self, key: &WireNodeKey) -> Option<TilePoint> {
        self.inputs.get(key).copied()
    }

    pub fn targets(&self, key: &WireNodeKey) -> Option<&[WireNodeKey]> {
        self.outputs.get(key).map(Vec::as_slice)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Emit one connector per resolvable output → input pair.
    ///
    /// Ids are assigned from `starting_id` upward; the next free id is
    /// returned alongside the connectors.
    pub fn build_polylines(&self, starting_id: u32) -> (Vec<MapObject>, u32) {
        let mut polylines = Vec::new();
        let mut current_id = starting_id;

        for (output, targets) in &self.outputs {
            let start = output.position;
            for target in targets {
                let Some(end) = self.inputs.get(target) else {
                    tracing::debug!(
                        target: "world2tiled::wiring",
                        output = %output,
                        input = %target,
                        "wire.dangling"
                    );
                    continue;
                };

                polylines.push(MapObject::connector(
                    current_id,
                    Point {
                        x: start.x * TILE_PIXELS,
                        y: start.y * TILE_PIXELS,
                    },
                    Point {
                        x: (end.x - start.x) * TILE_PIXELS,
                        y: (end.y - start.y) * TILE_PIXELS,
                    },
                ));
                current_id += 1;
            }
        }

        (polylines, current_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinOffsets;
    use crate::models::WireLink;
    use serde_json::Map;

    const HEIGHT: usize = 10;

    fn config() -> ConversionConfig {
        let mut config = ConversionConfig::default();
        let mut switch = PinOffsets::new();
        switch.insert("o_0".to_string(), [1, 0]);
        config.wire.insert("switch".to_string(), switch);
        let mut lamp = PinOffsets::new();
        lamp.insert("i_0".to_string(), [0, 0]);
        lamp.insert("i_1".to_string(), [0, 1]);
        config.wire.insert("lamp".to_string(), lamp);
        config
    }

    fn object(
        name: &str,
        at: (i64, i64),
        input_pins: Vec<Vec<WireLink>>,
        output_pins: Vec<Vec<WireLink>>,
    ) -> ObjectRecord {
        ObjectRecord {
            name: name.to_string(),
            tile_position: TilePoint::new(at.0, at.1),
            orientation_index: None,
            parameters: Map::new(),
            input_pins,
            output_pins,
        }
    }

    /// Link carried in world coordinates towards document row `y`.
    fn link_to(x: i64, y: i64, index: usize) -> WireLink {
        WireLink {
            target: (x, HEIGHT as i64 - y - 1),
            index,
        }
    }

    #[test]
    fn test_key_display() {
        assert_eq!(WireNodeKey::input(TilePoint::new(3, 4), 1).to_string(), "3_4_i_1");
        assert_eq!(WireNodeKey::output(TilePoint::new(-1, 0), 0).to_string(), "-1_0_o_0");
    }

    #[test]
    fn test_single_connector() {
        let mut builder = WireGraphBuilder::new(HEIGHT);
        let config = config();
        let a = object("switch", (2, 2), vec![], vec![vec![link_to(5, 2, 0)]]);
        let b = object("lamp", (5, 2), vec![vec![link_to(3, 2, 0)]], vec![]);
        builder.register_object(&a, &config).unwrap();
        builder.register_object(&b, &config).unwrap();

        assert_eq!(
            builder.input(&WireNodeKey::input(TilePoint::new(5, 2), 0)),
            Some(TilePoint::new(5, 2))
        );
        let (polylines, next) = builder.build_polylines(1);
        assert_eq!(next, 2);
        assert_eq!(polylines.len(), 1);
        let connector = &polylines[0];
        assert_eq!((connector.x, connector.y), (24, 16));
        assert_eq!(
            connector.polyline.as_deref(),
            Some(&[Point { x: 0, y: 0 }, Point { x: 16, y: 0 }][..])
        );
    }

    #[test]
    fn test_dangling_connection_dropped() {
        let mut builder = WireGraphBuilder::new(HEIGHT);
        let config = config();
        let a = object(
            "switch",
            (2, 2),
            vec![],
            vec![vec![link_to(9, 9, 0), link_to(5, 2, 0)]],
        );
        let b = object("lamp", (5, 2), vec![vec![link_to(3, 2, 0)]], vec![]);
        builder.register_object(&a, &config).unwrap();
        builder.register_object(&b, &config).unwrap();

        let (polylines, next) = builder.build_polylines(100);
        assert_eq!(polylines.len(), 1);
        assert_eq!(polylines[0].id, 100);
        assert_eq!(next, 101);
    }

    #[test]
    fn test_input_offset_uses_flipped_axis() {
        let mut builder = WireGraphBuilder::new(HEIGHT);
        let config = config();
        let lamp = object("lamp", (5, 5), vec![vec![], vec![link_to(0, 0, 0)]], vec![]);
        builder.register_object(&lamp, &config).unwrap();

        assert_eq!(builder.input_count(), 1);
        assert_eq!(
            builder.input(&WireNodeKey::input(TilePoint::new(5, 5), 1)),
            Some(TilePoint::new(5, 4))
        );
    }

    #[test]
    fn test_targets_keep_connection_order() {
        let mut builder = WireGraphBuilder::new(HEIGHT);
        let config = config();
        let a = object(
            "switch",
            (0, 0),
            vec![],
            vec![vec![link_to(4, 4, 0), link_to(6, 6, 1)]],
        );
        builder.register_object(&a, &config).unwrap();
        let targets = builder
            .targets(&WireNodeKey::output(TilePoint::new(1, 0), 0))
            .unwrap();
        let keys: Vec<String> = targets.iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["4_4_i_0", "6_6_i_1"]);
    }

    #[test]
    fn test_missing_offset_is_config_error() {
        let mut builder = WireGraphBuilder::new(HEIGHT);
        let config = config();
        let unknown = object("door", (0, 0), vec![vec![link_to(1, 1, 0)]], vec![]);
        let err = builder.register_object(&unknown, &config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingWireOffset { ref pin, .. } if pin == "i_0"));
    }

    #[test]
    fn test_unconnected_pins_need_no_offset() {
        let mut builder = WireGraphBuilder::new(HEIGHT);
        let config = config();
        let idle = object("door", (0, 0), vec![vec![]], vec![vec![]]);
        builder.register_object(&idle, &config).unwrap();
        assert_eq!(builder.input_count(), 0);
        assert_eq!(builder.output_count(), 0);
        assert_eq!(builder.build_polylines(5), (vec![], 5));
    }
}
