//! Map assembly
//!
//! Builds the ten-layer map document from encoded tile layers, extracted
//! entities and the wire graph. Object ids come from one counter that runs
//! over placed objects, then wire connectors, then monsters, then npcs.

use crate::document::{Layer, MapObject, Property, TiledMap};
use crate::entities::ExtractedEntities;
use crate::models::{seed_to_string, MonsterRecord, NpcRecord, ObjectRecord, TILE_PIXELS};
use crate::tileset::TilesetRef;
use crate::wiring::WireGraphBuilder;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use std::io;

/// Layer names in document order.
pub const LAYER_NAMES: [&str; 10] = [
    "back", "liquid", "front", "mods", "objects", "wiring", "monsters", "npcs", "anchors", "items",
];

pub const WIRING_COLOR: &str = "#ffff00";
pub const MONSTER_COLOR: &str = "#ff0000";
pub const NPC_COLOR: &str = "#00ff00";

const BACK_OPACITY: f64 = 0.5;

/// The three encoded tile layers of a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLayers {
    pub back: String,
    pub liquid: String,
    pub front: String,
}

/// Assembles the map document of one conversion.
#[derive(Debug)]
pub struct MapAssembler<'a> {
    width: usize,
    height: usize,
    tilesets: Vec<TilesetRef>,
    entities: &'a ExtractedEntities,
    wiring: &'a WireGraphBuilder,
}

impl<'a> MapAssembler<'a> {
    pub fn new(
        width: usize,
        height: usize,
        tilesets: Vec<TilesetRef>,
        entities: &'a ExtractedEntities,
        wiring: &'a WireGraphBuilder,
    ) -> Self {
        Self {
            width,
            height,
            tilesets,
            entities,
            wiring,
        }
    }

    /// Build the document.
    pub fn assemble(self, layers: EncodedLayers) -> TiledMap {
        let mut next_id = 1u32;

        let objects = self.place_objects(&mut next_id);
        let (connectors, after_wiring) = self.wiring.build_polylines(next_id);
        next_id = after_wiring;
        let monsters = self.place_monsters(&mut next_id);
        let npcs = self.place_npcs(&mut next_id);

        let [back, liquid, front, mods, objects_name, wiring, monsters_name, npcs_name, anchors, items] =
            LAYER_NAMES;

        let mut monster_layer = Layer::objects(7, monsters_name);
        if !monsters.is_empty() {
            monster_layer = monster_layer.with_color(MONSTER_COLOR);
        }
        let mut npc_layer = Layer::objects(8, npcs_name);
        if !npcs.is_empty() {
            npc_layer = npc_layer.with_color(NPC_COLOR);
        }

        let mut map = TiledMap::new(self.width, self.height, self.tilesets);
        map.layers = vec![
            Layer::tiles(1, back, BACK_OPACITY, layers.back, self.width, self.height),
            Layer::tiles(2, liquid, 1.0, layers.liquid, self.width, self.height),
            Layer::tiles(3, front, 1.0, layers.front, self.width, self.height),
            Layer::objects(4, mods),
            Layer::objects(5, objects_name).with_objects(objects),
            Layer::objects(6, wiring)
                .with_color(WIRING_COLOR)
                .with_objects(connectors),
            monster_layer.with_objects(monsters),
            npc_layer.with_objects(npcs),
            Layer::objects(9, anchors),
            Layer::objects(10, items),
        ];
        map.nextlayerid = map.layers.len() as u32 + 1;
        map.nextobjectid = next_id;
        map
    }

    fn place_objects(&self, next_id: &mut u32) -> Vec<MapObject> {
        self.entities
            .objects
            .iter()
            .map(|object| {
                let marker = MapObject::marker(
                    *next_id,
                    object.tile_position.x * TILE_PIXELS,
                    object.tile_position.y * TILE_PIXELS,
                    object_properties(object),
                );
                *next_id += 1;
                marker
            })
            .collect()
    }

    fn place_monsters(&self, next_id: &mut u32) -> Vec<MapObject> {
        self.entities
            .monsters
            .iter()
            .map(|monster| {
                let (x, y) = self.to_pixels(monster.position);
                let marker = MapObject::marker(*next_id, x, y, monster_properties(monster));
                *next_id += 1;
                marker
            })
            .collect()
    }

    fn place_npcs(&self, next_id: &mut u32) -> Vec<MapObject> {
        self.entities
            .npcs
            .iter()
            .map(|npc| {
                let (x, y) = self.to_pixels(npc.position);
                let marker = MapObject::marker(*next_id, x, y, npc_properties(npc));
                *next_id += 1;
                marker
            })
            .collect()
    }

    /// Pixel position of a Y-up world tile position.
    fn to_pixels(&self, (x, y): (i64, i64)) -> (i64, i64) {
        (
            x * TILE_PIXELS,
            (self.height as i64 - y - 1) * TILE_PIXELS,
        )
    }
}

fn object_properties(object: &ObjectRecord) -> Vec<Property> {
    let direction = if object.orientation_index == Some(1) {
        "right"
    } else {
        "left"
    };
    let mut properties = vec![
        Property::string("object", object.name.clone()),
        Property::string("tilesetDirection", direction),
    ];
    push_parameters(&mut properties, &object.parameters);
    properties
}

fn monster_properties(monster: &MonsterRecord) -> Vec<Property> {
    let mut properties = vec![
        Property::string("seed", seed_to_string(monster.seed.as_ref())),
        Property::string("monster", monster.monster_type.clone()),
    ];
    push_parameters(&mut properties, &monster.unique_parameters);
    properties
}

fn npc_properties(npc: &NpcRecord) -> Vec<Property> {
    let mut properties = vec![
        Property::string("seed", seed_to_string(npc.seed.as_ref())),
        Property::string("typeName", npc.type_name.clone()),
        Property::string("npc", npc.species.clone()),
    ];
    push_parameters(&mut properties, &npc.overrides);
    properties
}

/// Single-line JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize parameters the way existing maps store them: `{"a": [1, 2]}`.
fn parameters_json(parameters: &Map<String, Value>) -> String {
    let mut bytes = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, SpacedFormatter);
    match parameters.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => Value::Object(parameters.clone()).to_string(),
    }
}

/// Append a serialized `parameters` property when the set is non-empty.
fn push_parameters(properties: &mut Vec<Property>, parameters: &Map<String, Value>) {
    if parameters.is_empty() {
        return;
    }
    properties.push(Property::string("parameters", parameters_json(parameters)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConversionConfig, PinOffsets};
    use crate::document::LayerKind;
    use crate::models::{TilePoint, WireLink};
    use serde_json::{json, Number};

    const WIDTH: usize = 16;
    const HEIGHT: usize = 10;

    fn layers() -> EncodedLayers {
        EncodedLayers {
            back: "b".to_string(),
            liquid: "l".to_string(),
            front: "f".to_string(),
        }
    }

    fn object(name: &str, at: (i64, i64), orientation: Option<i64>) -> ObjectRecord {
        ObjectRecord {
            name: name.to_string(),
            tile_position: TilePoint::new(at.0, at.1),
            orientation_index: orientation,
            parameters: Map::new(),
            input_pins: vec![],
            output_pins: vec![],
        }
    }

    fn monster(at: (i64, i64), seed: i64) -> MonsterRecord {
        MonsterRecord {
            position: at,
            seed: Some(Number::from(seed)),
            monster_type: "poptop".to_string(),
            unique_parameters: Map::new(),
        }
    }

    fn npc(at: (i64, i64)) -> NpcRecord {
        NpcRecord {
            position: at,
            seed: Some(Number::from(9)),
            species: "avian".to_string(),
            type_name: "guard".to_string(),
            overrides: json!({"level": 2}).as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_ten_layers_in_order() {
        let entities = ExtractedEntities::default();
        let wiring = WireGraphBuilder::new(HEIGHT);
        let map = MapAssembler::new(WIDTH, HEIGHT, vec![], &entities, &wiring).assemble(layers());

        let names: Vec<&str> = map.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, LAYER_NAMES.to_vec());
        let ids: Vec<u32> = map.layers.iter().map(|l| l.id).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
        assert_eq!(map.nextlayerid, 11);
        assert_eq!(map.nextobjectid, 1);

        assert_eq!(map.layers[0].opacity, 0.5);
        assert_eq!(map.layers[0].data.as_deref(), Some("b"));
        assert_eq!(map.layers[1].data.as_deref(), Some("l"));
        assert_eq!(map.layers[2].data.as_deref(), Some("f"));
        for layer in &map.layers[3..] {
            assert_eq!(layer.kind, LayerKind::Objectgroup);
        }
        assert_eq!(map.layers[5].color.as_deref(), Some(WIRING_COLOR));
        assert_eq!(map.layers[6].color, None);
        assert_eq!(map.layers[7].color, None);
    }

    #[test]
    fn test_global_id_counter_across_layers() {
        let mut config = ConversionConfig::default();
        let mut switch = PinOffsets::new();
        switch.insert("o_0".to_string(), [0, 0]);
        config.wire.insert("switch".to_string(), switch);
        let mut lamp = PinOffsets::new();
        lamp.insert("i_0".to_string(), [0, 0]);
        config.wire.insert("lamp".to_string(), lamp);

        let mut a = object("switch", (1, 1), Some(1));
        a.output_pins = vec![vec![WireLink {
            target: (4, HEIGHT as i64 - 1 - 1),
            index: 0,
        }]];
        let mut b = object("lamp", (4, 1), None);
        b.input_pins = vec![vec![WireLink {
            target: (1, HEIGHT as i64 - 1 - 1),
            index: 0,
        }]];

        let mut wiring = WireGraphBuilder::new(HEIGHT);
        wiring.register_object(&a, &config).unwrap();
        wiring.register_object(&b, &config).unwrap();

        let entities = ExtractedEntities {
            monsters: vec![monster((2, 3), -2)],
            npcs: vec![npc((5, 0)), npc((6, 0))],
            objects: vec![a, b],
        };
        let map = MapAssembler::new(WIDTH, HEIGHT, vec![], &entities, &wiring).assemble(layers());

        let ids = |name: &str| -> Vec<u32> {
            map.layer(name)
                .and_then(|l| l.objects.as_ref())
                .map(|objects| objects.iter().map(|o| o.id).collect())
                .unwrap_or_default()
        };
        assert_eq!(ids("objects"), vec![1, 2]);
        assert_eq!(ids("wiring"), vec![3]);
        assert_eq!(ids("monsters"), vec![4]);
        assert_eq!(ids("npcs"), vec![5, 6]);
        assert_eq!(map.nextobjectid, 7);
        assert_eq!(map.layer("monsters").unwrap().color.as_deref(), Some(MONSTER_COLOR));
        assert_eq!(map.layer("npcs").unwrap().color.as_deref(), Some(NPC_COLOR));
    }

    #[test]
    fn test_object_marker_properties() {
        let mut placed = object("chest", (3, 4), Some(1));
        placed.parameters = json!({"treasurePools": ["basic"]}).as_object().cloned().unwrap();
        let entities = ExtractedEntities {
            objects: vec![placed, object("lamp", (0, 0), Some(0))],
            ..Default::default()
        };
        let wiring = WireGraphBuilder::new(HEIGHT);
        let map = MapAssembler::new(WIDTH, HEIGHT, vec![], &entities, &wiring).assemble(layers());

        let objects = map.layer("objects").unwrap().objects.as_ref().unwrap();
        let chest = &objects[0];
        assert_eq!((chest.x, chest.y, chest.width, chest.height), (24, 32, 8, 8));
        let props = chest.properties.as_ref().unwrap();
        assert_eq!(props[0], Property::string("object", "chest"));
        assert_eq!(props[1], Property::string("tilesetDirection", "right"));
        assert_eq!(props[2].name, "parameters");
        let params: Value = serde_json::from_str(&props[2].value).unwrap();
        assert_eq!(params, json!({"treasurePools": ["basic"]}));

        let lamp_props = objects[1].properties.as_ref().unwrap();
        assert_eq!(lamp_props.len(), 2);
        assert_eq!(lamp_props[1].value, "left");
    }

    #[test]
    fn test_monster_and_npc_markers() {
        let entities = ExtractedEntities {
            monsters: vec![monster((2, 3), -2)],
            npcs: vec![npc((5, 0))],
            ..Default::default()
        };
        let wiring = WireGraphBuilder::new(HEIGHT);
        let map = MapAssembler::new(WIDTH, HEIGHT, vec![], &entities, &wiring).assemble(layers());

        let monster = &map.layer("monsters").unwrap().objects.as_ref().unwrap()[0];
        assert_eq!((monster.x, monster.y), (16, (10 - 3 - 1) * 8));
        let props = monster.properties.as_ref().unwrap();
        assert_eq!(props[0], Property::string("seed", "18446744073709551614"));
        assert_eq!(props[1], Property::string("monster", "poptop"));
        assert_eq!(props.len(), 2);

        let npc = &map.layer("npcs").unwrap().objects.as_ref().unwrap()[0];
        assert_eq!((npc.x, npc.y), (40, 72));
        let props = npc.properties.as_ref().unwrap();
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["seed", "typeName", "npc", "parameters"]);
        assert_eq!(props[1].value, "guard");
        assert_eq!(props[2].value, "avian");
    }

    #[test]
    fn test_parameters_spacing_matches_stored_maps() {
        let parameters = json!({
            "lightColor": [255, 0, 0],
            "nested": {"on": true, "label": "café"},
            "scale": 1.5
        });
        assert_eq!(
            parameters_json(parameters.as_object().unwrap()),
            r#"{"lightColor": [255, 0, 0], "nested": {"on": true, "label": "café"}, "scale": 1.5}"#
        );
    }
}
