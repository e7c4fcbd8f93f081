//! Entity extraction
//!
//! Flattens raw world entities into the records the map needs. Monsters are
//! kept only when marked persistent; npcs and objects are always kept. Any
//! other entity kind is ignored.

use serde_json::{Map, Number, Value};

use crate::models::{MonsterRecord, NpcRecord, ObjectRecord, TilePoint, WireLink};
use crate::world::RawEntity;

pub const MONSTER_ENTITY: &str = "MonsterEntity";
pub const NPC_ENTITY: &str = "NpcEntity";
pub const OBJECT_ENTITY: &str = "ObjectEntity";

/// Records extracted from one batch of entities, in input order per kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedEntities {
    pub monsters: Vec<MonsterRecord>,
    pub npcs: Vec<NpcRecord>,
    pub objects: Vec<ObjectRecord>,
}

impl ExtractedEntities {
    pub fn extend(&mut self, other: ExtractedEntities) {
        self.monsters.extend(other.monsters);
        self.npcs.extend(other.npcs);
        self.objects.extend(other.objects);
    }

    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty() && self.npcs.is_empty() && self.objects.is_empty()
    }
}

/// Extract records from raw entities of a world `world_height` tiles tall.
pub fn extract_entities(entities: &[RawEntity], world_height: usize) -> ExtractedEntities {
    let mut extracted = ExtractedEntities::default();
    for entity in entities {
        match entity.name.as_str() {
            MONSTER_ENTITY => {
                if let Some(monster) = extract_monster(&entity.data) {
                    extracted.monsters.push(monster);
                }
            }
            NPC_ENTITY => extracted.npcs.push(extract_npc(&entity.data)),
            OBJECT_ENTITY => extracted
                .objects
                .push(extract_object(&entity.data, world_height as i64)),
            _ => {}
        }
    }
    extracted
}

fn extract_monster(data: &Value) -> Option<MonsterRecord> {
    let variant = data.get("monsterVariant");
    let unique_parameters = object_at(variant, "uniqueParameters");
    if !is_truthy(unique_parameters.get("persistent")) {
        return None;
    }

    Some(MonsterRecord {
        position: position_at(data.get("movementState")),
        seed: number_at(variant, "seed"),
        monster_type: string_at(variant, "type"),
        unique_parameters,
    })
}

fn extract_npc(data: &Value) -> NpcRecord {
    let variant = data.get("npcVariant");
    NpcRecord {
        position: position_at(data.get("movementController")),
        seed: number_at(variant, "seed"),
        species: string_at(variant, "species"),
        type_name: string_at(variant, "typeName"),
        overrides: object_at(variant, "overrides"),
    }
}

fn extract_object(data: &Value, world_height: i64) -> ObjectRecord {
    let (x, y) = match data.get("tilePosition").and_then(Value::as_array) {
        Some(coords) => (
            coords.first().and_then(Value::as_i64).unwrap_or(0),
            coords.get(1).and_then(Value::as_i64).unwrap_or(0),
        ),
        None => (0, 0),
    };

    ObjectRecord {
        name: string_at(Some(data), "name"),
        tile_position: TilePoint::new(x, world_height - y - 1),
        orientation_index: data.get("orientationIndex").and_then(Value::as_i64),
        parameters: object_at(Some(data), "parameters"),
        input_pins: wire_pins(data.get("inputWireNodes")),
        output_pins: wire_pins(data.get("outputWireNodes")),
    }
}

/// Connections of each pin. A pin written as `{"connections": [[[x, y], n], ...]}`
/// contributes its well-formed links; anything else counts as unconnected.
fn wire_pins(nodes: Option<&Value>) -> Vec<Vec<WireLink>> {
    let Some(nodes) = nodes.and_then(Value::as_array) else {
        return Vec::new();
    };
    nodes
        .iter()
        .map(|node| {
            node.get("connections")
                .and_then(Value::as_array)
                .map(|connections| connections.iter().filter_map(wire_link).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn wire_link(connection: &Value) -> Option<WireLink> {
    let connection = connection.as_array()?;
    let target = connection.first()?.as_array()?;
    Some(WireLink {
        target: (target.first()?.as_i64()?, target.get(1)?.as_i64()?),
        index: connection.get(1)?.as_u64()? as usize,
    })
}

/// `position` of a movement block, each coordinate rounded half to even.
fn position_at(movement: Option<&Value>) -> (i64, i64) {
    let coord = |i: usize| {
        movement
            .and_then(|m| m.get("position"))
            .and_then(|p| p.get(i))
            .and_then(Value::as_f64)
            .map(|v| v.round_ties_even() as i64)
            .unwrap_or(0)
    };
    (coord(0), coord(1))
}

fn object_at(parent: Option<&Value>, key: &str) -> Map<String, Value> {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn string_at(parent: Option<&Value>, key: &str) -> String {
    parent
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_at(parent: Option<&Value>, key: &str) -> Option<Number> {
    match parent.and_then(|p| p.get(key)) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Null) | None => false,
    }
}
