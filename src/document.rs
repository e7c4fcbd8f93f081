//! Tiled map document schema
//!
//! Serializable types for the JSON map format written by this tool: an
//! orthogonal map with 8×8 tiles, three zlib/base64 tile layers and seven
//! object groups.

use serde::{Deserialize, Serialize};

use crate::models::TILE_PIXELS;
use crate::tileset::TilesetRef;

/// Tile layer compression written into every tile layer.
pub const LAYER_COMPRESSION: &str = "zlib";
/// Tile layer text encoding written into every tile layer.
pub const LAYER_ENCODING: &str = "base64";

/// A custom property on a map object. All values are strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Property {
    pub fn string(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            kind: "string".to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// An object of an object group: an 8×8 marker or a polyline connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub height: i64,
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<Vec<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    pub rotation: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub visible: bool,
    pub width: i64,
    pub x: i64,
    pub y: i64,
}

impl MapObject {
    /// A tile-sized marker at pixel position `(x, y)`.
    pub fn marker(id: u32, x: i64, y: i64, properties: Vec<Property>) -> Self {
        Self {
            height: TILE_PIXELS,
            id,
            name: String::new(),
            polyline: None,
            properties: Some(properties),
            rotation: 0,
            kind: String::new(),
            visible: true,
            width: TILE_PIXELS,
            x,
            y,
        }
    }

    /// A two-point polyline starting at pixel `start`, ending at `start + delta`.
    pub fn connector(id: u32, start: Point, delta: Point) -> Self {
        Self {
            height: 0,
            id,
            name: String::new(),
            polyline: Some(vec![Point { x: 0, y: 0 }, delta]),
            properties: None,
            rotation: 0,
            kind: String::new(),
            visible: true,
            width: 0,
            x: start.x,
            y: start.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Tilelayer,
    Objectgroup,
}

/// A tile layer or an object group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: u32,
    pub name: String,
    pub opacity: f64,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub visible: bool,
    pub x: i64,
    pub y: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draworder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<MapObject>>,
}

impl Layer {
    /// A compressed tile layer holding `data`.
    pub fn tiles(id: u32, name: &str, opacity: f64, data: String, width: usize, height: usize) -> Self {
        Self {
            id,
            name: name.to_string(),
            opacity,
            kind: LayerKind::Tilelayer,
            visible: true,
            x: 0,
            y: 0,
            draworder: None,
            color: None,
            compression: Some(LAYER_COMPRESSION.to_string()),
            encoding: Some(LAYER_ENCODING.to_string()),
            data: Some(data),
            width: Some(width),
            height: Some(height),
            objects: None,
        }
    }

    /// An empty object group.
    pub fn objects(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            opacity: 1.0,
            kind: LayerKind::Objectgroup,
            visible: true,
            x: 0,
            y: 0,
            draworder: Some("topdown".to_string()),
            color: None,
            compression: None,
            encoding: None,
            data: None,
            width: None,
            height: None,
            objects: Some(Vec::new()),
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn with_objects(mut self, objects: Vec<MapObject>) -> Self {
        self.objects = Some(objects);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSettings {
    pub export: ExportSettings,
}

/// The map document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledMap {
    pub backgroundcolor: String,
    pub compressionlevel: i32,
    pub editorsettings: EditorSettings,
    pub height: usize,
    pub width: usize,
    pub tilewidth: u32,
    pub tileheight: u32,
    pub infinite: bool,
    pub layers: Vec<Layer>,
    pub nextlayerid: u32,
    pub nextobjectid: u32,
    pub orientation: String,
    pub renderorder: String,
    pub tiledversion: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: f64,
    pub tilesets: Vec<TilesetRef>,
}

impl TiledMap {
    /// An empty orthogonal map of `width × height` tiles.
    pub fn new(width: usize, height: usize, tilesets: Vec<TilesetRef>) -> Self {
        Self {
            backgroundcolor: "#000000".to_string(),
            compressionlevel: 0,
            editorsettings: EditorSettings {
                export: ExportSettings {
                    target: ".".to_string(),
                },
            },
            height,
            width,
            tilewidth: TILE_PIXELS as u32,
            tileheight: TILE_PIXELS as u32,
            infinite: false,
            layers: Vec::new(),
            nextlayerid: 1,
            nextobjectid: 1,
            orientation: "orthogonal".to_string(),
            renderorder: "right-down".to_string(),
            tiledversion: "1.3.1".to_string(),
            kind: "map".to_string(),
            version: 1.2,
            tilesets,
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name == name)
    }
}
