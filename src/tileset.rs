//! Tileset definitions, lookup tables and GID assignment
//!
//! A tileset definition file is JSON:
//!
//! ```json
//! {
//!   "tilecount": 2,
//!   "tileproperties": {
//!     "0": { "material": "dirt", "colorVariant": "2" },
//!     "1": { "liquid": "water", "source": "true" }
//!   }
//! }
//! ```
//!
//! The synthesized tileset of a run is written in the same schema so it can
//! be loaded back as an ordinary input on a later run.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    LiquidKey, MaterialKey, ResolvedTile, TileKey, EMPTY_TILESET, GENERATED_TILESET,
};

/// Errors that make a run's output invalid.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// A resolved tile names a tileset that is not in the final list
    #[error("Unknown tileset name: {0}")]
    UnknownTileset(String),
    /// A tileset definition lacks `tilecount`
    #[error("tilecount not found in {}", .0.display())]
    MissingTileCount(PathBuf),
    /// A tileset definition file could not be read
    #[error("Failed to read tileset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A tileset definition file is not valid JSON of the expected shape
    #[error("Failed to parse tileset {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A `tileproperties` id lies outside `0..tilecount`
    #[error("Tile id {id} out of range in {} (tilecount {tile_count})", .path.display())]
    TileIdOutOfRange {
        path: PathBuf,
        id: String,
        tile_count: u32,
    },
    /// Global ids of a tileset do not fit in 32 bits
    #[error("Global tile ids overflow at tileset '{tileset}'")]
    GidOverflow { tileset: String },
    /// Two tilesets share a name
    #[error("Duplicate tileset name: {0}")]
    DuplicateTileset(String),
    /// A tileset uses a name the converter keeps for itself
    #[error("Reserved tileset name: {0}")]
    ReservedTilesetName(String),
}

// ============================================================================
// File schema
// ============================================================================

/// Per-tile properties identifying what a tile depicts.
///
/// Values are strings, as the map editor stores custom properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(rename = "colorVariant", skip_serializing_if = "Option::is_none")]
    pub color_variant: Option<String>,
    #[serde(rename = "mod", skip_serializing_if = "Option::is_none")]
    pub mod_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl TileProperties {
    /// The lookup key these properties describe.
    ///
    /// Liquid properties win over material ones. Returns `None` for entries
    /// that describe neither, or whose colorVariant is not an integer.
    pub fn to_key(&self) -> Option<TileKey> {
        if let Some(liquid) = &self.liquid {
            let source = self
                .source
                .as_deref()
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            return Some(LiquidKey::new(liquid.clone(), source).into());
        }

        let material = self.material.as_deref().filter(|m| !m.is_empty())?;
        let variant = match self.color_variant.as_deref() {
            Some(raw) => raw.trim().parse::<u8>().ok()?,
            None => 0,
        };
        Some(MaterialKey::new(material, variant, self.mod_name.as_deref()).into())
    }

    /// Properties recorded for a key. Absent fields are omitted.
    pub fn from_key(key: &TileKey) -> Self {
        match key {
            TileKey::Material(key) => Self {
                material: Some(key.material.clone()),
                color_variant: key
                    .color_variant
                    .filter(|v| *v != 0)
                    .map(|v| v.to_string()),
                mod_name: key.mod_name.clone(),
                ..Default::default()
            },
            TileKey::Liquid(key) => Self {
                liquid: Some(key.liquid.clone()),
                source: key.source.then(|| "true".to_string()),
                ..Default::default()
            },
        }
    }
}

/// The fields of a tileset definition file this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TilesetDefinition {
    pub tilecount: Option<u32>,
    #[serde(default)]
    pub tileproperties: IndexMap<String, TileProperties>,
}

/// Image reference of one tile in a synthesized tileset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileImage {
    pub image: String,
}

/// A tileset written by this tool for keys no input tileset resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTileset {
    pub name: String,
    pub tilewidth: u32,
    pub tileheight: u32,
    pub spacing: u32,
    pub margin: u32,
    pub tilecount: u32,
    pub tiles: IndexMap<String, TileImage>,
    pub tileproperties: IndexMap<String, TileProperties>,
}

// ============================================================================
// Loaded tilesets
// ============================================================================

/// Key → local id table of one tileset.
#[derive(Debug, Clone)]
pub struct TileLookup {
    pub name: Arc<str>,
    tiles: HashMap<TileKey, u32>,
}

impl TileLookup {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            tiles: HashMap::new(),
        }
    }

    /// Build from a parsed definition. Entries with a non-numeric id or no
    /// usable key are skipped.
    pub fn from_definition(name: &str, definition: &TilesetDefinition) -> Self {
        let mut lookup = Self::new(name);
        for (id, props) in &definition.tileproperties {
            let Ok(local_id) = id.trim().parse::<u32>() else {
                continue;
            };
            if let Some(key) = props.to_key() {
                lookup.insert(key, local_id);
            }
        }
        lookup
    }

    pub fn insert(&mut self, key: TileKey, local_id: u32) {
        self.tiles.insert(key, local_id);
    }

    pub fn get(&self, key: &TileKey) -> Option<u32> {
        self.tiles.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// A tileset input loaded from disk.
#[derive(Debug, Clone)]
pub struct LoadedTileset {
    pub path: PathBuf,
    pub tile_count: u32,
    pub lookup: TileLookup,
}

impl LoadedTileset {
    pub fn name(&self) -> &str {
        &self.lookup.name
    }
}

/// Tileset name derived from a definition path (its file stem).
pub fn tileset_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Load a tileset definition file.
pub fn load_tileset(path: &Path) -> Result<LoadedTileset, FormatError> {
    let contents = fs::read_to_string(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let definition: TilesetDefinition =
        serde_json::from_str(&contents).map_err(|source| FormatError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let tile_count = definition
        .tilecount
        .ok_or_else(|| FormatError::MissingTileCount(path.to_path_buf()))?;
    for id in definition.tileproperties.keys() {
        if let Ok(local_id) = id.trim().parse::<u64>() {
            if local_id >= u64::from(tile_count) {
                return Err(FormatError::TileIdOutOfRange {
                    path: path.to_path_buf(),
                    id: id.clone(),
                    tile_count,
                });
            }
        }
    }

    let lookup = TileLookup::from_definition(&tileset_name(path), &definition);
    tracing::debug!(
        target: "world2tiled::tileset",
        path = %path.display(),
        tile_count,
        keys = lookup.len(),
        "tileset.loaded"
    );

    Ok(LoadedTileset {
        path: path.to_path_buf(),
        tile_count,
        lookup,
    })
}

// ============================================================================
// GID assignment
// ============================================================================

/// A tileset entry of the map document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesetRef {
    pub firstgid: u32,
    pub name: String,
    pub source: String,
}

/// Check that declared tileset names are distinct and not reserved.
///
/// Resolved tiles carry only their tileset's name, so each name must pick
/// out exactly one tileset of the final list.
pub fn check_tileset_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), FormatError> {
    let mut seen = HashSet::new();
    for name in names {
        if name == EMPTY_TILESET || name == GENERATED_TILESET {
            return Err(FormatError::ReservedTilesetName(name.to_string()));
        }
        if !seen.insert(name) {
            return Err(FormatError::DuplicateTileset(name.to_string()));
        }
    }
    Ok(())
}

/// Assign first GIDs over an ordered list of `(name, tile count, source)`.
///
/// GIDs start at 1; each tileset occupies `tile count` ids. Fails when the
/// ids run past `u32::MAX`.
pub fn assign_first_gids<'a>(
    tilesets: impl IntoIterator<Item = (&'a str, u32, String)>,
) -> Result<Vec<TilesetRef>, FormatError> {
    let mut current_gid = 1u32;
    tilesets
        .into_iter()
        .map(|(name, tile_count, source)| {
            let entry = TilesetRef {
                firstgid: current_gid,
                name: name.to_string(),
                source,
            };
            current_gid = current_gid
                .checked_add(tile_count)
                .ok_or_else(|| FormatError::GidOverflow {
                    tileset: name.to_string(),
                })?;
            Ok(entry)
        })
        .collect()
}

/// Name → first GID table used while encoding layers.
#[derive(Debug, Clone, Default)]
pub struct GidIndex {
    first_gids: HashMap<String, u32>,
}

impl GidIndex {
    /// Index a tileset list. With duplicate names the first entry wins.
    pub fn new(tilesets: &[TilesetRef]) -> Self {
        let mut first_gids = HashMap::new();
        for tileset in tilesets {
            first_gids
                .entry(tileset.name.clone())
                .or_insert(tileset.firstgid);
        }
        Self { first_gids }
    }

    /// Global id of a tile: `firstgid + local id`, or 0 for the empty tileset.
    pub fn gid(&self, tileset: &str, local_id: u32) -> Result<u32, FormatError> {
        if tileset == EMPTY_TILESET {
            return Ok(0);
        }
        self.first_gids
            .get(tileset)
            .ok_or_else(|| FormatError::UnknownTileset(tileset.to_string()))?
            .checked_add(local_id)
            .ok_or_else(|| FormatError::GidOverflow {
                tileset: tileset.to_string(),
            })
    }

    pub fn gid_of(&self, tile: &ResolvedTile) -> Result<u32, FormatError> {
        self.gid(&tile.tileset, tile.local_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn props(json: &str) -> TileProperties {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_material_properties_to_key() {
        let key = props(r#"{"material": "dirt", "colorVariant": "2", "mod": "grass"}"#)
            .to_key()
            .unwrap();
        assert_eq!(key, MaterialKey::new("dirt", 2, Some("grass")).into());

        let key = props(r#"{"material": "dirt", "mod": " "}"#).to_key().unwrap();
        assert_eq!(key, MaterialKey::new("dirt", 0, None).into());
    }

    #[test]
    fn test_bad_color_variant_skipped() {
        assert!(props(r#"{"material": "dirt", "colorVariant": "red"}"#)
            .to_key()
            .is_none());
        assert!(props(r#"{"colorVariant": "1"}"#).to_key().is_none());
    }

    #[test]
    fn test_liquid_properties_to_key() {
        let key = props(r#"{"liquid": "water", "source": "TRUE"}"#).to_key().unwrap();
        assert_eq!(key, LiquidKey::new("water", true).into());
        let key = props(r#"{"liquid": "water"}"#).to_key().unwrap();
        assert_eq!(key, LiquidKey::new("water", false).into());
    }

    #[test]
    fn test_from_key_omits_absent_fields() {
        let json = serde_json::to_string(&TileProperties::from_key(
            &MaterialKey::new("foo", 0, None).into(),
        ))
        .unwrap();
        assert_eq!(json, r#"{"material":"foo"}"#);

        let json =
            serde_json::to_string(&TileProperties::from_key(&LiquidKey::new("water", true).into()))
                .unwrap();
        assert_eq!(json, r#"{"liquid":"water","source":"true"}"#);

        let json = serde_json::to_string(&TileProperties::from_key(
            &LiquidKey::new("water", false).into(),
        ))
        .unwrap();
        assert_eq!(json, r#"{"liquid":"water"}"#);
    }

    #[test]
    fn test_properties_key_inverse() {
        let keys: Vec<TileKey> = vec![
            MaterialKey::new("dirt", 0, None).into(),
            MaterialKey::new("dirt", 8, None).into(),
            MaterialKey::new("dirt", 1, Some("moss")).into(),
            LiquidKey::new("lava", true).into(),
            LiquidKey::new("lava", false).into(),
        ];
        for key in keys {
            assert_eq!(TileProperties::from_key(&key).to_key(), Some(key));
        }
    }

    #[test]
    fn test_load_tileset() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = temp.path().join("materials.json");
        File::create(&path)
            .unwrap()
            .write_all(
                br#"{"tilecount": 3, "tileproperties": {
                    "0": {"material": "dirt"},
                    "2": {"liquid": "water"},
                    "x": {"material": "ignored"}
                }}"#,
            )
            .unwrap();

        let tileset = load_tileset(&path).expect("should load");
        assert_eq!(tileset.name(), "materials");
        assert_eq!(tileset.tile_count, 3);
        assert_eq!(tileset.lookup.len(), 2);
        assert_eq!(
            tileset.lookup.get(&LiquidKey::new("water", false).into()),
            Some(2)
        );
    }

    #[test]
    fn test_load_tileset_missing_tilecount() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = temp.path().join("broken.json");
        File::create(&path)
            .unwrap()
            .write_all(br#"{"tileproperties": {}}"#)
            .unwrap();

        let err = load_tileset(&path).unwrap_err();
        assert!(matches!(err, FormatError::MissingTileCount(_)));
        assert!(err.to_string().starts_with("tilecount not found"));
    }

    #[test]
    fn test_assign_first_gids() {
        let refs = assign_first_gids(vec![
            ("a", 10, "a.json".to_string()),
            ("b", 5, "b.json".to_string()),
            ("c", 0, "c.json".to_string()),
            ("d", 1, "d.json".to_string()),
        ])
        .unwrap();
        let first: Vec<u32> = refs.iter().map(|t| t.firstgid).collect();
        assert_eq!(first, vec![1, 11, 16, 16]);
    }

    #[test]
    fn test_gid_law() {
        let refs = assign_first_gids(vec![
            ("a", 10, String::new()),
            ("b", 5, String::new()),
        ])
        .unwrap();
        let index = GidIndex::new(&refs);
        assert_eq!(index.gid("empty", 0).unwrap(), 0);
        assert_eq!(index.gid("a", 0).unwrap(), 1);
        assert_eq!(index.gid("a", 9).unwrap(), 10);
        assert_eq!(index.gid("b", 4).unwrap(), 15);
        assert!(matches!(
            index.gid("missing", 0),
            Err(FormatError::UnknownTileset(ref name)) if name == "missing"
        ));
    }

    #[test]
    fn test_load_tileset_rejects_id_past_tilecount() {
        let temp = TempDir::new().expect("should create temp dir");
        let path = temp.path().join("short.json");
        File::create(&path)
            .unwrap()
            .write_all(br#"{"tilecount": 2, "tileproperties": {"2": {"material": "dirt"}}}"#)
            .unwrap();

        let err = load_tileset(&path).unwrap_err();
        assert!(matches!(
            err,
            FormatError::TileIdOutOfRange { ref id, tile_count: 2, .. } if id == "2"
        ));

        File::create(&path)
            .unwrap()
            .write_all(br#"{"tilecount": 2, "tileproperties": {"4294967296": {"material": "dirt"}}}"#)
            .unwrap();
        assert!(matches!(
            load_tileset(&path),
            Err(FormatError::TileIdOutOfRange { .. })
        ));
    }

    #[test]
    fn test_assign_first_gids_overflow() {
        let err = assign_first_gids(vec![
            ("big", u32::MAX, String::new()),
            ("generated_tiles", 0, String::new()),
        ])
        .unwrap_err();
        assert!(matches!(err, FormatError::GidOverflow { ref tileset } if tileset == "big"));

        let refs = assign_first_gids(vec![("a", u32::MAX - 1, String::new())]).unwrap();
        assert_eq!(refs[0].firstgid, 1);
    }

    #[test]
    fn test_gid_overflow_is_an_error() {
        let refs = assign_first_gids(vec![("a", 10, String::new())]).unwrap();
        let index = GidIndex::new(&refs);
        assert!(matches!(
            index.gid("a", u32::MAX),
            Err(FormatError::GidOverflow { ref tileset }) if tileset == "a"
        ));
    }

    #[test]
    fn test_check_tileset_names() {
        assert!(check_tileset_names(["a", "b"]).is_ok());
        assert!(matches!(
            check_tileset_names(["tiles", "other", "tiles"]),
            Err(FormatError::DuplicateTileset(ref name)) if name == "tiles"
        ));
        assert!(matches!(
            check_tileset_names(["empty"]),
            Err(FormatError::ReservedTilesetName(ref name)) if name == "empty"
        ));
        assert!(matches!(
            check_tileset_names(["a", "generated_tiles"]),
            Err(FormatError::ReservedTilesetName(_))
        ));
    }
}
