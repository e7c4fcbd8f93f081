//! World snapshot access
//!
//! The binary world format is decoded elsewhere; this module defines what the
//! converter needs from a decoded world ([`WorldSource`]) and ships a reader
//! for the JSON snapshot layout:
//!
//! ```json
//! {
//!   "width": 64, "height": 32,
//!   "regions": [
//!     { "x": 0, "y": 0,
//!       "tiles": [ { "foreground_material": 1, "liquid": 0, ... }, ... ],
//!       "entities": [ { "name": "ObjectEntity", "data": { ... } } ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::grid::Grid;
use crate::models::{TileCell, REGION_SIZE};

/// Number of cells in one region.
pub const REGION_CELLS: usize = REGION_SIZE * REGION_SIZE;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorldError {
    #[error("Failed to read world {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse world {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Region ({x}, {y}) has {count} tiles, expected {expected}", expected = REGION_CELLS)]
    RegionSize { x: i32, y: i32, count: usize },
    #[error("Region ({x}, {y}) has no tile data")]
    MissingRegion { x: i32, y: i32 },
}

/// An entity record as stored in the world: a kind name and its data tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

/// A decoded world.
pub trait WorldSource {
    /// Width in tiles.
    fn width(&self) -> usize;

    /// Height in tiles.
    fn height(&self) -> usize;

    /// Coordinates of every region holding tiles, in storage order.
    fn regions(&self) -> Vec<(i32, i32)>;

    /// The 32×32 cells of a region, row-major with row 0 lowest.
    fn region_tiles(&self, x: i32, y: i32) -> Result<Vec<TileCell>, WorldError>;

    /// Entities stored with a region. `None` when the region has no entity
    /// record.
    fn region_entities(&self, x: i32, y: i32) -> Option<Vec<RawEntity>>;
}

// ============================================================================
// JSON snapshot
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub tiles: Vec<TileCell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<RawEntity>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub regions: Vec<RegionSnapshot>,
}

/// A [`WorldSource`] over a JSON world snapshot.
#[derive(Debug, Clone)]
pub struct JsonWorld {
    snapshot: WorldSnapshot,
    by_coord: HashMap<(i32, i32), usize>,
}

impl JsonWorld {
    pub fn new(snapshot: WorldSnapshot) -> Self {
        let by_coord = snapshot
            .regions
            .iter()
            .enumerate()
            .map(|(i, region)| ((region.x, region.y), i))
            .collect();
        Self { snapshot, by_coord }
    }

    pub fn open(path: &Path) -> Result<Self, WorldError> {
        let contents = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents).map_err(|source| WorldError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(contents)?))
    }

    fn region(&self, x: i32, y: i32) -> Option<&RegionSnapshot> {
        self.by_coord.get(&(x, y)).map(|i| &self.snapshot.regions[*i])
    }
}

impl WorldSource for JsonWorld {
    fn width(&self) -> usize {
        self.snapshot.width
    }

    fn height(&self) -> usize {
        self.snapshot.height
    }

    fn regions(&self) -> Vec<(i32, i32)> {
        self.snapshot
            .regions
            .iter()
            .filter(|region| !region.tiles.is_empty())
            .map(|region| (region.x, region.y))
            .collect()
    }

    fn region_tiles(&self, x: i32, y: i32) -> Result<Vec<TileCell>, WorldError> {
        let region = self.region(x, y).ok_or(WorldError::MissingRegion { x, y })?;
        if region.tiles.len() != REGION_CELLS {
            return Err(WorldError::RegionSize {
                x,
                y,
                count: region.tiles.len(),
            });
        }
        Ok(region.tiles.clone())
    }

    fn region_entities(&self, x: i32, y: i32) -> Option<Vec<RawEntity>> {
        self.region(x, y).and_then(|region| region.entities.clone())
    }
}

/// Place one region's cells into the world grid.
///
/// Cells past the world's edge are dropped.
pub fn place_region(grid: &mut Grid<TileCell>, x: i32, y: i32, tiles: &[TileCell]) {
    let start_x = i64::from(x) * REGION_SIZE as i64;
    let start_y = i64::from(y) * REGION_SIZE as i64;
    for (i, cell) in tiles.iter().enumerate().take(REGION_CELLS) {
        let wx = start_x + (i % REGION_SIZE) as i64;
        let wy = start_y + (i / REGION_SIZE) as i64;
        if wx < 0 || wy < 0 {
            continue;
        }
        grid.set(wx as usize, wy as usize, *cell);
    }
}
