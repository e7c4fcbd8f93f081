//! File-level conversion pipeline
//!
//! Loads the config, tilesets and world from disk, runs a
//! [`convert_world`](crate::session::convert_world) and writes both output
//! documents. Both files are staged first and committed together, so a
//! failing run writes nothing.

use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::load_config;
use crate::error::ConvertError;
use crate::missing::DEFAULT_PLACEHOLDER_IMAGE;
use crate::output::{commit_all, output_path, relative_source, stage_json};
use crate::session::{convert_world, ConversionStats, DeclaredTileset};
use crate::tileset::load_tileset;
use crate::world::JsonWorld;

/// Inputs and destinations of one run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// World snapshot file
    pub world: PathBuf,
    /// Conversion config file
    pub config: PathBuf,
    /// Tileset paths or glob patterns, in lookup order
    pub tilesets: Vec<String>,
    /// Directory receiving the map document
    pub map_dir: PathBuf,
    /// Directory receiving the generated tileset
    pub tileset_dir: PathBuf,
    /// Image reference of every generated tile
    pub placeholder_image: String,
    /// Write minified JSON
    pub compact: bool,
}

impl ConvertOptions {
    pub fn new(world: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            world: world.into(),
            config: config.into(),
            tilesets: Vec::new(),
            map_dir: PathBuf::from("."),
            tileset_dir: PathBuf::from("."),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            compact: false,
        }
    }
}

/// Files written by a successful run.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub map_path: PathBuf,
    pub tileset_path: PathBuf,
    pub stats: ConversionStats,
}

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Expand tileset arguments into paths.
///
/// Glob patterns expand to their sorted matches and must match at least one
/// file. Plain paths are kept as given. A path seen twice keeps its first
/// position.
pub fn expand_tileset_patterns(patterns: &[String]) -> Result<Vec<PathBuf>, ConvertError> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for pattern in patterns {
        let mut matches: Vec<PathBuf> = if is_pattern(pattern) {
            glob(pattern)
                .map_err(|source| ConvertError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?
                .filter_map(Result::ok)
                .collect()
        } else {
            vec![PathBuf::from(pattern)]
        };
        if matches.is_empty() {
            return Err(ConvertError::NoTilesets(pattern.clone()));
        }
        matches.sort();

        for path in matches {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    Ok(paths)
}

fn declare(path: &Path, map_dir: &Path) -> Result<DeclaredTileset, ConvertError> {
    let loaded = load_tileset(path)?;
    Ok(DeclaredTileset {
        source: relative_source(&loaded.path, map_dir)?,
        tile_count: loaded.tile_count,
        lookup: loaded.lookup,
    })
}

/// Run one conversion from files to files.
pub fn run(options: &ConvertOptions) -> Result<ConversionReport, ConvertError> {
    let config = load_config(&options.config)?;
    tracing::info!(
        target: "world2tiled::pipeline",
        path = %options.config.display(),
        materials = config.material.len(),
        mods = config.mods.len(),
        liquids = config.liquid.len(),
        "config.loaded"
    );

    let declared = expand_tileset_patterns(&options.tilesets)?
        .iter()
        .map(|path| declare(path, &options.map_dir))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(
        target: "world2tiled::pipeline",
        count = declared.len(),
        "tilesets.loaded"
    );

    let world = JsonWorld::open(&options.world)?;

    let map_path = output_path(&options.map_dir, &options.world);
    let tileset_path = output_path(&options.tileset_dir, &options.world);
    let generated_source = relative_source(&tileset_path, &options.map_dir)?;

    let output = convert_world(
        &world,
        &config,
        &declared,
        &generated_source,
        &options.placeholder_image,
    )?;

    let staged = vec![
        stage_json(&output.generated, &tileset_path, options.compact)?,
        stage_json(&output.map, &map_path, options.compact)?,
    ];
    commit_all(staged)?;
    tracing::info!(
        target: "world2tiled::pipeline",
        map = %map_path.display(),
        tileset = %tileset_path.display(),
        missing_tiles = output.stats.missing_tiles,
        "files.written"
    );

    Ok(ConversionReport {
        map_path,
        tileset_path,
        stats: output.stats,
    })
}
