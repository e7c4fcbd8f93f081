//! Conversion session
//!
//! A [`ConversionSession`] holds every accumulator of one run: the world
//! cell grid, extracted entities, the wire graph, the missing-tile allocator
//! and the unknown-id diagnostics. Regions are read strictly in storage
//! order, since allocation order and object ids follow encounter order.
//!
//! Resolution runs in two phases. Phase 1 resolves all three tile layers
//! against the declared tilesets, placing unresolved keys under the generated
//! tileset name. Phase 2 appends the synthesized tileset to the declared ones,
//! assigns first GIDs over the final list and only then encodes the layers.

use crate::assembler::{EncodedLayers, MapAssembler};
use crate::config::ConversionConfig;
use crate::document::TiledMap;
use crate::encode::encode_layer;
use crate::entities::{extract_entities, ExtractedEntities};
use crate::error::ConvertError;
use crate::grid::Grid;
use crate::missing::MissingTileAllocator;
use crate::models::{ResolvedTile, TileCell, GENERATED_TILESET};
use crate::normalize::Normalizer;
use crate::resolver::TileIdentityResolver;
use crate::tileset::{
    assign_first_gids, check_tileset_names, GeneratedTileset, GidIndex, TileLookup,
};
use crate::wiring::WireGraphBuilder;
use crate::world::{place_region, WorldSource};

/// A declared input tileset as it enters the map: lookup table, tile count
/// and the `source` written into the tileset list.
#[derive(Debug, Clone)]
pub struct DeclaredTileset {
    pub lookup: TileLookup,
    pub tile_count: u32,
    pub source: String,
}

/// Phase 1 result: the three tile layers in world orientation.
#[derive(Debug, Clone)]
pub struct ResolvedLayers {
    pub front: Grid<ResolvedTile>,
    pub back: Grid<ResolvedTile>,
    pub liquid: Grid<ResolvedTile>,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub regions: usize,
    pub objects: usize,
    pub monsters: usize,
    pub npcs: usize,
    pub connectors: usize,
    pub missing_tiles: usize,
    pub unknown_ids: usize,
}

/// Documents produced by one run.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub map: TiledMap,
    pub generated: GeneratedTileset,
    pub stats: ConversionStats,
}

/// Mutable state of one conversion run.
#[derive(Debug)]
pub struct ConversionSession<'a> {
    config: &'a ConversionConfig,
    normalizer: Normalizer<'a>,
    allocator: MissingTileAllocator,
    wiring: WireGraphBuilder,
    entities: ExtractedEntities,
    cells: Grid<TileCell>,
    regions: usize,
}

impl<'a> ConversionSession<'a> {
    pub fn new(config: &'a ConversionConfig, width: usize, height: usize) -> Self {
        Self {
            config,
            normalizer: Normalizer::new(config),
            allocator: MissingTileAllocator::new(),
            wiring: WireGraphBuilder::new(height),
            entities: ExtractedEntities::default(),
            cells: Grid::filled(width, height, TileCell::default()),
            regions: 0,
        }
    }

    pub fn allocator(&self) -> &MissingTileAllocator {
        &self.allocator
    }

    pub fn wiring(&self) -> &WireGraphBuilder {
        &self.wiring
    }

    pub fn entities(&self) -> &ExtractedEntities {
        &self.entities
    }

    pub fn cells(&self) -> &Grid<TileCell> {
        &self.cells
    }

    /// Read one region: place its cells, extract its entities and register
    /// the wire pins of its objects.
    pub fn read_region<W: WorldSource + ?Sized>(
        &mut self,
        world: &W,
        x: i32,
        y: i32,
    ) -> Result<(), ConvertError> {
        let tiles = world.region_tiles(x, y)?;
        place_region(&mut self.cells, x, y, &tiles);

        let raw = world.region_entities(x, y).unwrap_or_default();
        let extracted = extract_entities(&raw, self.cells.height());
        for object in &extracted.objects {
            self.wiring.register_object(object, self.config)?;
        }
        self.entities.extend(extracted);
        self.regions += 1;
        Ok(())
    }

    /// Read every populated region in storage order.
    pub fn read_world<W: WorldSource + ?Sized>(&mut self, world: &W) -> Result<(), ConvertError> {
        for (x, y) in world.regions() {
            self.read_region(world, x, y)?;
        }
        tracing::info!(
            target: "world2tiled::session",
            regions = self.regions,
            objects = self.entities.objects.len(),
            monsters = self.entities.monsters.len(),
            npcs = self.entities.npcs.len(),
            "world.read"
        );
        Ok(())
    }

    /// Phase 1: normalize and resolve front, back and liquid, in that order.
    pub fn resolve(&mut self, resolver: &TileIdentityResolver) -> ResolvedLayers {
        let front = self
            .cells
            .map(|cell| self.normalizer.material(cell.foreground()));
        let back = self
            .cells
            .map(|cell| self.normalizer.material(cell.background()));
        let liquid = self.cells.map(|cell| self.normalizer.liquid(cell.liquid()));

        let layers = ResolvedLayers {
            front: resolver.resolve_material_grid(&front, &mut self.allocator),
            back: resolver.resolve_material_grid(&back, &mut self.allocator),
            liquid: resolver.resolve_liquid_grid(&liquid, &mut self.allocator),
        };
        tracing::info!(
            target: "world2tiled::session",
            missing_tiles = self.allocator.len(),
            "layers.resolved"
        );
        layers
    }

    /// Phase 2: synthesize the generated tileset, build the final tileset
    /// list, encode the layers and assemble the map.
    pub fn finish(
        self,
        layers: &ResolvedLayers,
        declared: &[DeclaredTileset],
        generated_source: &str,
        placeholder_image: &str,
    ) -> Result<ConversionOutput, ConvertError> {
        check_tileset_names(declared.iter().map(|t| t.lookup.name.as_ref()))?;
        let generated = self
            .allocator
            .synthesize(GENERATED_TILESET, placeholder_image);
        tracing::info!(
            target: "world2tiled::session",
            tiles = generated.tilecount,
            "tileset.synthesized"
        );

        let tilesets = assign_first_gids(
            declared
                .iter()
                .map(|t| (t.lookup.name.as_ref(), t.tile_count, t.source.clone()))
                .chain(std::iter::once((
                    GENERATED_TILESET,
                    generated.tilecount,
                    generated_source.to_string(),
                ))),
        )?;
        let index = GidIndex::new(&tilesets);

        let encoded = EncodedLayers {
            back: encode_layer(&layers.back, &index)?,
            liquid: encode_layer(&layers.liquid, &index)?,
            front: encode_layer(&layers.front, &index)?,
        };

        let map = MapAssembler::new(
            self.cells.width(),
            self.cells.height(),
            tilesets,
            &self.entities,
            &self.wiring,
        )
        .assemble(encoded);

        let connectors = map
            .layer("wiring")
            .and_then(|layer| layer.objects.as_ref())
            .map_or(0, Vec::len);
        let stats = ConversionStats {
            regions: self.regions,
            objects: self.entities.objects.len(),
            monsters: self.entities.monsters.len(),
            npcs: self.entities.npcs.len(),
            connectors,
            missing_tiles: self.allocator.len(),
            unknown_ids: self.normalizer.unknown_material_count()
                + self.normalizer.unknown_mod_count()
                + self.normalizer.unknown_liquid_count(),
        };

        Ok(ConversionOutput {
            map,
            generated,
            stats,
        })
    }
}

/// Convert a decoded world into its map and generated tileset documents.
///
/// Declared tilesets are searched, and listed in the map, in the order given.
pub fn convert_world<W: WorldSource + ?Sized>(
    world: &W,
    config: &ConversionConfig,
    declared: &[DeclaredTileset],
    generated_source: &str,
    placeholder_image: &str,
) -> Result<ConversionOutput, ConvertError> {
    check_tileset_names(declared.iter().map(|t| t.lookup.name.as_ref()))?;
    let mut session = ConversionSession::new(config, world.width(), world.height());
    session.read_world(world)?;

    let resolver = TileIdentityResolver::new(declared.iter().map(|t| t.lookup.clone()).collect());
    let layers = session.resolve(&resolver);

    session.finish(&layers, declared, generated_source, placeholder_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdTable, PinOffsets};
    use crate::encode::decode_gids;
    use crate::missing::DEFAULT_PLACEHOLDER_IMAGE;
    use crate::models::{LiquidKey, MaterialKey, TileKey, EMPTY_TILESET, REGION_SIZE};
    use crate::tileset::FormatError;
    use crate::world::{JsonWorld, RawEntity, RegionSnapshot, WorldSnapshot, REGION_CELLS};
    use serde_json::json;

    fn table(entries: &[(&str, &str)]) -> IdTable {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config() -> ConversionConfig {
        let mut config = ConversionConfig {
            material: table(&[("0", "empty"), ("1", "dirt"), ("2", "stone"), ("3", "brick")]),
            mods: table(&[("0", "empty")]),
            liquid: table(&[("0", "empty"), ("1", "water")]),
            ..Default::default()
        };
        let mut switch = PinOffsets::new();
        switch.insert("o_0".to_string(), [0, 0]);
        config.wire.insert("switch".to_string(), switch);
        let mut lamp = PinOffsets::new();
        lamp.insert("i_0".to_string(), [0, 0]);
        config.wire.insert("lamp".to_string(), lamp);
        config
    }

    fn declared() -> Vec<DeclaredTileset> {
        let mut lookup = TileLookup::new("materials");
        lookup.insert(MaterialKey::new("dirt", 0, None).into(), 0);
        lookup.insert(MaterialKey::new("stone", 0, None).into(), 1);
        vec![DeclaredTileset {
            lookup,
            tile_count: 4,
            source: "../tilesets/materials.json".to_string(),
        }]
    }

    /// A 32×32 world from a single region.
    fn world(tiles: Vec<TileCell>, entities: Vec<RawEntity>) -> JsonWorld {
        JsonWorld::new(WorldSnapshot {
            width: REGION_SIZE,
            height: REGION_SIZE,
            regions: vec![RegionSnapshot {
                x: 0,
                y: 0,
                tiles,
                entities: Some(entities),
            }],
        })
    }

    fn at(x: usize, y: usize) -> usize {
        y * REGION_SIZE + x
    }

    #[test]
    fn test_tile_layers_end_to_end() {
        let mut tiles = vec![TileCell::default(); REGION_CELLS];
        // bottom-left: dirt in front, water behind
        tiles[at(0, 0)].foreground_material = 1;
        tiles[at(0, 0)].liquid = 1;
        tiles[at(0, 0)].liquid_infinite = true;
        // top-left: brick (unresolved) in front, stone behind
        tiles[at(0, 31)].foreground_material = 3;
        tiles[at(0, 31)].background_material = 2;

        let output = convert_world(
            &world(tiles, vec![]),
            &config(),
            &declared(),
            "../generated/w.json",
            DEFAULT_PLACEHOLDER_IMAGE,
        )
        .unwrap();

        let tilesets = &output.map.tilesets;
        assert_eq!(tilesets.len(), 2);
        assert_eq!(tilesets[0].firstgid, 1);
        assert_eq!(tilesets[1].name, GENERATED_TILESET);
        assert_eq!(tilesets[1].firstgid, 5);
        assert_eq!(tilesets[1].source, "../generated/w.json");

        // brick first (front pass), then water (liquid pass)
        assert_eq!(output.generated.tilecount, 2);
        let keys: Vec<&String> = output.generated.tileproperties.keys().collect();
        assert_eq!(keys, vec!["0", "1"]);
        assert_eq!(output.generated.tileproperties["0"].material.as_deref(), Some("brick"));
        assert_eq!(output.generated.tileproperties["1"].liquid.as_deref(), Some("water"));

        let layer = |name: &str| {
            let data = output.map.layer(name).unwrap().data.as_deref().unwrap();
            decode_gids(data).unwrap()
        };
        let front = layer("front");
        let back = layer("back");
        let liquid = layer("liquid");
        assert_eq!(front.len(), REGION_CELLS);
        // document row 0 is the world's top row
        assert_eq!(front[0], 5);
        assert_eq!(back[0], 2);
        assert_eq!(front[31 * REGION_SIZE], 1);
        assert_eq!(liquid[31 * REGION_SIZE], 6);
        assert_eq!(front.iter().filter(|gid| **gid != 0).count(), 2);

        assert_eq!(output.stats.missing_tiles, 2);
        assert_eq!(output.stats.regions, 1);
    }

    #[test]
    fn test_allocation_follows_layer_order() {
        let mut tiles = vec![TileCell::default(); REGION_CELLS];
        // back has brick, liquid has water, front has nothing unresolved
        tiles[at(3, 3)].background_material = 3;
        tiles[at(4, 4)].liquid = 1;
        tiles[at(5, 5)].foreground_material = 3;
        tiles[at(5, 5)].foreground_variant = 2;

        let config = config();
        let world = world(tiles, vec![]);
        let mut session = ConversionSession::new(&config, REGION_SIZE, REGION_SIZE);
        session.read_world(&world).unwrap();
        let resolver = TileIdentityResolver::new(declared().into_iter().map(|t| t.lookup).collect());
        session.resolve(&resolver);

        let order: Vec<(TileKey, u32)> = session
            .allocator()
            .iter()
            .map(|(key, id)| (key.clone(), id))
            .collect();
        assert_eq!(
            order,
            vec![
                (MaterialKey::new("brick", 2, None).into(), 0),
                (MaterialKey::new("brick", 0, None).into(), 1),
                (LiquidKey::new("water", false).into(), 2),
            ]
        );
    }

    #[test]
    fn test_entities_and_wiring_end_to_end() {
        let entities = vec![
            RawEntity {
                name: "ObjectEntity".to_string(),
                data: json!({
                    "name": "switch",
                    "tilePosition": [2, 29],
                    "orientationIndex": 1,
                    "outputWireNodes": [{"connections": [[[5, 29], 0]]}]
                }),
            },
            RawEntity {
                name: "ObjectEntity".to_string(),
                data: json!({
                    "name": "lamp",
                    "tilePosition": [5, 29],
                    "inputWireNodes": [{"connections": [[[2, 29], 0]]}]
                }),
            },
            RawEntity {
                name: "NpcEntity".to_string(),
                data: json!({
                    "npcVariant": {"species": "human", "typeName": "merchant", "seed": 1},
                    "movementController": {"position": [10.0, 20.0]}
                }),
            },
        ];
        let output = convert_world(
            &world(vec![TileCell::default(); REGION_CELLS], entities),
            &config(),
            &declared(),
            "g.json",
            DEFAULT_PLACEHOLDER_IMAGE,
        )
        .unwrap();

        let map = &output.map;
        let connectors = map.layer("wiring").unwrap().objects.as_ref().unwrap();
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].id, 3);
        assert_eq!((connectors[0].x, connectors[0].y), (16, 16));
        let npcs = map.layer("npcs").unwrap().objects.as_ref().unwrap();
        assert_eq!(npcs[0].id, 4);
        assert_eq!((npcs[0].x, npcs[0].y), (80, 88));
        assert_eq!(map.nextobjectid, 5);
        assert_eq!(output.stats.connectors, 1);
        assert!(output.generated.tiles.is_empty());
    }

    #[test]
    fn test_missing_wire_offset_aborts() {
        let entities = vec![RawEntity {
            name: "ObjectEntity".to_string(),
            data: json!({
                "name": "door",
                "tilePosition": [1, 1],
                "inputWireNodes": [{"connections": [[[0, 0], 0]]}]
            }),
        }];
        let err = convert_world(
            &world(vec![TileCell::default(); REGION_CELLS], entities),
            &config(),
            &declared(),
            "g.json",
            DEFAULT_PLACEHOLDER_IMAGE,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
    }

    #[test]
    fn test_same_named_tilesets_are_rejected() {
        let mut first = TileLookup::new("tiles");
        first.insert(MaterialKey::new("dirt", 0, None).into(), 0);
        let mut second = TileLookup::new("tiles");
        second.insert(MaterialKey::new("stone", 0, None).into(), 3);
        let declared = vec![
            DeclaredTileset {
                lookup: first,
                tile_count: 10,
                source: "x/tiles.json".to_string(),
            },
            DeclaredTileset {
                lookup: second,
                tile_count: 5,
                source: "y/tiles.json".to_string(),
            },
        ];
        let mut tiles = vec![TileCell::default(); REGION_CELLS];
        tiles[at(0, 0)].foreground_material = 2;

        let err = convert_world(
            &world(tiles, vec![]),
            &config(),
            &declared,
            "g.json",
            DEFAULT_PLACEHOLDER_IMAGE,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Format(FormatError::DuplicateTileset(ref name)) if name == "tiles"
        ));
    }

    #[test]
    fn test_reserved_tileset_name_is_rejected() {
        let mut declared = declared();
        declared[0].lookup = TileLookup::new(EMPTY_TILESET);
        let err = convert_world(
            &world(vec![TileCell::default(); REGION_CELLS], vec![]),
            &config(),
            &declared,
            "g.json",
            DEFAULT_PLACEHOLDER_IMAGE,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Format(FormatError::ReservedTilesetName(_))
        ));
    }
}
