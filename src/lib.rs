//! world2tiled - Library for converting game world snapshots into Tiled maps
//!
//! This library provides functionality to:
//! - Read world snapshots region by region, with their entities
//! - Resolve tile cells against tileset definitions, allocating placeholders
//!   for anything no tileset covers
//! - Reconstruct object wiring as polyline connectors
//! - Assemble and write the map document plus a generated tileset

pub mod assembler;
pub mod cli;
pub mod config;
pub mod document;
pub mod encode;
pub mod entities;
pub mod error;
pub mod grid;
pub mod missing;
pub mod models;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod resolver;
pub mod session;
pub mod tileset;
pub mod wiring;
pub mod world;

pub use error::ConvertError;
pub use pipeline::{run, ConvertOptions};
pub use session::{convert_world, ConversionOutput};
