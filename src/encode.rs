//! Tile layer encoding
//!
//! A resolved layer is flipped to the document's top-left origin, turned into
//! row-major GIDs, written as little-endian `u32`s, zlib-compressed and
//! base64-encoded into the layer's `data` string.

use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

use crate::grid::Grid;
use crate::models::ResolvedTile;
use crate::tileset::{FormatError, GidIndex};

/// Error type for layer encoding and decoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Compression error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid base64 layer data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Layer data length {0} is not a multiple of 4")]
    Length(usize),
}

/// GIDs of a world-origin layer, in document row order.
///
/// World row `height - 1 - y` becomes document row `y`.
pub fn layer_gids(grid: &Grid<ResolvedTile>, index: &GidIndex) -> Result<Vec<u32>, FormatError> {
    let mut gids = Vec::with_capacity(grid.cells().len());
    for row in grid.rows().rev() {
        for tile in row {
            gids.push(index.gid_of(tile)?);
        }
    }
    Ok(gids)
}

/// Compress and text-encode a GID sequence.
pub fn encode_gids(gids: &[u32]) -> Result<String, EncodeError> {
    let mut raw = Vec::with_capacity(gids.len() * 4);
    for gid in gids {
        raw.extend_from_slice(&gid.to_le_bytes());
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;

    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

/// Exact inverse of [`encode_gids`].
pub fn decode_gids(data: &str) -> Result<Vec<u32>, EncodeError> {
    let compressed = base64::engine::general_purpose::STANDARD.decode(data.trim())?;

    let mut raw = Vec::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;
    if raw.len() % 4 != 0 {
        return Err(EncodeError::Length(raw.len()));
    }

    Ok(raw
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Encode a resolved world-origin layer into a layer `data` string.
pub fn encode_layer(grid: &Grid<ResolvedTile>, index: &GidIndex) -> Result<String, EncodeError> {
    let gids = layer_gids(grid, index)?;
    encode_gids(&gids)
}
