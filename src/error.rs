//! Top-level error of a conversion run

use thiserror::Error;

use crate::config::ConfigError;
use crate::encode::EncodeError;
use crate::output::OutputError;
use crate::tileset::FormatError;
use crate::world::WorldError;

/// Any fatal condition of a conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid tileset pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("No tileset matches '{0}'")]
    NoTilesets(String),
}
