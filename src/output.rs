//! Document output and file path generation
//!
//! Output files are staged as temporary files next to their destination and
//! only renamed into place by [`commit_all`], so a run that fails halfway
//! leaves no document behind.

use normalize_path::NormalizePath;
use serde::Serialize;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Extension of every written document.
pub const OUTPUT_EXTENSION: &str = "json";

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Output path for a document derived from `world`: `{dir}/{world stem}.json`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use world2tiled::output::output_path;
///
/// let path = output_path(Path::new("maps"), Path::new("worlds/ship.world"));
/// assert_eq!(path, Path::new("maps/ship.json"));
/// ```
pub fn output_path(dir: &Path, world: &Path) -> PathBuf {
    let stem = world
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "world".to_string());
    dir.join(format!("{}.{}", stem, OUTPUT_EXTENSION))
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    Ok(path.normalize())
}

/// `path` relative to the directory `base`, with `/` separators.
pub fn relative_source(path: &Path, base: &Path) -> io::Result<String> {
    let path = absolute(path)?;
    let base = absolute(base)?;
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = base_parts[common..]
        .iter()
        .map(|_| "..".to_string())
        .collect();
    parts.extend(
        path_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(parts.join("/"))
    }
}

/// Serialize a document, pretty-printed with four-space indentation unless
/// `compact`.
pub fn to_json_bytes<T: Serialize>(value: &T, compact: bool) -> Result<Vec<u8>, serde_json::Error> {
    if compact {
        return serde_json::to_vec(value);
    }
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value.serialize(&mut serializer)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// A fully written temporary file waiting to be moved onto its target.
#[derive(Debug)]
pub struct PendingWrite {
    file: NamedTempFile,
    target: PathBuf,
}

impl PendingWrite {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged file onto its target.
    pub fn commit(self) -> Result<PathBuf, OutputError> {
        let target = self.target;
        self.file.persist(&target).map_err(|e| OutputError::Io {
            path: target.clone(),
            source: e.error,
        })?;
        Ok(target)
    }
}

/// Stage `value` for writing to `target`.
///
/// Creates the target's directory if needed. Nothing is visible at `target`
/// until [`PendingWrite::commit`].
pub fn stage_json<T: Serialize>(
    value: &T,
    target: &Path,
    compact: bool,
) -> Result<PendingWrite, OutputError> {
    let bytes = to_json_bytes(value, compact).map_err(|source| OutputError::Serialize {
        path: target.to_path_buf(),
        source,
    })?;

    let io_error = |source| OutputError::Io {
        path: target.to_path_buf(),
        source,
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(io_error)?;

    let mut file = NamedTempFile::new_in(&dir).map_err(io_error)?;
    file.write_all(&bytes).map_err(io_error)?;
    file.flush().map_err(io_error)?;

    Ok(PendingWrite {
        file,
        target: target.to_path_buf(),
    })
}

/// Commit staged writes in order.
///
/// If one commit fails, targets already committed by this call are removed
/// again, so the set is written entirely or not at all.
pub fn commit_all(pending: Vec<PendingWrite>) -> Result<Vec<PathBuf>, OutputError> {
    let mut written = Vec::with_capacity(pending.len());
    for write in pending {
        match write.commit() {
            Ok(target) => written.push(target),
            Err(err) => {
                for target in &written {
                    if let Err(e) = fs::remove_file(target) {
                        tracing::warn!(
                            target: "world2tiled::output",
                            path = %target.display(),
                            error = %e,
                            "output.rollback_failed"
                        );
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(written)
}
