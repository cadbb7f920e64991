//! Error types produced while serialising and persisting outputs.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors produced by the layer writer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteError {
    /// The GeoJSON document could not be serialised.
    #[error("failed to serialise layer {layer} as GeoJSON: {source}")]
    Serialise {
        source: serde_json::Error,
        layer: String,
    },
    /// Gzip compression failed.
    #[error("failed to compress layer {layer}: {source}")]
    Compress { source: io::Error, layer: String },
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        source: io::Error,
        path: Utf8PathBuf,
    },
    /// Writing a temporary file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        source: io::Error,
        path: Utf8PathBuf,
    },
    /// Renaming a temporary file into place failed.
    #[error("failed to persist {path}: {source}")]
    Persist {
        source: io::Error,
        path: Utf8PathBuf,
    },
}
