//! Error types emitted by the Strata CLI.
//!
//! Layer failures are boxed so that `Result<_, CliError>` stays small.

use std::sync::Arc;

use camino::Utf8PathBuf;
use strata_core::ProfileError;
use strata_data::{BatchError, LayerError};
use thiserror::Error;

/// Errors emitted by the Strata CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory { path: Utf8PathBuf },
    /// Profile flags failed validation.
    #[error("invalid processing profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    /// Reading the batch manifest failed.
    #[error("failed to read manifest {path:?}: {source}")]
    ReadManifest {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The batch manifest is not valid JSON for a job list.
    #[error("failed to parse manifest {path:?}: {source}")]
    ParseManifest {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The batch manifest lists no layers.
    #[error("manifest {path:?} lists no layers")]
    EmptyManifest { path: Utf8PathBuf },
    /// Two manifest entries would write the same output files.
    #[error("manifest {path:?} lists layer {name:?} more than once")]
    DuplicateLayer { path: Utf8PathBuf, name: String },
    /// The batch could not start.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// The single requested layer failed.
    #[error(transparent)]
    Layer(Box<LayerError>),
    /// Some layers of a batch failed.
    #[error("{failed} of {total} layers failed")]
    LayersFailed { failed: usize, total: usize },
}

impl From<LayerError> for CliError {
    fn from(err: LayerError) -> Self {
        Self::Layer(Box::new(err))
    }
}
