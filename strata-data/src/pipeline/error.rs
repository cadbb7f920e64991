//! Stage identifiers and the per-layer failure type.

use std::fmt;

use strata_core::ReprojectError;
use thiserror::Error;

use super::Interrupt;
use crate::{LoadError, WriteError};

/// Stages a layer passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerStage {
    /// Reading the archive.
    Load,
    /// Normalising the CRS to WGS84.
    Reproject,
    /// Restoring polygon validity.
    Repair,
    /// Keeping allow-listed attributes.
    Prune,
    /// Quantising coordinates.
    PrecisionReduce,
    /// Dropping small holes and parts.
    Filter,
    /// Topology-preserving simplification.
    Simplify,
    /// Grid-based point deduplication.
    Dedupe,
    /// Serialising and persisting outputs.
    Write,
}

impl LayerStage {
    /// Stable lower-case name used in logs and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Reproject => "reproject",
            Self::Repair => "repair",
            Self::Prune => "prune",
            Self::PrecisionReduce => "precision",
            Self::Filter => "filter",
            Self::Simplify => "simplify",
            Self::Dedupe => "dedupe",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for LayerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a layer failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayerErrorKind {
    /// The archive could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The layer could not be reprojected.
    #[error(transparent)]
    Reproject(#[from] ReprojectError),
    /// Outputs could not be written.
    #[error(transparent)]
    Write(#[from] WriteError),
    /// The layer was cancelled.
    #[error("cancelled")]
    Cancelled,
    /// The layer ran past its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupt> for LayerErrorKind {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => Self::Cancelled,
            Interrupt::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Terminal failure of one layer, naming the stage that failed.
#[derive(Debug, Error)]
#[error("layer {layer} failed at {stage}: {kind}")]
pub struct LayerError {
    /// Layer name.
    pub layer: String,
    /// Stage that failed or was about to start.
    pub stage: LayerStage,
    /// Underlying cause.
    #[source]
    pub kind: LayerErrorKind,
}

impl LayerError {
    pub(crate) fn new(layer: &str, stage: LayerStage, kind: impl Into<LayerErrorKind>) -> Self {
        Self {
            layer: layer.to_owned(),
            stage,
            kind: kind.into(),
        }
    }
}
