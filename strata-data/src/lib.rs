//! Archive loading, output writing and orchestration for Strata.
//!
//! Responsibilities:
//! - Read the first shapefile dataset of a zip archive into a `Layer`.
//! - Serialise processed layers as GeoJSON and persist both tiers.
//! - Sequence the `strata-core` stages per layer and fan layers out over a
//!   worker pool.
//!
//! Boundaries:
//! - Geometry rules live in `strata-core`; this crate only wires them.
//! - Paths and profiles arrive through explicit configuration; nothing reads
//!   the working directory implicitly.
//!
//! Invariants:
//! - A failed layer leaves no output files behind.
//! - No global mutable state.
#![forbid(unsafe_code)]

pub mod batch;
pub mod load;
pub mod pipeline;
pub mod write;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use batch::{BatchError, BatchRunner, JobOutcome};
pub use load::{LayerSource, LoadError, ShapefileArchiveSource};
pub use pipeline::{
    CancellationToken, Interrupt, LayerError, LayerErrorKind, LayerJob, LayerReport, LayerStage,
    PipelineConfig, TierReport, process_layer,
};
pub use write::{GZIP_LEVEL, OutputArtifact, OutputPaths, WriteError, encode_geojson, gzip};
