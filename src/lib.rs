//! Facade crate for the Strata layer normalisation pipeline.
//!
//! This crate re-exports the core geometry model and stages, and exposes the
//! archive loading, writing and orchestration layer behind the `pipeline`
//! feature.
//!
//! # Examples
//! ```
//! use strata::{ProcessingProfile, TierProfiles};
//!
//! # fn main() -> Result<(), strata::ProfileError> {
//! let lite = ProcessingProfile::builder().simplify_tolerance(0.001).build()?;
//! let tiers = TierProfiles::unreduced_full(lite);
//! assert!(!tiers.is_shared());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub use strata_core::{
    AreaThresholds, AttributeValue, Attributes, Crs, Feature, Geometry, GeometryFamily, Layer,
    ProcessingProfile, ProfileBuilder, ProfileError, RepairWarning, ReprojectError, TierProfiles,
    dedupe_points, filter_small_features, prune_attributes, reduce_precision, repair_layer,
    reproject_layer, simplify_layer,
};

#[cfg(feature = "test-support")]
pub use strata_core::test_support;

/// Loading, writing and per-layer orchestration.
#[cfg(feature = "pipeline")]
pub mod pipeline {
    pub use strata_data::{
        BatchError, BatchRunner, CancellationToken, JobOutcome, LayerError, LayerErrorKind,
        LayerJob, LayerReport, LayerSource, LayerStage, LoadError, OutputPaths, PipelineConfig,
        ShapefileArchiveSource, TierReport, WriteError, process_layer,
    };
}
