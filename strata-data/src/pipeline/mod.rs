//! Per-layer orchestration of the normalisation stages.
//!
//! A layer is loaded, reprojected and repaired once. The reduction stages
//! then run per tier, and both tiers are written together. Every stage
//! transition checks the layer's [`CancellationToken`]; the first failure
//! aborts the layer and nothing is written for it.

mod cancel;
mod error;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strata_core::{
    GeometryFamily, Layer, ProcessingProfile, RepairWarning, TierProfiles, dedupe_points,
    filter_small_features, prune_attributes, reduce_precision, repair_layer, reproject_layer,
    simplify_layer,
};

pub use cancel::{CancellationToken, Interrupt};
pub use error::{LayerError, LayerErrorKind, LayerStage};

use crate::{LayerSource, OutputArtifact, OutputPaths};

/// One layer to process: its name, archive and tier profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerJob {
    /// Layer name, used for output file names.
    pub name: String,
    /// Zip archive holding the shapefile dataset.
    pub archive: Utf8PathBuf,
    /// Profiles for the full and lite tiers.
    #[serde(default)]
    pub tiers: TierProfiles,
}

impl LayerJob {
    /// Job running `tiers` over `archive`.
    pub fn new(name: impl Into<String>, archive: impl Into<Utf8PathBuf>, tiers: TierProfiles) -> Self {
        Self {
            name: name.into(),
            archive: archive.into(),
            tiers,
        }
    }
}

/// Settings shared by every layer of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Directory receiving the output files.
    pub output_dir: Utf8PathBuf,
    /// Wall-clock budget per layer; `None` means unbounded.
    pub layer_timeout: Option<std::time::Duration>,
}

impl PipelineConfig {
    /// Write into `output_dir` with no per-layer timeout.
    pub fn new(output_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            layer_timeout: None,
        }
    }

    /// Set the per-layer timeout.
    #[must_use]
    pub fn with_layer_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.layer_timeout = Some(timeout);
        self
    }

    /// Output directory.
    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }
}

/// Counters for one tier of a processed layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TierReport {
    /// Features entering the tier's reduction stages.
    pub features_in: usize,
    /// Features written.
    pub features_out: usize,
    /// Features emptied by the small-feature filter.
    pub dropped_features: usize,
    /// Holes removed by the small-feature filter.
    pub dropped_holes: usize,
    /// Points removed as grid duplicates.
    pub deduplicated: usize,
    /// Coordinates before simplification.
    pub coords_before: usize,
    /// Coordinates after simplification.
    pub coords_after: usize,
    /// Geometries left unsimplified because no candidate was acceptable.
    pub kept_original: usize,
}

/// Outcome of a successfully processed layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerReport {
    /// Layer name.
    pub layer: String,
    /// Geometry family of the loaded layer.
    pub family: GeometryFamily,
    /// Features read from the archive.
    pub features_loaded: usize,
    /// Polygons rebuilt by the repairer.
    pub repaired: usize,
    /// Non-fatal repair failures.
    pub repair_warnings: Vec<RepairWarning>,
    /// Full tier counters.
    pub full: TierReport,
    /// Lite tier counters.
    pub lite: TierReport,
    /// Files written.
    pub written: OutputPaths,
}

/// Run every stage for `job`, writing into `config`'s output directory.
///
/// `token` is checked before each stage. The error names the stage that
/// failed or was about to start.
///
/// # Examples
/// ```no_run
/// use strata_core::{ProcessingProfile, TierProfiles};
/// use strata_data::{CancellationToken, LayerJob, PipelineConfig, ShapefileArchiveSource, process_layer};
///
/// # fn main() -> Result<(), strata_data::LayerError> {
/// let job = LayerJob::new("manzanas", "data/manzanas.zip", TierProfiles::shared(ProcessingProfile::default()));
/// let report = process_layer(
///     &ShapefileArchiveSource::new(),
///     &job,
///     &PipelineConfig::new("build"),
///     &CancellationToken::new(),
/// )?;
/// println!("wrote {}", report.written.lite);
/// # Ok(())
/// # }
/// ```
pub fn process_layer<S: LayerSource + ?Sized>(
    source: &S,
    job: &LayerJob,
    config: &PipelineConfig,
    token: &CancellationToken,
) -> Result<LayerReport, LayerError> {
    let run = LayerRun {
        name: &job.name,
        token,
    };
    info!("layer {}: processing {}", job.name, job.archive);

    run.enter(LayerStage::Load)?;
    let layer = source
        .load(&job.name, &job.archive)
        .map_err(|err| LayerError::new(&job.name, LayerStage::Load, err))?;
    let family = layer.family();
    let features_loaded = layer.len();

    run.enter(LayerStage::Reproject)?;
    let layer =
        reproject_layer(layer).map_err(|err| LayerError::new(&job.name, LayerStage::Reproject, err))?;

    run.enter(LayerStage::Repair)?;
    let repaired = repair_layer(layer);

    let (full_layer, full) = run.reduce(repaired.layer.clone(), &job.tiers.full)?;
    let (lite_layer, lite) = if job.tiers.is_shared() {
        (full_layer.clone(), full)
    } else {
        run.reduce(repaired.layer, &job.tiers.lite)?
    };

    run.enter(LayerStage::Write)?;
    let written = OutputArtifact::build(&full_layer, &lite_layer, job.tiers.lite.emit_compressed())
        .and_then(|artifact| artifact.write_to(config.output_dir()))
        .map_err(|err| LayerError::new(&job.name, LayerStage::Write, err))?;

    info!(
        "layer {}: done, {features_loaded} features in, {} full / {} lite out",
        job.name, full.features_out, lite.features_out
    );
    Ok(LayerReport {
        layer: job.name.clone(),
        family,
        features_loaded,
        repaired: repaired.repaired,
        repair_warnings: repaired.warnings,
        full,
        lite,
        written,
    })
}

struct LayerRun<'a> {
    name: &'a str,
    token: &'a CancellationToken,
}

impl LayerRun<'_> {
    fn enter(&self, stage: LayerStage) -> Result<(), LayerError> {
        self.token
            .check()
            .map_err(|interrupt| LayerError::new(self.name, stage, interrupt))?;
        debug!("layer {}: entering {stage}", self.name);
        Ok(())
    }

    /// Prune, quantise, filter, simplify and dedupe one tier.
    fn reduce(
        &self,
        layer: Layer,
        profile: &ProcessingProfile,
    ) -> Result<(Layer, TierReport), LayerError> {
        let mut report = TierReport {
            features_in: layer.len(),
            ..TierReport::default()
        };

        self.enter(LayerStage::Prune)?;
        let mut layer = prune_attributes(layer, profile.keep_columns());

        if let Some(grid) = profile.precision_grid() {
            self.enter(LayerStage::PrecisionReduce)?;
            layer = reduce_precision(layer, grid);
        }

        let family = layer.family();
        if family == GeometryFamily::Polygons && !profile.is_points() && profile.filters_small_features() {
            self.enter(LayerStage::Filter)?;
            let outcome = filter_small_features(layer, profile.area_thresholds());
            report.dropped_features = outcome.dropped_features;
            report.dropped_holes = outcome.dropped_holes;
            layer = outcome.layer;
        }

        if family != GeometryFamily::Points && !profile.is_points() && profile.simplify_tolerance() > 0.0 {
            self.enter(LayerStage::Simplify)?;
            let outcome = simplify_layer(layer, profile.simplify_tolerance());
            report.coords_before = outcome.coords_before;
            report.coords_after = outcome.coords_after;
            report.kept_original = outcome.kept_original;
            layer = outcome.layer;
        }

        if family == GeometryFamily::Points && profile.is_points() {
            self.enter(LayerStage::Dedupe)?;
            let outcome = dedupe_points(layer, profile.dedupe_grid());
            report.deduplicated = outcome.removed;
            layer = outcome.layer;
        }

        report.features_out = layer.len();
        Ok((layer, report))
    }
}
