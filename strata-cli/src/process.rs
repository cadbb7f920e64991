//! Process command implementation for the Strata CLI.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use strata_core::{ProcessingProfile, TierProfiles};
use strata_data::{
    CancellationToken, LayerJob, LayerReport, LayerSource, PipelineConfig, process_layer,
};

use crate::{
    ARG_ARCHIVE, ARG_NAME, ARG_OUTPUT_DIR, CliError, DEFAULT_OUTPUT_DIR, ENV_PROCESS_ARCHIVE,
    ENV_PROCESS_NAME,
};

/// How the full tier relates to the lite tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FullTier {
    /// Both tiers use the configured profile.
    #[default]
    Same,
    /// The full tier skips precision reduction, filtering and simplification.
    Unreduced,
}

/// CLI arguments for the `process` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Normalise one zipped shapefile layer into \
                 <name>.full.geojson, <name>.lite.geojson and an optional \
                 gzip copy of the lite file. Every option can also come \
                 from configuration files or STRATA_CMDS_PROCESS_* \
                 environment variables.",
    about = "Normalise a single layer"
)]
#[ortho_config(prefix = "STRATA")]
pub(crate) struct ProcessArgs {
    /// Layer name used for the output file names.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Zip archive holding the shapefile dataset.
    #[arg(long = ARG_ARCHIVE, value_name = "path")]
    #[serde(default)]
    pub(crate) archive: Option<Utf8PathBuf>,
    /// Directory receiving the outputs (default: `build`).
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// Comma-separated attribute names to keep; omit to keep all.
    #[arg(long, value_name = "columns")]
    #[serde(default)]
    pub(crate) keep_columns: Option<String>,
    /// Simplification tolerance in degrees; 0 disables simplification.
    #[arg(long, value_name = "degrees")]
    #[serde(default)]
    pub(crate) simplify_tolerance: Option<f64>,
    /// Coordinate grid in degrees; 0 disables precision reduction.
    #[arg(long, value_name = "degrees")]
    #[serde(default)]
    pub(crate) precision_grid: Option<f64>,
    /// Holes smaller than this area (degrees²) are removed.
    #[arg(long, value_name = "area")]
    #[serde(default)]
    pub(crate) hole_area_min: Option<f64>,
    /// Polygon parts smaller than this area (degrees²) are removed.
    #[arg(long, value_name = "area")]
    #[serde(default)]
    pub(crate) part_area_min: Option<f64>,
    /// Treat the layer as points and deduplicate them.
    #[arg(long, value_name = "bool", num_args = 0..=1, default_missing_value = "true")]
    #[serde(default)]
    pub(crate) points: Option<bool>,
    /// Deduplication grid in degrees.
    #[arg(long, value_name = "degrees")]
    #[serde(default)]
    pub(crate) dedupe_grid: Option<f64>,
    /// Whether to write the gzip copy of the lite tier.
    #[arg(long, value_name = "bool")]
    #[serde(default)]
    pub(crate) gzip: Option<bool>,
    /// Full tier profile.
    #[arg(long, value_enum, value_name = "tier")]
    #[serde(default)]
    pub(crate) full_tier: Option<FullTier>,
    /// Per-layer time budget in seconds; 0 disables the deadline.
    #[arg(long, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl ProcessArgs {
    pub(crate) fn into_config(self) -> Result<ProcessConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ProcessConfig::try_from(merged)
    }

    /// Tier profiles described by the profile flags.
    fn tiers(&self) -> Result<TierProfiles, CliError> {
        let mut builder = ProcessingProfile::builder();
        if let Some(columns) = &self.keep_columns {
            builder = builder.keep_columns(parse_columns(columns));
        }
        if let Some(tolerance) = self.simplify_tolerance {
            builder = builder.simplify_tolerance(tolerance);
        }
        if let Some(grid) = self.precision_grid {
            builder = builder.precision_grid((grid != 0.0).then_some(grid));
        }
        if let Some(area) = self.hole_area_min {
            builder = builder.hole_area_min(area);
        }
        if let Some(area) = self.part_area_min {
            builder = builder.part_area_min(area);
        }
        if let Some(points) = self.points {
            builder = builder.is_points(points);
        }
        if let Some(grid) = self.dedupe_grid {
            builder = builder.dedupe_grid(grid);
        }
        if let Some(gzip) = self.gzip {
            builder = builder.emit_compressed(gzip);
        }
        let profile = builder.build()?;
        Ok(match self.full_tier.unwrap_or_default() {
            FullTier::Same => TierProfiles::shared(profile),
            FullTier::Unreduced => TierProfiles::unreduced_full(profile),
        })
    }
}

fn parse_columns(columns: &str) -> Vec<&str> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .collect()
}

/// Turn a timeout in seconds into a deadline; zero means none.
pub(crate) fn layer_timeout(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|&secs| secs > 0).map(Duration::from_secs)
}

/// Resolved `process` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProcessConfig {
    pub(crate) job: LayerJob,
    pub(crate) pipeline: PipelineConfig,
}

impl ProcessConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.job.archive, ARG_ARCHIVE)?;
        require_output_dir(self.pipeline.output_dir())
    }
}

impl TryFrom<ProcessArgs> for ProcessConfig {
    type Error = CliError;

    fn try_from(args: ProcessArgs) -> Result<Self, Self::Error> {
        let tiers = args.tiers()?;
        let name = args.name.ok_or(CliError::MissingArgument {
            field: ARG_NAME,
            env: ENV_PROCESS_NAME,
        })?;
        let archive = args.archive.ok_or(CliError::MissingArgument {
            field: ARG_ARCHIVE,
            env: ENV_PROCESS_ARCHIVE,
        })?;
        let output_dir = args
            .output_dir
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_DIR));
        let pipeline = PipelineConfig {
            output_dir,
            layer_timeout: layer_timeout(args.timeout_secs),
        };
        Ok(Self {
            job: LayerJob::new(name, archive, tiers),
            pipeline,
        })
    }
}

/// Check that `path` names an existing regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match strata_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reject an output directory that already exists as something else.
///
/// A missing directory is fine; the writer creates it.
pub(crate) fn require_output_dir(path: &Utf8Path) -> Result<(), CliError> {
    match strata_fs::dir_is_dir(path) {
        Ok(false) if path.exists() => Err(CliError::OutputDirectoryNotDirectory {
            path: path.to_path_buf(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn run_process(args: ProcessArgs, source: &dyn LayerSource) -> Result<(), CliError> {
    let report = execute_process(args, source)?;
    info!(
        "layer {}: wrote {} ({} features), {} ({} features)",
        report.layer,
        report.written.full,
        report.full.features_out,
        report.written.lite,
        report.lite.features_out
    );
    Ok(())
}

pub(crate) fn execute_process(
    args: ProcessArgs,
    source: &dyn LayerSource,
) -> Result<LayerReport, CliError> {
    let config = resolve_process_config(args)?;
    let token = CancellationToken::new().with_timeout(config.pipeline.layer_timeout);
    Ok(process_layer(source, &config.job, &config.pipeline, &token)?)
}

pub(crate) fn resolve_process_config(args: ProcessArgs) -> Result<ProcessConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}
