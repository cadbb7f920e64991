//! Batch command implementation for the Strata CLI.

use std::collections::BTreeSet;
use std::io::BufReader;
use std::num::NonZeroUsize;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use strata_data::{BatchRunner, CancellationToken, JobOutcome, LayerJob, LayerSource, PipelineConfig};

use crate::process::{layer_timeout, require_existing, require_output_dir};
use crate::{ARG_MANIFEST, ARG_OUTPUT_DIR, CliError, DEFAULT_OUTPUT_DIR, ENV_BATCH_MANIFEST};

/// CLI arguments for the `batch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Normalise every layer listed in a JSON manifest of the \
                 form {\"layers\": [{\"name\": ..., \"archive\": ..., \
                 \"tiers\": ...}]}. Relative archive paths are resolved \
                 against the manifest's directory. Layers run in parallel \
                 and a failing layer does not stop the others.",
    about = "Normalise the layers listed in a manifest"
)]
#[ortho_config(prefix = "STRATA")]
pub(crate) struct BatchArgs {
    /// Path to the JSON manifest.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) manifest: Option<Utf8PathBuf>,
    /// Directory receiving the outputs (default: `build`).
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// Number of worker threads (default: available parallelism).
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) jobs: Option<NonZeroUsize>,
    /// Per-layer time budget in seconds; 0 disables the deadline.
    #[arg(long, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl BatchArgs {
    pub(crate) fn into_config(self) -> Result<BatchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        BatchConfig::try_from(merged)
    }
}

/// Resolved `batch` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchConfig {
    pub(crate) manifest: Utf8PathBuf,
    pub(crate) workers: Option<NonZeroUsize>,
    pub(crate) pipeline: PipelineConfig,
}

impl BatchConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.manifest, ARG_MANIFEST)?;
        require_output_dir(self.pipeline.output_dir())
    }

    fn runner(&self) -> BatchRunner {
        match self.workers {
            Some(workers) => BatchRunner::new().with_workers(workers),
            None => BatchRunner::new(),
        }
    }
}

impl TryFrom<BatchArgs> for BatchConfig {
    type Error = CliError;

    fn try_from(args: BatchArgs) -> Result<Self, Self::Error> {
        let manifest = args.manifest.ok_or(CliError::MissingArgument {
            field: ARG_MANIFEST,
            env: ENV_BATCH_MANIFEST,
        })?;
        let output_dir = args
            .output_dir
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_DIR));
        Ok(Self {
            manifest,
            workers: args.jobs,
            pipeline: PipelineConfig {
                output_dir,
                layer_timeout: layer_timeout(args.timeout_secs),
            },
        })
    }
}

/// On-disk form of a batch manifest.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Manifest {
    pub(crate) layers: Vec<LayerJob>,
}

/// Load the jobs listed in `path`.
///
/// Relative archive paths are joined onto the manifest's directory.
pub(crate) fn load_manifest(path: &Utf8Path) -> Result<Vec<LayerJob>, CliError> {
    let read_error = |source| CliError::ReadManifest {
        path: path.to_path_buf(),
        source,
    };
    let (dir, name) = strata_fs::open_dir_and_file(path).map_err(read_error)?;
    let file = dir.open(&name).map_err(read_error)?;
    let manifest: Manifest =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            CliError::ParseManifest {
                path: path.to_path_buf(),
                source,
            }
        })?;
    if manifest.layers.is_empty() {
        return Err(CliError::EmptyManifest {
            path: path.to_path_buf(),
        });
    }

    let base = path.parent().unwrap_or_else(|| Utf8Path::new(""));
    let mut seen = BTreeSet::new();
    manifest
        .layers
        .into_iter()
        .map(|mut job| {
            if !seen.insert(job.name.clone()) {
                return Err(CliError::DuplicateLayer {
                    path: path.to_path_buf(),
                    name: job.name,
                });
            }
            if job.archive.is_relative() {
                job.archive = base.join(&job.archive);
            }
            Ok(job)
        })
        .collect()
}

pub(crate) fn run_batch(args: BatchArgs, source: &dyn LayerSource) -> Result<(), CliError> {
    let outcomes = execute_batch(args, source)?;
    summarise(&outcomes)
}

pub(crate) fn execute_batch(
    args: BatchArgs,
    source: &dyn LayerSource,
) -> Result<Vec<JobOutcome>, CliError> {
    let config = resolve_batch_config(args)?;
    let jobs = load_manifest(&config.manifest)?;
    let outcomes = config
        .runner()
        .run(source, &jobs, &config.pipeline, &CancellationToken::new())?;
    Ok(outcomes)
}

pub(crate) fn resolve_batch_config(args: BatchArgs) -> Result<BatchConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Fail when any layer failed; per-layer lines are logged by the runner.
pub(crate) fn summarise(outcomes: &[JobOutcome]) -> Result<(), CliError> {
    let total = outcomes.len();
    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    info!("{} of {total} layers succeeded", total - failed);
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::LayersFailed { failed, total })
    }
}
