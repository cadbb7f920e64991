//! Running many layers in parallel.

use std::num::NonZeroUsize;

use log::{error, info};
use rayon::prelude::*;
use thiserror::Error;

use crate::{CancellationToken, LayerError, LayerJob, LayerReport, LayerSource, PipelineConfig, process_layer};

/// Errors that prevent a batch from starting.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {source}")]
    ThreadPool {
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

/// Outcome of one job in a batch.
pub type JobOutcome = Result<LayerReport, LayerError>;

/// Runs [`LayerJob`]s on a bounded worker pool.
///
/// Layers are independent: a failing layer never stops its siblings, and
/// outcomes are returned in job order.
#[derive(Debug, Clone, Default)]
pub struct BatchRunner {
    workers: Option<NonZeroUsize>,
}

impl BatchRunner {
    /// Runner sized to the available parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use exactly `workers` threads.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Number of worker threads the pool will use.
    pub fn workers(&self) -> usize {
        self.workers.map_or_else(
            || std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            NonZeroUsize::get,
        )
    }

    /// Process every job, sharing `source` and `config` across workers.
    ///
    /// Each job gets its own clone of `token` carrying the configured
    /// per-layer deadline; cancelling `token` stops every remaining layer
    /// at its next stage.
    pub fn run<S: LayerSource + ?Sized>(
        &self,
        source: &S,
        jobs: &[LayerJob],
        config: &PipelineConfig,
        token: &CancellationToken,
    ) -> Result<Vec<JobOutcome>, BatchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers())
            .thread_name(|index| format!("strata-worker-{index}"))
            .build()
            .map_err(|source| BatchError::ThreadPool { source })?;
        info!("processing {} layers on {} workers", jobs.len(), self.workers());
        let outcomes: Vec<JobOutcome> = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let layer_token = token.with_timeout(config.layer_timeout);
                    process_layer(source, job, config, &layer_token)
                })
                .collect()
        });
        for outcome in &outcomes {
            match outcome {
                Ok(report) => info!(
                    "layer {}: ok ({} features, {} repair warnings)",
                    report.layer,
                    report.lite.features_out,
                    report.repair_warnings.len()
                ),
                Err(err) => error!("{err}"),
            }
        }
        Ok(outcomes)
    }
}
