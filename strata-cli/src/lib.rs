//! Command-line interface for the Strata layer normalisation pipeline.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use strata_data::ShapefileArchiveSource;

mod batch;
mod error;
mod process;

pub use error::CliError;

use batch::{BatchArgs, run_batch};
use process::{ProcessArgs, run_process};

pub(crate) const ARG_NAME: &str = "name";
pub(crate) const ARG_ARCHIVE: &str = "archive";
pub(crate) const ARG_OUTPUT_DIR: &str = "output-dir";
pub(crate) const ARG_MANIFEST: &str = "manifest";
pub(crate) const ENV_PROCESS_NAME: &str = "STRATA_CMDS_PROCESS_NAME";
pub(crate) const ENV_PROCESS_ARCHIVE: &str = "STRATA_CMDS_PROCESS_ARCHIVE";
pub(crate) const ENV_BATCH_MANIFEST: &str = "STRATA_CMDS_BATCH_MANIFEST";

/// Output directory used when none is configured.
pub(crate) const DEFAULT_OUTPUT_DIR: &str = "build";

/// Run the Strata CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let source = ShapefileArchiveSource::new();
    match cli.command {
        Command::Process(args) => run_process(args, &source),
        Command::Batch(args) => run_batch(args, &source),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "strata",
    about = "Normalise zipped shapefile layers into full and lite GeoJSON",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalise a single layer.
    Process(ProcessArgs),
    /// Normalise every layer listed in a JSON manifest.
    Batch(BatchArgs),
}

#[cfg(test)]
mod tests;
