//! Error types produced while loading a layer from an archive.

use std::io;

use camino::Utf8PathBuf;
use strata_core::LayerError;
use thiserror::Error;

/// Errors produced while locating, extracting or reading a shapefile.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The archive could not be opened.
    #[error("failed to open archive {path}: {source}")]
    OpenArchive {
        source: io::Error,
        path: Utf8PathBuf,
    },
    /// The archive is not a readable zip file.
    #[error("failed to read archive {path}: {source}")]
    ReadArchive {
        source: zip::result::ZipError,
        path: Utf8PathBuf,
    },
    /// The archive holds no `.shp` entry.
    #[error("no shapefile found in {path}")]
    NoShapefile { path: Utf8PathBuf },
    /// A scratch directory for extraction could not be created.
    #[error("failed to create extraction directory: {source}")]
    Scratch { source: io::Error },
    /// Copying an archive entry to the scratch directory failed.
    #[error("failed to extract {entry} from {path}: {source}")]
    Extract {
        source: io::Error,
        entry: String,
        path: Utf8PathBuf,
    },
    /// The `.prj` sidecar exists but could not be read.
    #[error("failed to read projection file {path}: {source}")]
    ReadProjection {
        source: io::Error,
        path: Utf8PathBuf,
    },
    /// The `.cpg` sidecar exists but could not be read.
    #[error("failed to read code page file {path}: {source}")]
    ReadCodePage {
        source: io::Error,
        path: Utf8PathBuf,
    },
    /// The shapefile or its dBase table is malformed.
    #[error("failed to read shapefile {path}: {source}")]
    ReadShapefile {
        source: shapefile::Error,
        path: Utf8PathBuf,
    },
    /// A record holds a shape the pipeline cannot represent.
    #[error("record {index} holds an unsupported {kind} shape")]
    UnsupportedShape { index: usize, kind: &'static str },
    /// Records mix geometry families.
    #[error("shapefile mixes geometry families: {source}")]
    MixedGeometry {
        #[from]
        source: LayerError,
    },
}
