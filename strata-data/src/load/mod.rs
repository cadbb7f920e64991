//! Loading raw layers from zipped shapefile archives.

mod archive;
mod convert;
mod encoding;
mod error;

use std::fs::File;
use std::io::{self, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use strata_core::{Crs, Feature, GeometryFamily, Layer};
use tempfile::TempDir;

pub use error::LoadError;

use archive::extract_first_dataset;
use convert::{record_to_attributes, shape_to_geometry};
use encoding::DbfEncoding;

/// Source of raw layers for the pipeline.
///
/// Implementations must be shareable across the batch runner's workers.
pub trait LayerSource: Send + Sync {
    /// Load the layer called `name` from `archive`.
    fn load(&self, name: &str, archive: &Utf8Path) -> Result<Layer, LoadError>;
}

/// Reads the first shapefile dataset found in a zip archive.
///
/// The dataset is extracted into a temporary directory that is removed when
/// loading finishes, whatever the outcome.
#[derive(Debug, Clone, Default)]
pub struct ShapefileArchiveSource {
    scratch_root: Option<Utf8PathBuf>,
}

impl ShapefileArchiveSource {
    /// Extract into the system temporary directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract into temporary directories created under `root`.
    #[must_use]
    pub fn with_scratch_root(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            scratch_root: Some(root.into()),
        }
    }

    fn scratch_dir(&self) -> io::Result<(TempDir, Utf8PathBuf)> {
        let dir = match &self.scratch_root {
            Some(root) => tempfile::Builder::new().prefix("strata-").tempdir_in(root)?,
            None => tempfile::Builder::new().prefix("strata-").tempdir()?,
        };
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|_| io::Error::other("temporary directory path is not UTF-8"))?;
        Ok((dir, path))
    }
}

impl LayerSource for ShapefileArchiveSource {
    fn load(&self, name: &str, archive: &Utf8Path) -> Result<Layer, LoadError> {
        let (_guard, scratch) = self
            .scratch_dir()
            .map_err(|source| LoadError::Scratch { source })?;
        let dataset = extract_first_dataset(archive, &scratch)?;
        let crs = match &dataset.prj {
            Some(path) => Some(read_projection(path)?),
            None => None,
        };
        let encoding = match &dataset.cpg {
            Some(path) => read_code_page(name, path)?,
            None => None,
        };
        let layer = read_shapefile(name, &dataset.shp, crs, encoding)?;
        debug!(
            "layer {name}: read {} {} features from {archive}",
            layer.len(),
            layer.family()
        );
        Ok(layer)
    }
}

fn read_sidecar(path: &Utf8Path) -> io::Result<String> {
    let (dir, file) = strata_fs::open_dir_and_file(path)?;
    dir.read_to_string(&file)
}

fn read_projection(path: &Utf8Path) -> Result<Crs, LoadError> {
    let wkt = read_sidecar(path).map_err(|source| LoadError::ReadProjection {
        source,
        path: path.to_path_buf(),
    })?;
    Ok(Crs::from_wkt(&wkt))
}

/// Encoding named by the `.cpg` sidecar.
///
/// An unrecognised label falls back to the code page in the dBase header.
fn read_code_page(name: &str, path: &Utf8Path) -> Result<Option<DbfEncoding>, LoadError> {
    let label = read_sidecar(path).map_err(|source| LoadError::ReadCodePage {
        source,
        path: path.to_path_buf(),
    })?;
    let encoding = DbfEncoding::from_cpg(&label);
    if encoding.is_none() {
        warn!(
            "layer {name}: unknown code page {:?}, using the dBase header",
            label.trim()
        );
    }
    Ok(encoding)
}

type ShapefileReader = shapefile::Reader<BufReader<File>, BufReader<File>>;

/// Open `shp` and its `.dbf`, decoding text with `encoding` when given.
fn open_shapefile(
    shp: &Utf8Path,
    encoding: Option<DbfEncoding>,
) -> Result<ShapefileReader, shapefile::Error> {
    let dbf = shp.with_extension("dbf");
    if !dbf.is_file() {
        return Err(shapefile::Error::MissingDbf);
    }
    let shapes = shapefile::ShapeReader::from_path(shp.as_std_path())?;
    let mut table = shapefile::dbase::Reader::from_path(dbf.as_std_path())?;
    if let Some(encoding) = encoding {
        encoding.install(&mut table);
    }
    Ok(shapefile::Reader::new(shapes, table))
}

/// Read every record of `shp` into a layer.
///
/// The family is taken from the first non-null shape; an empty shapefile
/// yields an empty polygon layer.
fn read_shapefile(
    name: &str,
    shp: &Utf8Path,
    crs: Option<Crs>,
    encoding: Option<DbfEncoding>,
) -> Result<Layer, LoadError> {
    let read_error = |source| LoadError::ReadShapefile {
        source,
        path: shp.to_path_buf(),
    };
    let mut reader = open_shapefile(shp, encoding).map_err(read_error)?;
    let mut features = Vec::new();
    let mut skipped = 0_usize;
    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.map_err(read_error)?;
        match shape_to_geometry(index, shape)? {
            Some(geometry) => {
                features.push(Feature::with_attributes(geometry, record_to_attributes(record)));
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("layer {name}: skipped {skipped} null shapes");
    }
    let family = features
        .first()
        .map_or(GeometryFamily::Polygons, |feature| feature.geometry.family());
    Ok(Layer::new(name, family, crs, features)?)
}
