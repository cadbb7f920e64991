//! Serialising processed layers and persisting both output tiers.
//!
//! Every buffer is produced in memory before the filesystem is touched.
//! Files are staged as temporary siblings and renamed into place; when a
//! rename fails, files already persisted by the same call are removed.

mod encode;
mod error;

use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, warn};
use strata_core::Layer;
use tempfile::NamedTempFile;

pub use encode::encode_geojson;
pub use error::WriteError;

/// Gzip level used for the compressed lite tier.
pub const GZIP_LEVEL: u32 = 9;

/// Compress `bytes` with gzip at [`GZIP_LEVEL`].
pub fn gzip(bytes: &[u8], layer: &str) -> Result<Vec<u8>, WriteError> {
    let compress_error = |source| WriteError::Compress {
        source,
        layer: layer.to_owned(),
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(GZIP_LEVEL));
    encoder.write_all(bytes).map_err(compress_error)?;
    encoder.finish().map_err(compress_error)
}

/// File names produced for a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `<name>.full.geojson`.
    pub full: Utf8PathBuf,
    /// `<name>.lite.geojson`.
    pub lite: Utf8PathBuf,
    /// `<name>.lite.geojson.gz`, present when compression was requested.
    pub lite_gzip: Option<Utf8PathBuf>,
}

impl OutputPaths {
    /// Paths for `name` under `dir`, including the gzip path.
    pub fn for_layer(dir: &Utf8Path, name: &str) -> Self {
        Self {
            full: dir.join(format!("{name}.full.geojson")),
            lite: dir.join(format!("{name}.lite.geojson")),
            lite_gzip: Some(dir.join(format!("{name}.lite.geojson.gz"))),
        }
    }

    /// Every path in write order.
    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        [Some(&self.full), Some(&self.lite), self.lite_gzip.as_ref()]
            .into_iter()
            .flatten()
            .map(Utf8PathBuf::as_path)
    }
}

/// Serialised tiers of one layer, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    name: String,
    full: Vec<u8>,
    lite: Vec<u8>,
    lite_gzip: Option<Vec<u8>>,
}

impl OutputArtifact {
    /// Serialise both tiers; gzip the lite bytes when `compress` is set.
    pub fn build(full: &Layer, lite: &Layer, compress: bool) -> Result<Self, WriteError> {
        let full_bytes = encode_geojson(full)?;
        let lite_bytes = encode_geojson(lite)?;
        let lite_gzip = if compress {
            Some(gzip(&lite_bytes, lite.name())?)
        } else {
            None
        };
        Ok(Self {
            name: lite.name().to_owned(),
            full: full_bytes,
            lite: lite_bytes,
            lite_gzip,
        })
    }

    /// Serialised full tier.
    pub fn full(&self) -> &[u8] {
        &self.full
    }

    /// Serialised lite tier.
    pub fn lite(&self) -> &[u8] {
        &self.lite
    }

    /// Gzip of the lite tier, when requested.
    pub fn lite_gzip(&self) -> Option<&[u8]> {
        self.lite_gzip.as_deref()
    }

    /// Write every buffer into `dir`, creating it when missing.
    ///
    /// Either all files are in place when this returns `Ok`, or none of the
    /// files written by this call remain.
    pub fn write_to(&self, dir: &Utf8Path) -> Result<OutputPaths, WriteError> {
        strata_fs::ensure_dir(dir).map_err(|source| WriteError::CreateDir {
            source,
            path: dir.to_path_buf(),
        })?;
        let mut paths = OutputPaths::for_layer(dir, &self.name);
        if self.lite_gzip.is_none() {
            paths.lite_gzip = None;
        }
        let buffers = [Some(&self.full), Some(&self.lite), self.lite_gzip.as_ref()]
            .into_iter()
            .flatten();
        let staged = paths
            .iter()
            .zip(buffers)
            .map(|(path, bytes)| stage(dir, path, bytes))
            .collect::<Result<Vec<_>, _>>()?;

        let mut persisted: Vec<&Utf8Path> = Vec::with_capacity(staged.len());
        for (temp, path) in staged.into_iter().zip(paths.iter()) {
            if let Err(err) = temp.persist(path) {
                roll_back(&persisted);
                return Err(WriteError::Persist {
                    source: err.error,
                    path: path.to_path_buf(),
                });
            }
            persisted.push(path);
        }
        debug!("layer {}: wrote {} files to {dir}", self.name, persisted.len());
        Ok(paths)
    }
}

fn stage(dir: &Utf8Path, path: &Utf8Path, bytes: &[u8]) -> Result<NamedTempFile, WriteError> {
    let write_error = |source| WriteError::Write {
        source,
        path: path.to_path_buf(),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(bytes).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    Ok(temp)
}

fn roll_back(persisted: &[&Utf8Path]) {
    for path in persisted {
        if let Err(err) = strata_fs::remove_file_if_exists(path) {
            warn!("failed to remove partial output {path}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use geo::Point;
    use rstest::{fixture, rstest};
    use std::io::Read;
    use strata_core::{Feature, Geometry, GeometryFamily};
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        (dir, root)
    }

    #[fixture]
    fn shops() -> Layer {
        Layer::new(
            "tiendas",
            GeometryFamily::Points,
            None,
            vec![Feature::new(Geometry::Point(Point::new(-57.6, -25.3)))],
        )
        .expect("valid layer")
    }

    #[rstest]
    fn writes_every_tier(workspace: (TempDir, Utf8PathBuf), shops: Layer) {
        let (_guard, root) = workspace;
        let out = root.join("build");
        let artifact = OutputArtifact::build(&shops, &shops, true).expect("build artifact");
        let paths = artifact.write_to(&out).expect("write artifact");
        assert_eq!(paths.full, out.join("tiendas.full.geojson"));
        assert_eq!(paths.lite, out.join("tiendas.lite.geojson"));
        assert_eq!(paths.lite_gzip, Some(out.join("tiendas.lite.geojson.gz")));
        for path in paths.iter() {
            assert!(path.is_file(), "{path} should exist");
        }
        assert_eq!(std::fs::read(&paths.lite).expect("read lite"), artifact.lite());
    }

    #[rstest]
    fn gzip_decompresses_to_the_lite_bytes(shops: Layer) {
        let artifact = OutputArtifact::build(&shops, &shops, true).expect("build artifact");
        let mut decoded = Vec::new();
        GzDecoder::new(artifact.lite_gzip().expect("gzip requested"))
            .read_to_end(&mut decoded)
            .expect("decompress");
        assert_eq!(decoded, artifact.lite());
    }

    #[rstest]
    fn compression_can_be_disabled(workspace: (TempDir, Utf8PathBuf), shops: Layer) {
        let (_guard, root) = workspace;
        let artifact = OutputArtifact::build(&shops, &shops, false).expect("build artifact");
        let paths = artifact.write_to(&root).expect("write artifact");
        assert_eq!(paths.lite_gzip, None);
        assert!(!root.join("tiendas.lite.geojson.gz").exists());
        assert_eq!(paths.iter().count(), 2);
    }

    #[rstest]
    fn failed_persist_leaves_no_outputs(workspace: (TempDir, Utf8PathBuf), shops: Layer) {
        let (_guard, root) = workspace;
        // A directory squatting on the gzip path makes the last rename fail.
        std::fs::create_dir(root.join("tiendas.lite.geojson.gz")).expect("create blocker");
        let artifact = OutputArtifact::build(&shops, &shops, true).expect("build artifact");
        let err = artifact.write_to(&root).expect_err("persist should fail");
        assert!(matches!(err, WriteError::Persist { .. }));
        assert!(!root.join("tiendas.full.geojson").exists());
        assert!(!root.join("tiendas.lite.geojson").exists());
    }
}
