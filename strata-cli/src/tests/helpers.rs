//! Test helpers for building CLI workspaces and stub layers.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use strata_core::test_support::{point_layer, polygon_layer, square};
use strata_data::test_support::StubSource;
use tempfile::TempDir;

/// Temporary directory with a UTF-8 path.
pub(super) fn workspace() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    (dir, root)
}

/// Create a placeholder archive; the stub source never reads it.
pub(super) fn placeholder_archive(root: &Utf8Path, name: &str) -> Utf8PathBuf {
    let path = root.join(format!("{name}.zip"));
    fs::write(&path, b"placeholder").expect("write placeholder archive");
    path
}

/// Source serving a two-parcel polygon layer and a three-point layer.
pub(super) fn stub_source() -> StubSource {
    StubSource::new()
        .with_layer(polygon_layer(
            "manzanas",
            vec![square(-57.64, -25.29, 0.005), square(-57.63, -25.29, 0.005)],
        ))
        .with_layer(point_layer(
            "tiendas",
            &[(-57.6, -25.3), (-57.600_001, -25.300_001), (-57.5, -25.2)],
        ))
}

/// Sorted names of the files in `dir`, empty when it does not exist.
pub(super) fn output_files(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|entry| entry.expect("read entry").file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Write `body` as `manifest.json` under `root`.
pub(super) fn write_manifest(root: &Utf8Path, body: &str) -> Utf8PathBuf {
    let path = root.join("manifest.json");
    fs::write(&path, body).expect("write manifest");
    path
}
