//! Locate and extract the first shapefile dataset in a zip archive.

use std::io::{self, Read, Seek};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use log::warn;
use zip::ZipArchive;

use super::LoadError;

/// Sidecar extensions extracted next to the `.shp` entry.
pub(crate) const SIDECARS: [&str; 4] = ["shx", "dbf", "prj", "cpg"];

/// Base name given to extracted dataset files.
const DATASET_STEM: &str = "dataset";

/// Paths of an extracted dataset inside the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractedDataset {
    pub(crate) shp: Utf8PathBuf,
    pub(crate) prj: Option<Utf8PathBuf>,
    pub(crate) cpg: Option<Utf8PathBuf>,
}

/// Lower-cased extension of `path` when it is valid UTF-8.
fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether an archive entry is a shapefile geometry file.
pub(crate) fn is_shapefile_entry(path: &Path) -> bool {
    extension(path).as_deref() == Some("shp")
}

/// Open `archive_path` and extract its first `.shp` entry plus sidecars.
///
/// Entries whose names would escape the extraction directory are skipped
/// with a warning. Extensions are lower-cased on extraction so that the
/// shapefile reader finds the sidecars regardless of the archive's casing.
pub(crate) fn extract_first_dataset(
    archive_path: &Utf8Path,
    scratch: &Utf8Path,
) -> Result<ExtractedDataset, LoadError> {
    let file = open_archive(archive_path).map_err(|source| LoadError::OpenArchive {
        source,
        path: archive_path.to_path_buf(),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| LoadError::ReadArchive {
        source,
        path: archive_path.to_path_buf(),
    })?;
    let entries = safe_entries(&mut archive, archive_path)?;
    let Some((_, shp_path)) = entries.iter().find(|(_, path)| is_shapefile_entry(path)) else {
        return Err(LoadError::NoShapefile {
            path: archive_path.to_path_buf(),
        });
    };
    let stem = shp_path.with_extension("");
    let wanted: Vec<(usize, String)> = entries
        .iter()
        .filter(|(_, path)| path.with_extension("") == stem)
        .filter_map(|(index, path)| {
            let ext = extension(path)?;
            (ext == "shp" || SIDECARS.contains(&ext.as_str())).then_some((*index, ext))
        })
        .collect();

    let dir = fs_utf8::Dir::open_ambient_dir(scratch, ambient_authority())
        .map_err(|source| LoadError::Scratch { source })?;
    let (mut prj, mut cpg) = (None, None);
    for (index, ext) in wanted {
        let target = format!("{DATASET_STEM}.{ext}");
        copy_entry(&mut archive, index, &dir, &target).map_err(|source| LoadError::Extract {
            source,
            entry: shp_path.with_extension(&ext).display().to_string(),
            path: archive_path.to_path_buf(),
        })?;
        match ext.as_str() {
            "prj" => prj = Some(scratch.join(&target)),
            "cpg" => cpg = Some(scratch.join(&target)),
            _ => {}
        }
    }
    Ok(ExtractedDataset {
        shp: scratch.join(format!("{DATASET_STEM}.shp")),
        prj,
        cpg,
    })
}

fn open_archive(path: &Utf8Path) -> io::Result<std::fs::File> {
    let (dir, name) = strata_fs::open_dir_and_file(path)?;
    Ok(dir.open(&name)?.into_std())
}

/// File entries in archive order, minus directories and unsafe names.
fn safe_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    archive_path: &Utf8Path,
) -> Result<Vec<(usize, std::path::PathBuf)>, LoadError> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|source| LoadError::ReadArchive {
                source,
                path: archive_path.to_path_buf(),
            })?;
        if entry.is_dir() {
            continue;
        }
        match entry.enclosed_name() {
            Some(path) => entries.push((index, path)),
            None => warn!("{archive_path}: skipping unsafe entry {:?}", entry.name()),
        }
    }
    Ok(entries)
}

fn copy_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    dir: &fs_utf8::Dir,
    target: &str,
) -> io::Result<()> {
    let mut entry = archive.by_index(index).map_err(io::Error::other)?;
    let mut file = dir.create(target)?;
    io::copy(&mut entry, &mut file)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("manzanas.shp", true)]
    #[case("capas/MANZANAS.SHP", true)]
    #[case("manzanas.shx", false)]
    #[case("manzanas.shp.xml", false)]
    #[case("README", false)]
    fn recognises_shapefile_entries(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_shapefile_entry(Path::new(name)), expected);
    }
}
