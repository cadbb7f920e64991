//! Integration tests for `ShapefileArchiveSource`.

use std::fs;

use camino::Utf8PathBuf;
use dbase::yore::code_pages::{CP850, CP1252};
use rstest::rstest;
use strata_core::{AttributeValue, Crs, Ellipsoid, Geometry, GeometryFamily, Hemisphere};
use strata_data::{LayerSource, LoadError, ShapefileArchiveSource};
use tempfile::TempDir;

mod support;

use support::{
    UTM_21S_WKT, parcel_archive, workspace, write_archive_without_shapefile, write_legacy_point,
    write_points, zip_dir,
};

fn first_name(archive: &camino::Utf8Path) -> AttributeValue {
    let layer = ShapefileArchiveSource::new()
        .load("localidades", archive)
        .expect("load archive");
    layer.features()[0]
        .attributes
        .get("NOMBRE")
        .cloned()
        .expect("NOMBRE is kept")
}

#[rstest]
fn code_page_sidecar_selects_the_text_encoding() {
    let (_guard, root) = workspace();
    let dataset = root.join("src");
    fs::create_dir_all(&dataset).expect("create dataset directory");
    write_legacy_point(&dataset, "localidades", "Asunción", CP850);
    let without_cpg = root.join("sin-cpg.zip");
    zip_dir(&dataset, &without_cpg, "", str::to_owned);
    fs::write(dataset.join("localidades.cpg"), "OEM 850\n").expect("write code page");
    let with_cpg = root.join("con-cpg.zip");
    zip_dir(&dataset, &with_cpg, "", str::to_owned);

    assert_eq!(first_name(&with_cpg), AttributeValue::Text("Asunción".to_owned()));
    assert_eq!(first_name(&without_cpg), AttributeValue::Text("Asunci¢n".to_owned()));
}

#[rstest]
#[case("ISO-8859-1")]
#[case("1252")]
fn latin_1_tables_keep_their_accents(#[case] label: &str) {
    let (_guard, root) = workspace();
    let dataset = root.join("src");
    fs::create_dir_all(&dataset).expect("create dataset directory");
    write_legacy_point(&dataset, "localidades", "Ñemby", CP1252);
    fs::write(dataset.join("localidades.cpg"), label).expect("write code page");
    let archive = root.join("localidades.zip");
    zip_dir(&dataset, &archive, "", str::to_owned);

    assert_eq!(first_name(&archive), AttributeValue::Text("Ñemby".to_owned()));
}

#[rstest]
fn loads_polygons_and_attributes() {
    let (_guard, root) = workspace();
    let archive = parcel_archive(&root, "manzanas");
    let layer = ShapefileArchiveSource::new()
        .load("manzanas", &archive)
        .expect("load archive");

    assert_eq!(layer.name(), "manzanas");
    assert_eq!(layer.family(), GeometryFamily::Polygons);
    assert_eq!(layer.crs(), None);
    assert_eq!(layer.len(), 2);
    let first = &layer.features()[0];
    assert!(matches!(first.geometry, Geometry::Polygon(_)));
    assert_eq!(
        first.attributes.get("NOMBRE"),
        Some(&AttributeValue::Text("Centro".to_owned()))
    );
    assert_eq!(first.attributes.get("CODIGO"), Some(&AttributeValue::Integer(100)));
}

#[rstest]
fn reads_the_projection_sidecar_case_insensitively() {
    let (_guard, root) = workspace();
    let dataset = root.join("src");
    fs::create_dir_all(&dataset).expect("create dataset directory");
    write_points(&dataset, "tiendas", &[(373_317.50, 6_170_036.17)]);
    fs::write(dataset.join("tiendas.prj"), UTM_21S_WKT).expect("write projection");
    let archive = root.join("tiendas.zip");
    zip_dir(&dataset, &archive, "", |name| {
        let (stem, ext) = name.rsplit_once('.').expect("dataset files have extensions");
        format!("{stem}.{}", ext.to_ascii_uppercase())
    });

    let layer = ShapefileArchiveSource::new()
        .load("tiendas", &archive)
        .expect("load archive");

    assert_eq!(layer.family(), GeometryFamily::Points);
    assert_eq!(
        layer.crs(),
        Some(&Crs::TransverseMercator {
            zone: 21,
            hemisphere: Hemisphere::South,
            ellipsoid: Ellipsoid::Grs80,
        })
    );
}

#[rstest]
fn archives_without_a_shapefile_are_rejected() {
    let (_guard, root) = workspace();
    let archive = root.join("vacio.zip");
    write_archive_without_shapefile(&archive);

    let err = ShapefileArchiveSource::new()
        .load("vacio", &archive)
        .expect_err("no shapefile");

    match err {
        LoadError::NoShapefile { path } => assert_eq!(path, archive),
        other => panic!("expected NoShapefile, got {other:?}"),
    }
}

#[rstest]
fn missing_archives_fail_to_open() {
    let (_guard, root) = workspace();
    let err = ShapefileArchiveSource::new()
        .load("ausente", &root.join("ausente.zip"))
        .expect_err("missing archive");
    assert!(matches!(err, LoadError::OpenArchive { .. }));
}

#[rstest]
fn non_zip_files_are_unreadable_archives() {
    let (_guard, root) = workspace();
    let archive = root.join("roto.zip");
    fs::write(&archive, b"not a zip archive").expect("write file");
    let err = ShapefileArchiveSource::new()
        .load("roto", &archive)
        .expect_err("corrupt archive");
    assert!(matches!(err, LoadError::ReadArchive { .. }));
}

#[rstest]
fn scratch_directories_are_removed_after_loading() {
    let (_guard, root) = workspace();
    let archive = parcel_archive(&root, "manzanas");
    let scratch = TempDir::new().expect("create scratch root");
    let scratch_root =
        Utf8PathBuf::from_path_buf(scratch.path().to_path_buf()).expect("utf-8 scratch root");

    let source = ShapefileArchiveSource::with_scratch_root(scratch_root.clone());
    source.load("manzanas", &archive).expect("load archive");
    let missing = root.join("vacio.zip");
    write_archive_without_shapefile(&missing);
    source.load("vacio", &missing).expect_err("no shapefile");

    let leftovers = fs::read_dir(&scratch_root).expect("list scratch root").count();
    assert_eq!(leftovers, 0);
}
