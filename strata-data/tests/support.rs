//! Archive builders shared by the integration tests.

use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// WKT of the SIRGAS 2000 / UTM zone 21S projection.
pub const UTM_21S_WKT: &str = r#"PROJCS["SIRGAS 2000 / UTM zone 21S",GEOGCS["SIRGAS 2000",DATUM["Sistema_de_Referencia_Geocentrico_para_las_AmericaS_2000",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",-57],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],PARAMETER["false_northing",10000000],UNIT["metre",1],AUTHORITY["EPSG","31981"]]"#;

/// Temporary directory with a UTF-8 path.
pub fn workspace() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    (dir, root)
}

fn field(name: &str) -> FieldName {
    FieldName::try_from(name).unwrap_or_else(|err| panic!("invalid field name {name}: {err:?}"))
}

fn table() -> TableWriterBuilder {
    columns(TableWriterBuilder::new())
}

fn columns(builder: TableWriterBuilder) -> TableWriterBuilder {
    builder
        .add_character_field(field("NOMBRE"), 32)
        .add_numeric_field(field("CODIGO"), 10, 0)
}

fn record(name: &str, code: f64) -> Record {
    let mut record = Record::default();
    record.insert("NOMBRE".to_owned(), FieldValue::Character(Some(name.to_owned())));
    record.insert("CODIGO".to_owned(), FieldValue::Numeric(Some(code)));
    record
}

fn square(min_x: f64, min_y: f64, size: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(vec![
        Point::new(min_x, min_y),
        Point::new(min_x, min_y + size),
        Point::new(min_x + size, min_y + size),
        Point::new(min_x + size, min_y),
        Point::new(min_x, min_y),
    ]))
}

/// Write `<stem>.shp/.shx/.dbf` holding two square parcels.
pub fn write_parcels(dir: &Utf8Path, stem: &str) {
    let mut writer = shapefile::Writer::from_path(dir.join(format!("{stem}.shp")), table())
        .expect("create shapefile writer");
    for (index, name) in ["Centro", "Norte"].into_iter().enumerate() {
        let offset = index as f64 * 0.01;
        writer
            .write_shape_and_record(&square(-57.64 + offset, -25.29, 0.005), &record(name, 100.0 + index as f64))
            .expect("write parcel");
    }
}

/// Write `<stem>.shp/.shx/.dbf` holding points given in the layer's units.
pub fn write_points(dir: &Utf8Path, stem: &str, points: &[(f64, f64)]) {
    let mut writer = shapefile::Writer::from_path(dir.join(format!("{stem}.shp")), table())
        .expect("create shapefile writer");
    for (index, &(x, y)) in points.iter().enumerate() {
        writer
            .write_shape_and_record(&Point::new(x, y), &record("Tienda", index as f64))
            .expect("write point");
    }
}

/// Offset of the language driver byte in a dBase header.
const LANGUAGE_DRIVER_OFFSET: usize = 29;

/// Write one point named `name` with its text in `encoding`.
///
/// The dBase header's language driver is cleared afterwards, as legacy
/// tools leave it, so only a `.cpg` sidecar can tell readers the encoding.
pub fn write_legacy_point(
    dir: &Utf8Path,
    stem: &str,
    name: &str,
    encoding: impl dbase::Encoding + 'static,
) {
    {
        let builder = columns(TableWriterBuilder::with_encoding(encoding));
        let mut writer = shapefile::Writer::from_path(dir.join(format!("{stem}.shp")), builder)
            .expect("create shapefile writer");
        writer
            .write_shape_and_record(&Point::new(-57.5, -25.4), &record(name, 1.0))
            .expect("write point");
    }
    let dbf = dir.join(format!("{stem}.dbf"));
    let mut bytes = fs::read(&dbf).expect("read dBase table");
    bytes[LANGUAGE_DRIVER_OFFSET] = 0;
    fs::write(&dbf, bytes).expect("rewrite dBase table");
}

/// Zip every file of `dir` into `archive`, naming entries `prefix` + name.
///
/// `rename` may rewrite each entry name, for example to upper-case the
/// extensions.
pub fn zip_dir(dir: &Utf8Path, archive: &Utf8Path, prefix: &str, rename: impl Fn(&str) -> String) {
    let file = fs::File::create(archive).expect("create archive");
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("list dataset directory")
        .map(|entry| entry.expect("read entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    for name in names {
        let bytes = fs::read(dir.join(&name)).expect("read dataset file");
        zip.start_file(format!("{prefix}{}", rename(&name)), options)
            .expect("start zip entry");
        zip.write_all(&bytes).expect("write zip entry");
    }
    zip.finish().expect("finish archive");
}

/// Zip holding a README and no shapefile.
pub fn write_archive_without_shapefile(archive: &Utf8Path) {
    let file = fs::File::create(archive).expect("create archive");
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("LEEME.txt", SimpleFileOptions::default())
        .expect("start zip entry");
    zip.write_all(b"sin datos").expect("write zip entry");
    zip.finish().expect("finish archive");
}

/// Build `<root>/<stem>.zip` with two WGS84 parcels under `capas/`.
pub fn parcel_archive(root: &Utf8Path, stem: &str) -> Utf8PathBuf {
    let dataset = root.join(format!("{stem}-src"));
    fs::create_dir_all(&dataset).expect("create dataset directory");
    write_parcels(&dataset, stem);
    let archive = root.join(format!("{stem}.zip"));
    zip_dir(&dataset, &archive, "capas/", str::to_owned);
    archive
}
