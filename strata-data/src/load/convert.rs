//! Conversion from shapefile records to `strata-core` features.

use geo::{Area, Contains, Coord, LineString, MultiLineString, Point, Polygon};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Shape};
use strata_core::{AttributeValue, Attributes, Geometry};

use super::LoadError;

/// Largest magnitude at which every whole `f64` is exactly an `i64`.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Planar access shared by the 2D, M and Z point types.
trait Planar {
    fn coord(&self) -> Coord<f64>;
}

impl Planar for shapefile::Point {
    fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

impl Planar for shapefile::PointM {
    fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

impl Planar for shapefile::PointZ {
    fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

/// Convert one shape, returning `Ok(None)` for null shapes.
///
/// M and Z values are dropped. A multipoint holding a single point becomes
/// a point; larger multipoints are rejected.
pub(crate) fn shape_to_geometry(index: usize, shape: Shape) -> Result<Option<Geometry>, LoadError> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(point) => point_geometry(&point),
        Shape::PointM(point) => point_geometry(&point),
        Shape::PointZ(point) => point_geometry(&point),
        Shape::Polyline(line) => line_geometry(line.parts()),
        Shape::PolylineM(line) => line_geometry(line.parts()),
        Shape::PolylineZ(line) => line_geometry(line.parts()),
        Shape::Polygon(polygon) => polygon_geometry(polygon.rings()),
        Shape::PolygonM(polygon) => polygon_geometry(polygon.rings()),
        Shape::PolygonZ(polygon) => polygon_geometry(polygon.rings()),
        Shape::Multipoint(points) => single_point(index, points.points())?,
        Shape::MultipointM(points) => single_point(index, points.points())?,
        Shape::MultipointZ(points) => single_point(index, points.points())?,
        Shape::Multipatch(_) => {
            return Err(LoadError::UnsupportedShape {
                index,
                kind: "multipatch",
            });
        }
    };
    Ok(Some(geometry))
}

fn point_geometry<P: Planar>(point: &P) -> Geometry {
    Geometry::Point(Point::from(point.coord()))
}

fn single_point<P: Planar>(index: usize, points: &[P]) -> Result<Geometry, LoadError> {
    match points {
        [point] => Ok(point_geometry(point)),
        _ => Err(LoadError::UnsupportedShape {
            index,
            kind: "multipoint",
        }),
    }
}

fn ring<P: Planar>(points: &[P]) -> LineString<f64> {
    LineString::new(points.iter().map(Planar::coord).collect())
}

fn line_geometry<P: Planar>(parts: &[Vec<P>]) -> Geometry {
    match parts {
        [part] => Geometry::LineString(ring(part)),
        _ => Geometry::MultiLineString(MultiLineString::new(
            parts.iter().map(|part| ring(part)).collect(),
        )),
    }
}

/// Group rings into polygons.
///
/// Every outer ring opens a polygon. Each inner ring becomes a hole of the
/// smallest outer ring that contains one of its vertices, so holes listed
/// after an unrelated outer ring still land in the right part. An inner
/// ring with no containing outer ring becomes a polygon of its own.
fn polygon_geometry<P: Planar>(rings: &[PolygonRing<P>]) -> Geometry {
    let mut shells: Vec<Polygon<f64>> = Vec::new();
    let mut inners = Vec::new();
    for entry in rings {
        match entry {
            PolygonRing::Outer(points) => shells.push(Polygon::new(ring(points), Vec::new())),
            PolygonRing::Inner(points) => inners.push(ring(points)),
        }
    }
    let areas: Vec<f64> = shells.iter().map(Area::unsigned_area).collect();
    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    let mut orphans = Vec::new();
    for hole in inners {
        let owner = shells
            .iter()
            .zip(&areas)
            .enumerate()
            .filter(|(_, (shell, _))| hole.coords().any(|coord| shell.contains(coord)))
            .min_by(|(_, (_, left)), (_, (_, right))| left.total_cmp(right))
            .map(|(index, _)| index);
        match owner.and_then(|index| holes.get_mut(index)) {
            Some(owned) => owned.push(hole),
            None => orphans.push(Polygon::new(hole, Vec::new())),
        }
    }
    let parts: Vec<Polygon<f64>> = shells
        .into_iter()
        .zip(holes)
        .map(|(shell, holes)| Polygon::new(shell.into_inner().0, holes))
        .chain(orphans)
        .collect();
    Geometry::from_polygon_parts(parts)
        .unwrap_or_else(|| Geometry::MultiPolygon(geo::MultiPolygon::new(Vec::new())))
}

/// Convert a dBase record into sorted attributes.
///
/// Numeric fields holding whole numbers become integers, dates become
/// ISO 8601 text and empty fields become null.
pub(crate) fn record_to_attributes(record: Record) -> Attributes {
    record
        .into_iter()
        .map(|(name, value)| (name.trim().to_owned(), field_to_attribute(value)))
        .collect()
}

fn field_to_attribute(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(text)) => AttributeValue::Text(text.trim_end().to_owned()),
        FieldValue::Memo(text) => AttributeValue::Text(text),
        FieldValue::Numeric(Some(number)) => number_attribute(number),
        FieldValue::Float(Some(number)) => AttributeValue::Float(f64::from(number)),
        FieldValue::Double(number) | FieldValue::Currency(number) => AttributeValue::Float(number),
        FieldValue::Integer(number) => AttributeValue::Integer(i64::from(number)),
        FieldValue::Logical(Some(flag)) => AttributeValue::Boolean(flag),
        FieldValue::Date(Some(date)) => AttributeValue::Text(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        _ => AttributeValue::Null,
    }
}

fn number_attribute(number: f64) -> AttributeValue {
    if number.fract() == 0.0 && number.abs() < EXACT_INTEGER_LIMIT {
        // Whole and within the exactly representable range.
        AttributeValue::Integer(number as i64)
    } else {
        AttributeValue::Float(number)
    }
}
