//! GeoJSON serialisation of processed layers.

use geo::{Coord, LineString, Polygon};
use geojson::{FeatureCollection, JsonObject, JsonValue, Value};
use strata_core::{AttributeValue, Attributes, Feature, Geometry, Layer};

use super::WriteError;

/// Serialise `layer` as a GeoJSON `FeatureCollection`.
///
/// Coordinates are written with `f64` round-trip precision and the layer
/// name is recorded in a top-level `name` member. Non-finite float
/// attributes become `null`.
///
/// # Examples
/// ```
/// use geo::Point;
/// use strata_core::{Feature, Geometry, GeometryFamily, Layer};
/// use strata_data::encode_geojson;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let layer = Layer::new(
///     "tiendas",
///     GeometryFamily::Points,
///     None,
///     vec![Feature::new(Geometry::Point(Point::new(-57.6, -25.3))).with_attribute("NOMBRE", "Centro")],
/// )?;
/// let bytes = encode_geojson(&layer)?;
/// let text = String::from_utf8(bytes)?;
/// assert!(text.contains("\"NOMBRE\":\"Centro\""));
/// # Ok(())
/// # }
/// ```
pub fn encode_geojson(layer: &Layer) -> Result<Vec<u8>, WriteError> {
    let mut foreign_members = JsonObject::new();
    foreign_members.insert("name".to_owned(), JsonValue::from(layer.name()));
    let collection = FeatureCollection {
        bbox: None,
        features: layer.features().iter().map(to_geojson_feature).collect(),
        foreign_members: Some(foreign_members),
    };
    serde_json::to_vec(&collection).map_err(|source| WriteError::Serialise {
        source,
        layer: layer.name().to_owned(),
    })
}

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(to_geojson_value(&feature.geometry))),
        id: None,
        properties: Some(to_properties(&feature.attributes)),
        foreign_members: None,
    }
}

fn position(coord: Coord<f64>) -> Vec<f64> {
    vec![coord.x, coord.y]
}

fn line(line: &LineString<f64>) -> Vec<Vec<f64>> {
    line.coords().copied().map(position).collect()
}

fn rings(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line)
        .collect()
}

fn to_geojson_value(geometry: &Geometry) -> Value {
    match geometry {
        Geometry::Point(point) => Value::Point(position(point.0)),
        Geometry::LineString(linestring) => Value::LineString(line(linestring)),
        Geometry::MultiLineString(lines) => Value::MultiLineString(lines.iter().map(line).collect()),
        Geometry::Polygon(polygon) => Value::Polygon(rings(polygon)),
        Geometry::MultiPolygon(polygons) => {
            Value::MultiPolygon(polygons.iter().map(rings).collect())
        }
    }
}

fn to_properties(attributes: &Attributes) -> JsonObject {
    attributes
        .iter()
        .map(|(key, value)| (key.clone(), to_json(value)))
        .collect()
}

fn to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Boolean(flag) => JsonValue::Bool(*flag),
        AttributeValue::Integer(number) => JsonValue::from(*number),
        AttributeValue::Float(number) => {
            serde_json::Number::from_f64(*number).map_or(JsonValue::Null, JsonValue::Number)
        }
        AttributeValue::Text(text) => JsonValue::String(text.clone()),
    }
}
