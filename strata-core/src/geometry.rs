//! Geometry primitives and attributed features.
//!
//! Coordinates use `geo` types with `x = longitude` and `y = latitude` once a
//! layer has been reprojected. Before reprojection they carry whatever units
//! the source CRS uses (metres for projected systems).

use std::collections::BTreeMap;

use geo::{Coord, LineString, MapCoordsInPlace, MultiLineString, MultiPolygon, Point, Polygon};

/// Attribute mapping attached to every feature.
///
/// Keys are sorted so serialised output is deterministic.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Scalar attribute value read from a dBase table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttributeValue {
    /// Missing value.
    Null,
    /// Logical field.
    Boolean(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Character data.
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Broad geometry family shared by every feature of a layer.
///
/// # Examples
/// ```
/// use strata_core::GeometryFamily;
///
/// assert_eq!(GeometryFamily::Polygons.as_str(), "polygons");
/// assert_eq!("points".parse::<GeometryFamily>(), Ok(GeometryFamily::Points));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GeometryFamily {
    /// Point features.
    Points,
    /// Line and multi-line features.
    Lines,
    /// Polygon and multi-polygon features.
    Polygons,
}

impl GeometryFamily {
    /// Return the family as a lowercase `&str`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::Polygons => "polygons",
        }
    }
}

impl std::fmt::Display for GeometryFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GeometryFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "points" | "point" => Ok(Self::Points),
            "lines" | "line" => Ok(Self::Lines),
            "polygons" | "polygon" => Ok(Self::Polygons),
            _ => Err(format!("unknown geometry family '{s}'")),
        }
    }
}

/// Closed set of geometries a layer may carry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Geometry {
    /// A single position.
    Point(Point<f64>),
    /// An open or closed polyline.
    LineString(LineString<f64>),
    /// Several polylines.
    MultiLineString(MultiLineString<f64>),
    /// Exterior ring plus holes.
    Polygon(Polygon<f64>),
    /// Several polygons.
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    /// Family this geometry belongs to.
    ///
    /// # Examples
    /// ```
    /// use geo::Point;
    /// use strata_core::{Geometry, GeometryFamily};
    ///
    /// let geometry = Geometry::Point(Point::new(-57.6, -25.3));
    /// assert_eq!(geometry.family(), GeometryFamily::Points);
    /// ```
    pub const fn family(&self) -> GeometryFamily {
        match self {
            Self::Point(_) => GeometryFamily::Points,
            Self::LineString(_) | Self::MultiLineString(_) => GeometryFamily::Lines,
            Self::Polygon(_) | Self::MultiPolygon(_) => GeometryFamily::Polygons,
        }
    }

    /// Human readable name of the variant, used in diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Apply `func` to every coordinate in place.
    pub fn map_coords_in_place(&mut self, func: impl Fn(Coord<f64>) -> Coord<f64> + Copy) {
        match self {
            Self::Point(point) => point.map_coords_in_place(func),
            Self::LineString(line) => line.map_coords_in_place(func),
            Self::MultiLineString(lines) => lines.map_coords_in_place(func),
            Self::Polygon(polygon) => polygon.map_coords_in_place(func),
            Self::MultiPolygon(polygons) => polygons.map_coords_in_place(func),
        }
    }

    /// Apply a fallible `func` to every coordinate in place.
    ///
    /// On error the geometry may be partially transformed; callers discard it.
    pub fn try_map_coords_in_place<E>(
        &mut self,
        func: impl Fn(Coord<f64>) -> Result<Coord<f64>, E> + Copy,
    ) -> Result<(), E> {
        match self {
            Self::Point(point) => point.try_map_coords_in_place(func),
            Self::LineString(line) => line.try_map_coords_in_place(func),
            Self::MultiLineString(lines) => lines.try_map_coords_in_place(func),
            Self::Polygon(polygon) => polygon.try_map_coords_in_place(func),
            Self::MultiPolygon(polygons) => polygons.try_map_coords_in_place(func),
        }
    }

    /// Number of coordinates stored in the geometry.
    pub fn coord_count(&self) -> usize {
        match self {
            Self::Point(_) => 1,
            Self::LineString(line) => line.0.len(),
            Self::MultiLineString(lines) => lines.iter().map(|line| line.0.len()).sum(),
            Self::Polygon(polygon) => polygon_coord_count(polygon),
            Self::MultiPolygon(polygons) => polygons.iter().map(polygon_coord_count).sum(),
        }
    }

    /// Wrap polygon parts, collapsing a single part into a plain polygon.
    ///
    /// Returns `None` when `parts` is empty.
    pub fn from_polygon_parts(mut parts: Vec<Polygon<f64>>) -> Option<Self> {
        match parts.len() {
            0 => None,
            1 => parts.pop().map(Self::Polygon),
            _ => Some(Self::MultiPolygon(MultiPolygon::new(parts))),
        }
    }
}

fn polygon_coord_count(polygon: &Polygon<f64>) -> usize {
    polygon.exterior().0.len()
        + polygon
            .interiors()
            .iter()
            .map(|ring| ring.0.len())
            .sum::<usize>()
}

/// A geometry with its attribute table row.
///
/// # Examples
/// ```
/// use geo::Point;
/// use strata_core::{AttributeValue, Feature, Geometry};
///
/// let feature = Feature::new(Geometry::Point(Point::new(-57.6, -25.3)))
///     .with_attribute("NOMBRE", "Asunción");
/// assert_eq!(
///     feature.attributes.get("NOMBRE"),
///     Some(&AttributeValue::Text("Asunción".into()))
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature {
    /// Feature geometry.
    pub geometry: Geometry,
    /// Attribute values keyed by column name.
    pub attributes: Attributes,
}

impl Feature {
    /// Construct a feature without attributes.
    pub const fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            attributes: Attributes::new(),
        }
    }

    /// Construct a feature with the given attributes.
    pub const fn with_attributes(geometry: Geometry, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    /// Insert an attribute while returning `self` for chaining.
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
