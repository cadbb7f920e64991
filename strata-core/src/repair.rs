//! Best-effort validity restoration for polygonal geometry.
//!
//! Invalid polygons are rebuilt with a self-union: the overlay resolves
//! self-intersections and overlapping parts. When the rebuild does not yield
//! a usable geometry the original is kept and a [`RepairWarning`] records why.

use geo::{Area, CoordsIter, MultiPolygon, Polygon, Validation, unary_union};
use thiserror::Error;

use crate::{Geometry, Layer};

/// Reason a repair attempt was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RepairFailure {
    /// The rebuilt geometry has no parts.
    #[error("repair produced an empty geometry")]
    Empty,
    /// The rebuilt geometry is still invalid.
    #[error("repair produced an invalid geometry")]
    StillInvalid,
    /// The rebuilt geometry contains NaN or infinite coordinates.
    #[error("repair produced non-finite coordinates")]
    NonFinite,
}

/// Non-fatal record of a feature whose geometry could not be repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairWarning {
    /// Position of the feature within the layer.
    pub feature_index: usize,
    /// Why the repaired geometry was rejected.
    pub reason: RepairFailure,
}

impl std::fmt::Display for RepairWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feature {}: {}", self.feature_index, self.reason)
    }
}

/// Result of [`repair_layer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    /// Layer with repaired geometries substituted.
    pub layer: Layer,
    /// Features that kept their original, invalid geometry.
    pub warnings: Vec<RepairWarning>,
    /// Number of features whose geometry was replaced.
    pub repaired: usize,
}

/// Repair every invalid polygon or multipolygon in `layer`.
///
/// Points and lines pass through untouched.
///
/// # Examples
/// ```
/// use geo::polygon;
/// use strata_core::{Feature, Geometry, GeometryFamily, Layer, repair_layer};
///
/// # fn main() -> Result<(), strata_core::LayerError> {
/// let bowtie = polygon![
///     (x: 0.0, y: 0.0), (x: 2.0, y: 2.0), (x: 2.0, y: 0.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0),
/// ];
/// let layer = Layer::new(
///     "parcelas",
///     GeometryFamily::Polygons,
///     None,
///     vec![Feature::new(Geometry::Polygon(bowtie))],
/// )?;
/// let outcome = repair_layer(layer);
/// assert_eq!(outcome.repaired, 1);
/// assert!(outcome.warnings.is_empty());
/// # Ok(())
/// # }
/// ```
pub fn repair_layer(layer: Layer) -> RepairOutcome {
    let (header, mut features) = layer.into_parts();
    let mut warnings = Vec::new();
    let mut repaired = 0;
    for (feature_index, feature) in features.iter_mut().enumerate() {
        match repair_geometry(&feature.geometry) {
            Ok(None) => {}
            Ok(Some(geometry)) => {
                feature.geometry = geometry;
                repaired += 1;
            }
            Err(reason) => {
                log::warn!(
                    "layer {}: keeping original geometry of feature {feature_index}: {reason}",
                    header.name
                );
                warnings.push(RepairWarning {
                    feature_index,
                    reason,
                });
            }
        }
    }
    log::debug!(
        "layer {}: repaired {repaired} geometries, {} left as-is",
        header.name,
        warnings.len()
    );
    RepairOutcome {
        layer: Layer::from_parts(header, features),
        warnings,
        repaired,
    }
}

/// Repair a single geometry.
///
/// Returns `Ok(None)` when the geometry needs no repair, `Ok(Some(_))` with
/// the rebuilt geometry, or the reason the rebuild was rejected.
///
/// # Errors
/// Returns a [`RepairFailure`] when the self-union yields an empty, invalid
/// or non-finite result.
pub fn repair_geometry(geometry: &Geometry) -> Result<Option<Geometry>, RepairFailure> {
    let rebuilt = match geometry {
        Geometry::Polygon(polygon) if polygon.is_valid() => return Ok(None),
        Geometry::MultiPolygon(polygons) if polygons.is_valid() => return Ok(None),
        Geometry::Polygon(polygon) => self_union(std::slice::from_ref(polygon)),
        Geometry::MultiPolygon(polygons) => self_union(&polygons.0),
        Geometry::Point(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
            return Ok(None);
        }
    };
    accept(rebuilt).map(Some)
}

fn self_union(polygons: &[Polygon<f64>]) -> MultiPolygon<f64> {
    unary_union(polygons)
}

fn accept(rebuilt: MultiPolygon<f64>) -> Result<Geometry, RepairFailure> {
    if !rebuilt.coords_iter().all(|coord| coord.x.is_finite() && coord.y.is_finite()) {
        return Err(RepairFailure::NonFinite);
    }
    let parts: Vec<Polygon<f64>> = rebuilt
        .into_iter()
        .filter(|part| part.unsigned_area() > 0.0)
        .collect();
    let Some(geometry) = Geometry::from_polygon_parts(parts) else {
        return Err(RepairFailure::Empty);
    };
    let valid = match &geometry {
        Geometry::Polygon(polygon) => polygon.is_valid(),
        Geometry::MultiPolygon(polygons) => polygons.is_valid(),
        Geometry::Point(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => false,
    };
    if valid {
        Ok(geometry)
    } else {
        Err(RepairFailure::StillInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Feature, GeometryFamily};
    use geo::{Point, polygon};
    use rstest::{fixture, rstest};

    #[fixture]
    fn bowtie() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]
    }

    fn polygon_layer(geometries: Vec<Geometry>) -> Layer {
        let features = geometries.into_iter().map(Feature::new).collect();
        Layer::new("test", GeometryFamily::Polygons, None, features).expect("valid layer")
    }

    #[rstest]
    fn valid_polygons_are_left_alone() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        assert_eq!(repair_geometry(&Geometry::Polygon(square)), Ok(None));
    }

    #[rstest]
    fn figure_eight_becomes_valid_and_keeps_area(bowtie: Polygon<f64>) {
        let repaired = repair_geometry(&Geometry::Polygon(bowtie))
            .expect("repair succeeds")
            .expect("bowtie is invalid");
        let Geometry::MultiPolygon(parts) = repaired else {
            panic!("a figure-eight splits into two lobes");
        };
        assert_eq!(parts.0.len(), 2);
        assert!(parts.is_valid());
        assert!((parts.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[rstest]
    fn overlapping_parts_merge_into_one_polygon() {
        let left = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let right = polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 2.0), (x: 1.0, y: 2.0)];
        let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![left, right]));
        let repaired = repair_geometry(&geometry)
            .expect("repair succeeds")
            .expect("overlapping parts are invalid");
        let Geometry::Polygon(polygon) = repaired else {
            panic!("overlapping squares union to a single polygon");
        };
        assert!((polygon.unsigned_area() - 6.0).abs() < 1e-9);
    }

    #[rstest]
    fn collapsed_polygons_keep_their_original_geometry() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 0.0)];
        let layer = polygon_layer(vec![Geometry::Polygon(sliver.clone())]);
        let outcome = repair_layer(layer);
        assert_eq!(
            outcome.warnings,
            vec![RepairWarning {
                feature_index: 0,
                reason: RepairFailure::Empty,
            }]
        );
        assert_eq!(outcome.repaired, 0);
        assert_eq!(outcome.layer.features()[0].geometry, Geometry::Polygon(sliver));
    }

    #[rstest]
    fn layer_repair_counts_replacements(bowtie: Polygon<f64>) {
        let square = polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 6.0)];
        let layer = polygon_layer(vec![Geometry::Polygon(square), Geometry::Polygon(bowtie)]);
        let outcome = repair_layer(layer);
        assert_eq!(outcome.repaired, 1);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.layer.len(), 2);
    }

    #[rstest]
    fn points_pass_through() {
        let point = Geometry::Point(Point::new(1.0, 1.0));
        assert_eq!(repair_geometry(&point), Ok(None));
    }
}
