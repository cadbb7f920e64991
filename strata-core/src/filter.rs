//! Removal of negligible holes and polygon parts.
//!
//! Areas are planar and measured in the layer's units, which are degrees²
//! once the layer has been reprojected.

use geo::{Area, LineString, Polygon};

use crate::{Feature, Geometry, Layer};

/// Area thresholds applied by [`filter_small_features`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AreaThresholds {
    /// Holes with a smaller area are removed.
    pub hole_area_min: f64,
    /// Polygon parts with a smaller area are removed.
    pub part_area_min: f64,
}

impl AreaThresholds {
    /// Whether either threshold can remove anything.
    pub fn is_active(self) -> bool {
        self.hole_area_min > 0.0 || self.part_area_min > 0.0
    }
}

/// Result of [`filter_small_features`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Layer without the removed holes, parts and features.
    pub layer: Layer,
    /// Features dropped because none of their parts survived.
    pub dropped_features: usize,
    /// Holes removed across all features.
    pub dropped_holes: usize,
    /// Polygon parts removed across all features.
    pub dropped_parts: usize,
}

/// Remove holes and parts smaller than `thresholds` from polygon features.
///
/// Non-polygonal features and inactive thresholds leave the layer unchanged.
/// A feature whose every part is removed is dropped from the layer.
///
/// # Examples
/// ```
/// use geo::polygon;
/// use strata_core::{AreaThresholds, Feature, Geometry, GeometryFamily, Layer, filter_small_features};
///
/// # fn main() -> Result<(), strata_core::LayerError> {
/// let speck = polygon![(x: 0.0, y: 0.0), (x: 1e-6, y: 0.0), (x: 1e-6, y: 1e-6), (x: 0.0, y: 1e-6)];
/// let layer = Layer::new("islas", GeometryFamily::Polygons, None, vec![Feature::new(Geometry::Polygon(speck))])?;
/// let thresholds = AreaThresholds { hole_area_min: 0.0, part_area_min: 1e-9 };
/// let outcome = filter_small_features(layer, thresholds);
/// assert!(outcome.layer.is_empty());
/// assert_eq!(outcome.dropped_features, 1);
/// # Ok(())
/// # }
/// ```
pub fn filter_small_features(layer: Layer, thresholds: AreaThresholds) -> FilterOutcome {
    let mut outcome = FilterOutcome {
        layer,
        dropped_features: 0,
        dropped_holes: 0,
        dropped_parts: 0,
    };
    if !thresholds.is_active() {
        return outcome;
    }
    let (header, features) = outcome.layer.into_parts();
    let mut kept = Vec::with_capacity(features.len());
    for (index, feature) in features.into_iter().enumerate() {
        let Feature {
            geometry,
            attributes,
        } = feature;
        let parts = match geometry {
            Geometry::Polygon(polygon) => vec![polygon],
            Geometry::MultiPolygon(polygons) => polygons.0,
            other => {
                kept.push(Feature::with_attributes(other, attributes));
                continue;
            }
        };
        let mut surviving = Vec::with_capacity(parts.len());
        for part in parts {
            let (part, holes_removed) = drop_small_holes(part, thresholds.hole_area_min);
            outcome.dropped_holes += holes_removed;
            if part.unsigned_area() < thresholds.part_area_min {
                outcome.dropped_parts += 1;
            } else {
                surviving.push(part);
            }
        }
        match Geometry::from_polygon_parts(surviving) {
            Some(geometry) => kept.push(Feature::with_attributes(geometry, attributes)),
            None => {
                log::debug!(
                    "layer {}: dropping feature {index}, every part is below the area threshold",
                    header.name
                );
                outcome.dropped_features += 1;
            }
        }
    }
    outcome.layer = Layer::from_parts(header, kept);
    outcome
}

/// Rebuild `polygon` without holes smaller than `hole_area_min`.
fn drop_small_holes(polygon: Polygon<f64>, hole_area_min: f64) -> (Polygon<f64>, usize) {
    if hole_area_min <= 0.0 || polygon.interiors().is_empty() {
        return (polygon, 0);
    }
    let (exterior, interiors) = polygon.into_inner();
    let before = interiors.len();
    let interiors: Vec<LineString<f64>> = interiors
        .into_iter()
        .filter(|ring| ring_area(ring) >= hole_area_min)
        .collect();
    let removed = before - interiors.len();
    (Polygon::new(exterior, interiors), removed)
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    Polygon::new(ring.clone(), Vec::new()).unsigned_area()
}
