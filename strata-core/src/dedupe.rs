//! Grid-cell deduplication of point layers.

use std::collections::HashSet;

use crate::{Feature, Geometry, Layer};

/// Grid cell key for a point, `(round(lat / grid), round(lon / grid))`.
///
/// Returns `None` when the cell index does not fit in an `i64`.
///
/// # Examples
/// ```
/// use geo::Point;
/// use strata_core::grid_key;
///
/// assert_eq!(grid_key(Point::new(-57.63, -25.26), 0.01), Some((-2526, -5763)));
/// ```
pub fn grid_key(point: geo::Point<f64>, grid: f64) -> Option<(i64, i64)> {
    Some((cell(point.y(), grid)?, cell(point.x(), grid)?))
}

// i64::MAX is not exactly representable as f64; stay strictly inside it.
const CELL_LIMIT: f64 = 9.2e18;

fn cell(value: f64, grid: f64) -> Option<i64> {
    let index = (value / grid).round();
    (index.is_finite() && index.abs() < CELL_LIMIT).then_some(index as i64)
}

/// Result of [`dedupe_points`].
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeOutcome {
    /// Layer holding the first point of every grid cell.
    pub layer: Layer,
    /// Points removed as duplicates.
    pub removed: usize,
}

/// Keep the first point of every `grid`-sized cell, in layer order.
///
/// Non-point features and points whose cell index overflows are kept
/// unconditionally.
pub fn dedupe_points(layer: Layer, grid: f64) -> DedupeOutcome {
    let (header, features) = layer.into_parts();
    let before = features.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<Feature> = features
        .into_iter()
        .filter(|feature| match &feature.geometry {
            Geometry::Point(point) => grid_key(*point, grid).is_none_or(|key| seen.insert(key)),
            _ => true,
        })
        .collect();
    let removed = before - kept.len();
    log::debug!(
        "layer {}: removed {removed} duplicate points on a {grid} grid",
        header.name
    );
    DedupeOutcome {
        layer: Layer::from_parts(header, kept),
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeometryFamily;
    use geo::Point;
    use rstest::{fixture, rstest};

    fn point_layer(points: &[(f64, f64)]) -> Layer {
        let features = points
            .iter()
            .enumerate()
            .map(|(id, &(x, y))| {
                Feature::new(Geometry::Point(Point::new(x, y))).with_attribute("ID", id as i64)
            })
            .collect();
        Layer::new("tiendas", GeometryFamily::Points, None, features).expect("valid layer")
    }

    #[fixture]
    fn near_pair() -> Layer {
        point_layer(&[(-57.600_000, -25.300_000), (-57.600_001, -25.300_001)])
    }

    #[rstest]
    #[case(1e-4, 1)]
    #[case(1e-8, 2)]
    fn grid_size_decides_whether_near_points_merge(
        near_pair: Layer,
        #[case] grid: f64,
        #[case] expected: usize,
    ) {
        let outcome = dedupe_points(near_pair, grid);
        assert_eq!(outcome.layer.len(), expected);
        assert_eq!(outcome.removed, 2 - expected);
    }

    #[test]
    fn first_point_of_each_cell_wins() {
        let layer = point_layer(&[(0.0, 0.0), (5.0, 5.0), (0.000_01, 0.0), (5.0, 5.000_01)]);
        let outcome = dedupe_points(layer, 1e-3);
        let ids: Vec<_> = outcome
            .layer
            .features()
            .iter()
            .map(|feature| feature.attributes["ID"].clone())
            .collect();
        assert_eq!(ids, vec![0_i64.into(), 1_i64.into()]);
    }

    #[test]
    fn overflowing_cells_are_kept() {
        let layer = point_layer(&[(1e300, 0.0), (1e300, 0.0)]);
        assert_eq!(dedupe_points(layer, 1e-5).layer.len(), 2);
    }
}
