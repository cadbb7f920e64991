//! Coordinate quantisation.

use geo::Coord;

use crate::Layer;

/// Snap a single value to the nearest multiple of `grid`.
///
/// # Examples
/// ```
/// use strata_core::snap_to_grid;
///
/// assert!((snap_to_grid(-57.123_456_7, 1e-6) + 57.123_457).abs() < 1e-12);
/// ```
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    (value / grid).round() * grid
}

/// Quantise every coordinate of `layer` to `grid` degrees.
///
/// Each output coordinate lies within `grid / 2` of its input and applying
/// the stage twice yields the same layer. The grid must be positive; the
/// profile guarantees it.
pub fn reduce_precision(layer: Layer, grid: f64) -> Layer {
    let (header, mut features) = layer.into_parts();
    for feature in &mut features {
        feature.geometry.map_coords_in_place(|coord| Coord {
            x: snap_to_grid(coord.x, grid),
            y: snap_to_grid(coord.y, grid),
        });
    }
    Layer::from_parts(header, features)
}
