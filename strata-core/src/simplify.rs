//! Topology-preserving Ramer-Douglas-Peucker simplification.
//!
//! Every candidate ring must be closed, have at least four coordinates,
//! enclose a non-zero area and stay simple. A candidate polygon must also
//! stay valid when its input was valid. Rejected candidates are retried at
//! half the tolerance; after [`MAX_ATTEMPTS`] tries the original is kept.

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon, Validation};

use crate::topology::{line_is_simple, ring_is_simple};
use crate::{Geometry, Layer};

/// Number of tolerances tried before a geometry is left unsimplified.
pub const MAX_ATTEMPTS: u32 = 6;

/// Result of [`simplify_layer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyOutcome {
    /// Layer with simplified geometries.
    pub layer: Layer,
    /// Coordinates before simplification.
    pub coords_before: usize,
    /// Coordinates after simplification.
    pub coords_after: usize,
    /// Features whose every candidate was rejected.
    pub kept_original: usize,
}

/// Simplify every polygon and line in `layer` with `tolerance` degrees.
///
/// A tolerance of zero returns the layer unchanged. Points pass through.
///
/// # Examples
/// ```
/// use geo::polygon;
/// use strata_core::{Feature, Geometry, GeometryFamily, Layer, simplify_layer};
///
/// # fn main() -> Result<(), strata_core::LayerError> {
/// let square = polygon![
///     (x: 0.0, y: 0.0), (x: 0.5, y: 0.000_01), (x: 1.0, y: 0.0),
///     (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
/// ];
/// let layer = Layer::new("lotes", GeometryFamily::Polygons, None, vec![Feature::new(Geometry::Polygon(square))])?;
/// let outcome = simplify_layer(layer, 0.001);
/// assert_eq!(outcome.coords_before, 6);
/// assert_eq!(outcome.coords_after, 5);
/// # Ok(())
/// # }
/// ```
pub fn simplify_layer(layer: Layer, tolerance: f64) -> SimplifyOutcome {
    let coords_before = layer
        .features()
        .iter()
        .map(|feature| feature.geometry.coord_count())
        .sum();
    if tolerance <= 0.0 {
        return SimplifyOutcome {
            layer,
            coords_before,
            coords_after: coords_before,
            kept_original: 0,
        };
    }
    let (header, mut features) = layer.into_parts();
    let mut kept_original = 0;
    for feature in &mut features {
        match simplify_geometry(&feature.geometry, tolerance) {
            Some(geometry) => feature.geometry = geometry,
            None => kept_original += 1,
        }
    }
    let coords_after = features
        .iter()
        .map(|feature| feature.geometry.coord_count())
        .sum();
    log::debug!(
        "layer {}: simplified {coords_before} coordinates to {coords_after} at tolerance {tolerance}",
        header.name
    );
    SimplifyOutcome {
        layer: Layer::from_parts(header, features),
        coords_before,
        coords_after,
        kept_original,
    }
}

/// Simplify one geometry.
///
/// Returns `None` when no acceptable candidate was found within
/// [`MAX_ATTEMPTS`]; the caller keeps the original. Points are returned
/// unchanged.
pub fn simplify_geometry(geometry: &Geometry, tolerance: f64) -> Option<Geometry> {
    match geometry {
        Geometry::Point(point) => Some(Geometry::Point(*point)),
        Geometry::LineString(line) => {
            let must_stay_simple = line_is_simple(line);
            with_retries(
                tolerance,
                |t| simplify_line(line, t),
                |candidate| !must_stay_simple || line_is_simple(candidate),
            )
            .map(Geometry::LineString)
        }
        Geometry::MultiLineString(lines) => {
            let must_stay_simple: Vec<bool> = lines.iter().map(line_is_simple).collect();
            with_retries(
                tolerance,
                |t| MultiLineString::new(lines.iter().map(|line| simplify_line(line, t)).collect()),
                |candidate| {
                    candidate
                        .iter()
                        .zip(&must_stay_simple)
                        .all(|(line, &must)| !must || line_is_simple(line))
                },
            )
            .map(Geometry::MultiLineString)
        }
        Geometry::Polygon(polygon) => {
            let must_stay_valid = polygon.is_valid();
            with_retries(
                tolerance,
                |t| simplify_rings(polygon, t),
                |candidate| !must_stay_valid || candidate.is_valid(),
            )
            .map(Geometry::Polygon)
        }
        Geometry::MultiPolygon(polygons) => {
            let must_stay_valid = polygons.is_valid();
            with_retries(
                tolerance,
                |t| MultiPolygon::new(polygons.iter().map(|part| simplify_rings(part, t)).collect()),
                |candidate| !must_stay_valid || candidate.is_valid(),
            )
            .map(Geometry::MultiPolygon)
        }
    }
}

/// Try `attempt` at `tolerance`, halving it until `accept` passes.
fn with_retries<T>(
    tolerance: f64,
    attempt: impl Fn(f64) -> T,
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    let mut current = tolerance;
    for _ in 0..MAX_ATTEMPTS {
        let candidate = attempt(current);
        if accept(&candidate) {
            return Some(candidate);
        }
        current /= 2.0;
    }
    None
}

fn simplify_rings(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    Polygon::new(
        simplify_ring(polygon.exterior(), tolerance),
        polygon
            .interiors()
            .iter()
            .map(|ring| simplify_ring(ring, tolerance))
            .collect(),
    )
}

/// Simplify one ring, falling back to the input ring when no candidate is
/// acceptable.
fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    with_retries(
        tolerance,
        |t| LineString::new(douglas_peucker(&ring.0, t)),
        ring_is_acceptable,
    )
    .unwrap_or_else(|| ring.clone())
}

fn simplify_line(line: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    LineString::new(douglas_peucker(&line.0, tolerance))
}

/// Whether a simplified ring can stand in for its input.
pub fn ring_is_acceptable(ring: &LineString<f64>) -> bool {
    ring.is_closed() && ring.0.len() >= 4 && signed_ring_area(ring) != 0.0 && ring_is_simple(ring)
}

fn signed_ring_area(ring: &LineString<f64>) -> f64 {
    ring.lines().map(|segment| segment.determinant()).sum::<f64>() / 2.0
}

/// Ramer-Douglas-Peucker over a coordinate slice.
///
/// The first and last coordinates are always kept, so closed input stays
/// closed. Vertices farther than `tolerance` from the current baseline
/// split it; ties keep the earliest vertex.
pub fn douglas_peucker(coords: &[Coord<f64>], tolerance: f64) -> Vec<Coord<f64>> {
    let Some(last) = coords.len().checked_sub(1) else {
        return Vec::new();
    };
    if last < 2 {
        return coords.to_vec();
    }
    let mut keep = vec![false; coords.len()];
    if let Some(first) = keep.first_mut() {
        *first = true;
    }
    if let Some(end) = keep.last_mut() {
        *end = true;
    }
    let mut pending = vec![(0, last)];
    while let Some((start, end)) = pending.pop() {
        if end <= start + 1 {
            continue;
        }
        let Some((index, distance)) = farthest_vertex(coords, start, end) else {
            continue;
        };
        if distance > tolerance {
            if let Some(flag) = keep.get_mut(index) {
                *flag = true;
            }
            pending.push((start, index));
            pending.push((index, end));
        }
    }
    coords
        .iter()
        .zip(keep)
        .filter_map(|(coord, kept)| kept.then_some(*coord))
        .collect()
}

fn farthest_vertex(coords: &[Coord<f64>], start: usize, end: usize) -> Option<(usize, f64)> {
    let (&from, &to) = (coords.get(start)?, coords.get(end)?);
    coords
        .get(start + 1..end)?
        .iter()
        .enumerate()
        .map(|(offset, &coord)| (start + 1 + offset, segment_distance(coord, from, to)))
        .fold(None, |best: Option<(usize, f64)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        })
}

fn segment_distance(point: Coord<f64>, from: Coord<f64>, to: Coord<f64>) -> f64 {
    let delta = to - from;
    let length_squared = delta.x * delta.x + delta.y * delta.y;
    if length_squared == 0.0 {
        let offset = point - from;
        return offset.x.hypot(offset.y);
    }
    let offset = point - from;
    let t = ((offset.x * delta.x + offset.y * delta.y) / length_squared).clamp(0.0, 1.0);
    let nearest = from + delta * t;
    let gap = point - nearest;
    gap.x.hypot(gap.y)
}
