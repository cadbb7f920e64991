//! Geometry builders shared by unit, property and behaviour tests.
//!
//! Enabled by the `test-support` feature so downstream crates can build the
//! same fixtures.

use geo::{Coord, LineString, Point, Polygon};

use crate::{Feature, Geometry, GeometryFamily, Layer};

/// Closed, counter-clockwise square ring.
pub fn square_ring(min_x: f64, min_y: f64, size: f64) -> LineString<f64> {
    LineString::from(vec![
        (min_x, min_y),
        (min_x + size, min_y),
        (min_x + size, min_y + size),
        (min_x, min_y + size),
        (min_x, min_y),
    ])
}

/// Square polygon without holes.
pub fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
    Polygon::new(square_ring(min_x, min_y, size), Vec::new())
}

/// Self-intersecting figure-eight with two unit-area lobes.
pub fn figure_eight() -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (0.0, 0.0),
            (2.0, 2.0),
            (2.0, 0.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]),
        Vec::new(),
    )
}

/// Rectangle whose edges are densified into `vertices` points with a
/// deterministic wobble of at most `amplitude` degrees.
///
/// At any tolerance comfortably above `amplitude` the ring simplifies back
/// to its four corners.
pub fn near_collinear_rectangle(
    vertices: usize,
    width: f64,
    height: f64,
    amplitude: f64,
) -> Polygon<f64> {
    let per_edge = (vertices / 4).max(1);
    let corners = [
        Coord { x: 0.0, y: 0.0 },
        Coord { x: width, y: 0.0 },
        Coord { x: width, y: height },
        Coord { x: 0.0, y: height },
    ];
    let mut coords = Vec::with_capacity(per_edge * 4 + 1);
    for (edge, &start) in corners.iter().enumerate() {
        let end = corners[(edge + 1) % corners.len()];
        let delta = end - start;
        let length = delta.x.hypot(delta.y);
        let normal = Coord {
            x: -delta.y / length,
            y: delta.x / length,
        };
        for step in 0..per_edge {
            let t = step as f64 / per_edge as f64;
            let wobble = if step == 0 {
                0.0
            } else {
                amplitude * (step as f64 * 1.7).sin()
            };
            coords.push(start + delta * t + normal * wobble);
        }
    }
    coords.push(corners[0]);
    Polygon::new(LineString::new(coords), Vec::new())
}

/// Star-shaped polygon around `centre` with one vertex per radius.
///
/// Vertices are spaced evenly by angle, so any positive radii produce a
/// simple ring.
pub fn star_polygon(centre: Coord<f64>, radii: &[f64]) -> Polygon<f64> {
    let step = std::f64::consts::TAU / radii.len() as f64;
    let mut coords: Vec<Coord<f64>> = radii
        .iter()
        .enumerate()
        .map(|(index, radius)| {
            let (sin, cos) = (step * index as f64).sin_cos();
            Coord {
                x: centre.x + radius * cos,
                y: centre.y + radius * sin,
            }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    Polygon::new(LineString::new(coords), Vec::new())
}

/// Point layer named `name` with an `ID` attribute holding each index.
pub fn point_layer(name: &str, points: &[(f64, f64)]) -> Layer {
    let features = points
        .iter()
        .zip(0_i64..)
        .map(|(&(x, y), id)| Feature::new(Geometry::Point(Point::new(x, y))).with_attribute("ID", id))
        .collect();
    layer_or_panic(name, GeometryFamily::Points, features)
}

/// Polygon layer named `name`, one feature per polygon.
pub fn polygon_layer(name: &str, polygons: Vec<Polygon<f64>>) -> Layer {
    let features = polygons
        .into_iter()
        .map(|polygon| Feature::new(Geometry::Polygon(polygon)))
        .collect();
    layer_or_panic(name, GeometryFamily::Polygons, features)
}

fn layer_or_panic(name: &str, family: GeometryFamily, features: Vec<Feature>) -> Layer {
    match Layer::new(name, family, None, features) {
        Ok(layer) => layer,
        Err(err) => panic!("test layer {name} is invalid: {err}"),
    }
}
