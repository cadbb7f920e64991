//! Behavioural coverage for the geometry normalisation stages.

use std::cell::{Cell, RefCell};

use geo::{Area, Validation};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use strata_core::test_support::{
    figure_eight, near_collinear_rectangle, point_layer, polygon_layer, square, square_ring,
};
use strata_core::{
    AreaThresholds, AttributeValue, Geometry, Layer, RepairWarning, dedupe_points, filter_small_features,
    repair_layer, simplify_layer,
};

#[derive(Default)]
struct NormalisationWorld {
    layer: RefCell<Option<Layer>>,
    warnings: RefCell<Vec<RepairWarning>>,
    coords_before: Cell<usize>,
    coords_after: Cell<usize>,
}

impl NormalisationWorld {
    fn take_layer(&self) -> Layer {
        self.layer
            .borrow_mut()
            .take()
            .expect("a layer should be prepared")
    }

    fn first_geometry(&self) -> Geometry {
        let layer = self.layer.borrow();
        let layer = layer.as_ref().expect("a layer should be recorded");
        layer
            .features()
            .first()
            .map(|feature| feature.geometry.clone())
            .expect("the layer should keep its feature")
    }
}

#[fixture]
fn world() -> NormalisationWorld {
    NormalisationWorld::default()
}

#[given("a polygon layer holding a figure-eight")]
fn given_figure_eight(world: &NormalisationWorld) {
    world
        .layer
        .replace(Some(polygon_layer("parcelas", vec![figure_eight()])));
}

#[given("a square polygon with a hole of area 1e-10")]
fn given_tiny_hole(world: &NormalisationWorld) {
    let mut polygon = square(0.0, 0.0, 1.0);
    polygon.interiors_push(square_ring(0.5, 0.5, 1e-5));
    world
        .layer
        .replace(Some(polygon_layer("lagos", vec![polygon])));
}

const FIRST_POINT: (f64, f64) = (-56.000_02, 10.000_01);
const SECOND_POINT: (f64, f64) = (-56.000_01, 10.000_02);

#[given(
    "points at latitude 10.00001 longitude -56.00002 then latitude 10.00002 longitude -56.00001"
)]
fn given_near_points(world: &NormalisationWorld) {
    world
        .layer
        .replace(Some(point_layer("tiendas", &[FIRST_POINT, SECOND_POINT])));
}

#[given("a polygon ring with 1000 near-collinear vertices")]
fn given_dense_ring(world: &NormalisationWorld) {
    let polygon = near_collinear_rectangle(1000, 0.5, 0.25, 1e-5);
    world
        .layer
        .replace(Some(polygon_layer("limites", vec![polygon])));
}

#[when("the layer is repaired")]
fn when_repaired(world: &NormalisationWorld) {
    let outcome = repair_layer(world.take_layer());
    world.warnings.replace(outcome.warnings);
    world.layer.replace(Some(outcome.layer));
}

#[when("small features are filtered with a hole threshold of {threshold}")]
fn when_filtered(world: &NormalisationWorld, threshold: f64) {
    let thresholds = AreaThresholds {
        hole_area_min: threshold,
        part_area_min: 0.0,
    };
    let outcome = filter_small_features(world.take_layer(), thresholds);
    world.layer.replace(Some(outcome.layer));
}

#[when("the points are deduplicated on a {grid} degree grid")]
fn when_deduplicated(world: &NormalisationWorld, grid: f64) {
    let outcome = dedupe_points(world.take_layer(), grid);
    world.layer.replace(Some(outcome.layer));
}

#[when("the layer is simplified at a tolerance of {tolerance}")]
fn when_simplified(world: &NormalisationWorld, tolerance: f64) {
    let outcome = simplify_layer(world.take_layer(), tolerance);
    world.coords_before.set(outcome.coords_before);
    world.coords_after.set(outcome.coords_after);
    world.layer.replace(Some(outcome.layer));
}

#[then("the feature is a valid, non-empty polygonal geometry")]
fn then_valid_polygonal(world: &NormalisationWorld) {
    match world.first_geometry() {
        Geometry::Polygon(polygon) => {
            assert!(polygon.is_valid());
            assert!(polygon.unsigned_area() > 0.0);
        }
        Geometry::MultiPolygon(polygons) => {
            assert!(polygons.is_valid());
            assert!(polygons.unsigned_area() > 0.0);
        }
        other => panic!("expected polygonal geometry, got {}", other.kind_name()),
    }
}

#[then("no repair warning is recorded")]
fn then_no_warnings(world: &NormalisationWorld) {
    assert!(world.warnings.borrow().is_empty());
}

#[then("the polygon has no holes")]
fn then_no_holes(world: &NormalisationWorld) {
    let Geometry::Polygon(polygon) = world.first_geometry() else {
        panic!("expected a polygon");
    };
    assert!(polygon.interiors().is_empty());
}

#[then("{count} point remains")]
fn then_single_point(world: &NormalisationWorld, count: usize) {
    let layer = world.layer.borrow();
    assert_eq!(layer.as_ref().map(Layer::len), Some(count));
}

#[then("the remaining point is the first in input order")]
fn then_first_point_kept(world: &NormalisationWorld) {
    let layer = world.layer.borrow();
    let feature = layer
        .as_ref()
        .and_then(|layer| layer.features().first())
        .expect("one point should remain");
    assert_eq!(feature.attributes.get("ID"), Some(&AttributeValue::Integer(0)));
    let Geometry::Point(point) = feature.geometry else {
        panic!("expected a point, got {}", feature.geometry.kind_name());
    };
    assert_eq!((point.x(), point.y()), FIRST_POINT);
}

#[then("{count} points remain")]
fn then_points_remain(world: &NormalisationWorld, count: usize) {
    let layer = world.layer.borrow();
    assert_eq!(layer.as_ref().map(Layer::len), Some(count));
}

#[then("the vertex count drops by at least a factor of 10")]
fn then_vertex_count_drops(world: &NormalisationWorld) {
    let (before, after) = (world.coords_before.get(), world.coords_after.get());
    assert!(
        after * 10 <= before,
        "expected at least a tenfold reduction, got {before} -> {after}"
    );
}

#[then("the simplified polygon is valid")]
fn then_simplified_valid(world: &NormalisationWorld) {
    let Geometry::Polygon(polygon) = world.first_geometry() else {
        panic!("expected a polygon");
    };
    assert!(polygon.is_valid());
    assert!(polygon.exterior().0.len() >= 4);
}

#[scenario(path = "tests/features/normalisation.feature", index = 0)]
fn figure_eight_is_repaired(world: NormalisationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/normalisation.feature", index = 1)]
fn negligible_hole_is_removed(world: NormalisationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/normalisation.feature", index = 2)]
fn near_points_collapse(world: NormalisationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/normalisation.feature", index = 3)]
fn near_points_survive(world: NormalisationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/normalisation.feature", index = 4)]
fn dense_ring_is_simplified(world: NormalisationWorld) {
    let _ = world;
}
