//! Core geometry model and pure processing stages for Strata.
//!
//! A [`Layer`] moves through the stages in this crate by value: reproject,
//! repair, prune attributes, reduce precision, filter small features,
//! simplify and deduplicate points. No stage performs I/O; loading and
//! writing live in `strata-data`.
//!
//! # Examples
//! ```
//! use geo::polygon;
//! use strata_core::{
//!     Feature, Geometry, GeometryFamily, Layer, reduce_precision, repair_layer, reproject_layer,
//!     simplify_layer,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let parcel = polygon![(x: -57.6, y: -25.3), (x: -57.5, y: -25.3), (x: -57.5, y: -25.2)];
//! let layer = Layer::new(
//!     "parcelas",
//!     GeometryFamily::Polygons,
//!     None,
//!     vec![Feature::new(Geometry::Polygon(parcel))],
//! )?;
//! let layer = reproject_layer(layer)?;
//! let layer = repair_layer(layer).layer;
//! let layer = reduce_precision(layer, 1e-6);
//! let outcome = simplify_layer(layer, 0.0006);
//! assert_eq!(outcome.layer.len(), 1);
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

pub mod crs;
pub mod dedupe;
pub mod filter;
pub mod geometry;
pub mod layer;
pub mod precision;
pub mod profile;
pub mod prune;
pub mod repair;
pub mod reproject;
pub mod simplify;
pub mod topology;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crs::{Crs, Ellipsoid, Hemisphere, WEB_MERCATOR_RADIUS};
pub use dedupe::{DedupeOutcome, dedupe_points, grid_key};
pub use filter::{AreaThresholds, FilterOutcome, filter_small_features};
pub use geometry::{AttributeValue, Attributes, Feature, Geometry, GeometryFamily};
pub use layer::{Layer, LayerError, LayerHeader};
pub use precision::{reduce_precision, snap_to_grid};
pub use profile::{
    DEFAULT_DEDUPE_GRID, DEFAULT_PRECISION_GRID, DEFAULT_SIMPLIFY_TOLERANCE, ProcessingProfile,
    ProfileBuilder, ProfileError, TierProfiles,
};
pub use prune::prune_attributes;
pub use repair::{RepairFailure, RepairOutcome, RepairWarning, repair_geometry, repair_layer};
pub use reproject::{ReprojectError, reproject_layer};
pub use simplify::{
    MAX_ATTEMPTS, SimplifyOutcome, douglas_peucker, ring_is_acceptable, simplify_geometry,
    simplify_layer,
};
pub use topology::{line_is_simple, ring_is_simple};
