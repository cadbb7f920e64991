//! Layers: ordered features sharing one geometry family and one CRS tag.

use thiserror::Error;

use crate::{Crs, Feature, GeometryFamily};

/// Ordered collection of features that share a geometry family.
///
/// Construct layers through [`Layer::new`] so the family invariant holds.
///
/// # Examples
/// ```
/// use geo::Point;
/// use strata_core::{Crs, Feature, Geometry, GeometryFamily, Layer};
///
/// # fn main() -> Result<(), strata_core::LayerError> {
/// let features = vec![Feature::new(Geometry::Point(Point::new(-57.6, -25.3)))];
/// let layer = Layer::new("tiendas", GeometryFamily::Points, Some(Crs::Wgs84), features)?;
/// assert_eq!(layer.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    family: GeometryFamily,
    crs: Option<Crs>,
    features: Vec<Feature>,
}

/// Errors returned by [`Layer::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    /// A feature's geometry does not belong to the layer family.
    #[error("feature {index} is a {found} but layer expects {expected}")]
    MixedGeometry {
        /// Position of the offending feature.
        index: usize,
        /// Family declared for the layer.
        expected: GeometryFamily,
        /// Variant name of the offending geometry.
        found: &'static str,
    },
}

impl Layer {
    /// Validates and constructs a [`Layer`].
    ///
    /// `crs` is `None` when the source carried no CRS information.
    pub fn new(
        name: impl Into<String>,
        family: GeometryFamily,
        crs: Option<Crs>,
        features: Vec<Feature>,
    ) -> Result<Self, LayerError> {
        if let Some((index, feature)) = features
            .iter()
            .enumerate()
            .find(|(_, feature)| feature.geometry.family() != family)
        {
            return Err(LayerError::MixedGeometry {
                index,
                expected: family,
                found: feature.geometry.kind_name(),
            });
        }
        Ok(Self {
            name: name.into(),
            family,
            crs,
            features,
        })
    }

    /// Layer name used for output file names and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geometry family shared by every feature.
    pub const fn family(&self) -> GeometryFamily {
        self.family
    }

    /// Coordinate reference system tag, if known.
    pub const fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Features in source order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the layer holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split the layer into its header and owned features.
    pub fn into_parts(self) -> (LayerHeader, Vec<Feature>) {
        (
            LayerHeader {
                name: self.name,
                family: self.family,
                crs: self.crs,
            },
            self.features,
        )
    }

    /// Rebuild a layer from a header and features produced by a stage.
    ///
    /// Stages only ever replace geometries within the same family, so the
    /// invariant is re-checked in debug builds only.
    pub(crate) fn from_parts(header: LayerHeader, features: Vec<Feature>) -> Self {
        debug_assert!(
            features
                .iter()
                .all(|feature| feature.geometry.family() == header.family),
            "stage changed the geometry family of layer {}",
            header.name
        );
        Self {
            name: header.name,
            family: header.family,
            crs: header.crs,
            features,
        }
    }

    /// Return a copy of this layer carrying a different CRS tag.
    pub(crate) fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }
}

/// Layer metadata detached from its features.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHeader {
    /// Layer name.
    pub name: String,
    /// Geometry family.
    pub family: GeometryFamily,
    /// Coordinate reference system tag, if known.
    pub crs: Option<Crs>,
}
