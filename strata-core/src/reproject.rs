//! Normalise layer coordinates to WGS84 longitude/latitude.
//!
//! Projected systems are inverted with `proj4rs`. Explicitly modelled
//! systems supply their own PROJ definition; any other EPSG code is looked
//! up in the definitions bundled with the crate. `proj4rs` works in radians
//! on geographic systems, so degrees are converted on the way in and out.

use geo::Coord;
use proj4rs::proj::Proj;
use thiserror::Error;

use crate::{Crs, Layer, WEB_MERCATOR_RADIUS};

const WGS84_DEFINITION: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Errors that abort reprojection of a layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReprojectError {
    /// The layer is tagged with a system the pipeline cannot transform.
    #[error("unsupported coordinate reference system: {crs}")]
    UnsupportedCrs {
        /// Identifier of the unsupported system.
        crs: String,
    },
    /// A source coordinate, or its transform, is NaN or infinite.
    #[error("feature {feature_index} produced a non-finite coordinate from ({x}, {y})")]
    NonFiniteCoordinate {
        /// Position of the feature within the layer.
        feature_index: usize,
        /// Source x value.
        x: f64,
        /// Source y value.
        y: f64,
    },
    /// PROJ rejected a coordinate, typically one outside the projection's
    /// domain.
    #[error("feature {feature_index} could not be transformed from ({x}, {y}): {reason}")]
    Transform {
        /// Position of the feature within the layer.
        feature_index: usize,
        /// Source x value.
        x: f64,
        /// Source y value.
        y: f64,
        /// Message reported by PROJ.
        reason: String,
    },
}

/// Source and destination systems of a coordinate transform.
struct Transformer {
    source: Proj,
    target: Proj,
}

impl Transformer {
    /// Transform from `crs` to WGS84, or `None` when `crs` already is.
    fn to_wgs84(crs: Option<&Crs>) -> Result<Option<Self>, ReprojectError> {
        let source = match crs {
            None | Some(Crs::Wgs84 | Crs::Geographic { .. }) => return Ok(None),
            Some(Crs::Unsupported(identifier)) => {
                return Err(ReprojectError::UnsupportedCrs {
                    crs: identifier.clone(),
                });
            }
            Some(Crs::Epsg(code)) => {
                Proj::from_epsg_code(*code).map_err(|err| unsupported(&Crs::Epsg(*code), &err))?
            }
            Some(other) => {
                let definition = other
                    .proj_definition()
                    .ok_or_else(|| ReprojectError::UnsupportedCrs {
                        crs: other.to_string(),
                    })?;
                Proj::from_proj_string(&definition).map_err(|err| unsupported(other, &err))?
            }
        };
        // Web Mercator coordinates are already WGS84 values laid on a sphere,
        // so invert onto the same sphere instead of shifting between datums.
        let target = if matches!(crs, Some(Crs::WebMercator)) {
            format!("+proj=longlat +a={WEB_MERCATOR_RADIUS} +b={WEB_MERCATOR_RADIUS} +no_defs")
        } else {
            WGS84_DEFINITION.to_owned()
        };
        let target =
            Proj::from_proj_string(&target).map_err(|err| unsupported(&Crs::Wgs84, &err))?;
        Ok(Some(Self { source, target }))
    }

    /// Transform one coordinate, in degrees on geographic systems.
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, proj4rs::errors::Error> {
        let mut point = if self.source.is_latlong() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        proj4rs::transform::transform(&self.source, &self.target, &mut point)?;
        Ok(if self.target.is_latlong() {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        })
    }
}

fn unsupported(crs: &Crs, err: &proj4rs::errors::Error) -> ReprojectError {
    log::debug!("PROJ rejected {crs}: {err}");
    ReprojectError::UnsupportedCrs {
        crs: crs.to_string(),
    }
}

fn is_finite(coord: Coord<f64>) -> bool {
    coord.x.is_finite() && coord.y.is_finite()
}

/// Reproject every coordinate of `layer` to WGS84.
///
/// Layers without a CRS tag are assumed to be WGS84 already. Layers on a
/// WGS84-compatible geographic datum are relabelled without moving their
/// coordinates. Every coordinate is checked for finiteness on both paths.
/// The returned layer is always tagged [`Crs::Wgs84`].
///
/// # Errors
/// Returns [`ReprojectError::UnsupportedCrs`] for systems PROJ cannot
/// resolve, [`ReprojectError::Transform`] when PROJ rejects a coordinate
/// and [`ReprojectError::NonFiniteCoordinate`] when a source coordinate is
/// not finite or projects to NaN.
///
/// # Examples
/// ```
/// use geo::Point;
/// use strata_core::{Crs, Feature, Geometry, GeometryFamily, Layer, reproject_layer};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let feature = Feature::new(Geometry::Point(Point::new(500_000.0, 10_000_000.0)));
/// let layer = Layer::new("pts", GeometryFamily::Points, Some(Crs::from_epsg(32721)), vec![feature])?;
/// let layer = reproject_layer(layer)?;
/// assert_eq!(layer.crs(), Some(&Crs::Wgs84));
/// # Ok(())
/// # }
/// ```
pub fn reproject_layer(layer: Layer) -> Result<Layer, ReprojectError> {
    let transformer = Transformer::to_wgs84(layer.crs())?;
    let (header, mut features) = layer.into_parts();
    for (feature_index, feature) in features.iter_mut().enumerate() {
        feature.geometry.try_map_coords_in_place(|coord| {
            let non_finite = || ReprojectError::NonFiniteCoordinate {
                feature_index,
                x: coord.x,
                y: coord.y,
            };
            if !is_finite(coord) {
                return Err(non_finite());
            }
            let Some(transformer) = &transformer else {
                return Ok(coord);
            };
            let projected = transformer
                .apply(coord)
                .map_err(|err| ReprojectError::Transform {
                    feature_index,
                    x: coord.x,
                    y: coord.y,
                    reason: err.to_string(),
                })?;
            if is_finite(projected) {
                Ok(projected)
            } else {
                Err(non_finite())
            }
        })?;
    }
    if transformer.is_some() {
        log::debug!(
            "reprojected {} features of layer {} from {}",
            features.len(),
            header.name,
            header.crs.as_ref().map_or_else(|| Crs::Wgs84.to_string(), ToString::to_string)
        );
    }
    Ok(Layer::from_parts(header, features).with_crs(Crs::Wgs84))
}
