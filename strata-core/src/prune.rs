//! Attribute allow-listing.

use std::collections::BTreeSet;

use crate::{Attributes, Layer};

/// Keep only the attributes named in `keep_columns`.
///
/// An empty allow-list keeps every attribute. Names in the allow-list that a
/// feature does not carry are ignored.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use geo::Point;
/// use strata_core::{Feature, Geometry, GeometryFamily, Layer, prune_attributes};
///
/// # fn main() -> Result<(), strata_core::LayerError> {
/// let feature = Feature::new(Geometry::Point(Point::new(0.0, 0.0)))
///     .with_attribute("NOMBRE", "Luque")
///     .with_attribute("AREA_KM2", 38.0);
/// let layer = Layer::new("pts", GeometryFamily::Points, None, vec![feature])?;
/// let keep = BTreeSet::from(["NOMBRE".to_owned(), "CODIGO".to_owned()]);
/// let layer = prune_attributes(layer, &keep);
/// let keys: Vec<_> = layer.features()[0].attributes.keys().collect();
/// assert_eq!(keys, ["NOMBRE"]);
/// # Ok(())
/// # }
/// ```
pub fn prune_attributes(layer: Layer, keep_columns: &BTreeSet<String>) -> Layer {
    if keep_columns.is_empty() {
        return layer;
    }
    let (header, mut features) = layer.into_parts();
    for feature in &mut features {
        prune(&mut feature.attributes, keep_columns);
    }
    Layer::from_parts(header, features)
}

fn prune(attributes: &mut Attributes, keep_columns: &BTreeSet<String>) {
    attributes.retain(|key, _| keep_columns.contains(key));
}
