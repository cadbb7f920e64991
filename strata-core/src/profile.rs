//! Processing profiles controlling every reduction stage.
//!
//! A [`ProcessingProfile`] is validated on construction and on
//! deserialisation, so stages can trust its numbers. [`TierProfiles`] pairs
//! the profiles used for the full and lite outputs.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::AreaThresholds;

/// Default Ramer-Douglas-Peucker tolerance in degrees.
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 0.0006;
/// Default coordinate quantisation grid in degrees.
pub const DEFAULT_PRECISION_GRID: f64 = 1e-6;
/// Default point deduplication grid in degrees.
pub const DEFAULT_DEDUPE_GRID: f64 = 1e-5;

/// Errors raised while validating a [`ProcessingProfile`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// A tolerance or threshold was negative, NaN or infinite.
    #[error("{field} must be a finite, non-negative number (got {value})")]
    NegativeOrNonFinite {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A grid size was zero, negative, NaN or infinite.
    #[error("{field} must be a finite, positive number (got {value})")]
    NonPositiveGrid {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
}

/// Immutable stage configuration for one output tier.
///
/// # Examples
/// ```
/// use strata_core::ProcessingProfile;
///
/// # fn main() -> Result<(), strata_core::ProfileError> {
/// let profile = ProcessingProfile::builder()
///     .keep_columns(["NOMBRE", "CODIGO"])
///     .simplify_tolerance(0.001)
///     .build()?;
/// assert_eq!(profile.keep_columns().len(), 2);
/// assert!(ProcessingProfile::builder().dedupe_grid(0.0).build().is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "ProfileBuilder", into = "ProfileBuilder")
)]
pub struct ProcessingProfile {
    keep_columns: BTreeSet<String>,
    simplify_tolerance: f64,
    precision_grid: Option<f64>,
    hole_area_min: f64,
    part_area_min: f64,
    is_points: bool,
    dedupe_grid: f64,
    emit_compressed: bool,
}

impl Default for ProcessingProfile {
    fn default() -> Self {
        Self {
            keep_columns: BTreeSet::new(),
            simplify_tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            precision_grid: Some(DEFAULT_PRECISION_GRID),
            hole_area_min: 0.0,
            part_area_min: 0.0,
            is_points: false,
            dedupe_grid: DEFAULT_DEDUPE_GRID,
            emit_compressed: true,
        }
    }
}

impl ProcessingProfile {
    /// Start building a profile from the defaults.
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder::default()
    }

    /// Attribute names to keep; empty keeps every attribute.
    pub const fn keep_columns(&self) -> &BTreeSet<String> {
        &self.keep_columns
    }

    /// Simplification tolerance in degrees; zero disables the stage.
    pub const fn simplify_tolerance(&self) -> f64 {
        self.simplify_tolerance
    }

    /// Quantisation grid in degrees, if precision reduction is enabled.
    pub const fn precision_grid(&self) -> Option<f64> {
        self.precision_grid
    }

    /// Holes with a smaller area (degrees²) are removed.
    pub const fn hole_area_min(&self) -> f64 {
        self.hole_area_min
    }

    /// Polygon parts with a smaller area (degrees²) are removed.
    pub const fn part_area_min(&self) -> f64 {
        self.part_area_min
    }

    /// Whether the layer is a point layer eligible for deduplication.
    pub const fn is_points(&self) -> bool {
        self.is_points
    }

    /// Deduplication grid in degrees.
    pub const fn dedupe_grid(&self) -> f64 {
        self.dedupe_grid
    }

    /// Whether a gzip copy of the tier is written.
    pub const fn emit_compressed(&self) -> bool {
        self.emit_compressed
    }

    /// Whether the small-feature filter has any work to do.
    pub fn filters_small_features(&self) -> bool {
        self.area_thresholds().is_active()
    }

    /// Area thresholds for [`crate::filter_small_features`].
    pub const fn area_thresholds(&self) -> AreaThresholds {
        AreaThresholds {
            hole_area_min: self.hole_area_min,
            part_area_min: self.part_area_min,
        }
    }

    /// Derive a profile that keeps the attribute and point settings but
    /// disables every lossy geometry stage.
    ///
    /// # Examples
    /// ```
    /// use strata_core::ProcessingProfile;
    ///
    /// let full = ProcessingProfile::default().unreduced();
    /// assert_eq!(full.simplify_tolerance(), 0.0);
    /// assert_eq!(full.precision_grid(), None);
    /// ```
    #[must_use]
    pub fn unreduced(&self) -> Self {
        Self {
            keep_columns: self.keep_columns.clone(),
            simplify_tolerance: 0.0,
            precision_grid: None,
            hole_area_min: 0.0,
            part_area_min: 0.0,
            is_points: self.is_points,
            dedupe_grid: self.dedupe_grid,
            emit_compressed: self.emit_compressed,
        }
    }
}

/// Unvalidated profile fields, also the serialised form of a profile.
///
/// Missing fields take the documented defaults.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ProfileBuilder {
    /// Attribute names to keep.
    pub keep_columns: BTreeSet<String>,
    /// Simplification tolerance in degrees.
    pub simplify_tolerance: f64,
    /// Quantisation grid in degrees.
    pub precision_grid: Option<f64>,
    /// Minimum hole area in degrees².
    pub hole_area_min: f64,
    /// Minimum part area in degrees².
    pub part_area_min: f64,
    /// Whether the layer holds points.
    pub is_points: bool,
    /// Deduplication grid in degrees.
    pub dedupe_grid: f64,
    /// Whether to gzip the lite tier.
    pub emit_compressed: bool,
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        ProcessingProfile::default().into()
    }
}

impl ProfileBuilder {
    /// Replace the attribute allow-list.
    #[must_use]
    pub fn keep_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the simplification tolerance.
    #[must_use]
    pub fn simplify_tolerance(mut self, tolerance: f64) -> Self {
        self.simplify_tolerance = tolerance;
        self
    }

    /// Set or disable the precision grid.
    #[must_use]
    pub fn precision_grid(mut self, grid: Option<f64>) -> Self {
        self.precision_grid = grid;
        self
    }

    /// Set the minimum hole area.
    #[must_use]
    pub fn hole_area_min(mut self, area: f64) -> Self {
        self.hole_area_min = area;
        self
    }

    /// Set the minimum part area.
    #[must_use]
    pub fn part_area_min(mut self, area: f64) -> Self {
        self.part_area_min = area;
        self
    }

    /// Mark the layer as a point layer.
    #[must_use]
    pub fn is_points(mut self, is_points: bool) -> Self {
        self.is_points = is_points;
        self
    }

    /// Set the deduplication grid.
    #[must_use]
    pub fn dedupe_grid(mut self, grid: f64) -> Self {
        self.dedupe_grid = grid;
        self
    }

    /// Enable or disable the gzip copy.
    #[must_use]
    pub fn emit_compressed(mut self, emit: bool) -> Self {
        self.emit_compressed = emit;
        self
    }

    /// Validate the fields and produce a [`ProcessingProfile`].
    ///
    /// # Errors
    /// Returns [`ProfileError`] for negative or non-finite tolerances and
    /// areas, and for non-positive grids.
    pub fn build(self) -> Result<ProcessingProfile, ProfileError> {
        non_negative("simplify_tolerance", self.simplify_tolerance)?;
        non_negative("hole_area_min", self.hole_area_min)?;
        non_negative("part_area_min", self.part_area_min)?;
        if let Some(grid) = self.precision_grid {
            positive("precision_grid", grid)?;
        }
        positive("dedupe_grid", self.dedupe_grid)?;
        Ok(ProcessingProfile {
            keep_columns: self.keep_columns,
            simplify_tolerance: self.simplify_tolerance,
            precision_grid: self.precision_grid,
            hole_area_min: self.hole_area_min,
            part_area_min: self.part_area_min,
            is_points: self.is_points,
            dedupe_grid: self.dedupe_grid,
            emit_compressed: self.emit_compressed,
        })
    }
}

impl From<ProcessingProfile> for ProfileBuilder {
    fn from(profile: ProcessingProfile) -> Self {
        Self {
            keep_columns: profile.keep_columns,
            simplify_tolerance: profile.simplify_tolerance,
            precision_grid: profile.precision_grid,
            hole_area_min: profile.hole_area_min,
            part_area_min: profile.part_area_min,
            is_points: profile.is_points,
            dedupe_grid: profile.dedupe_grid,
            emit_compressed: profile.emit_compressed,
        }
    }
}

impl TryFrom<ProfileBuilder> for ProcessingProfile {
    type Error = ProfileError;

    fn try_from(builder: ProfileBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ProfileError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ProfileError::NegativeOrNonFinite { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ProfileError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProfileError::NonPositiveGrid { field, value })
    }
}

/// Profiles used for the full and lite output tiers.
///
/// # Examples
/// ```
/// use strata_core::{ProcessingProfile, TierProfiles};
///
/// let tiers = TierProfiles::shared(ProcessingProfile::default());
/// assert_eq!(tiers.full, tiers.lite);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierProfiles {
    /// Profile for the `.full.geojson` output.
    pub full: ProcessingProfile,
    /// Profile for the `.lite.geojson` output and its gzip copy.
    pub lite: ProcessingProfile,
}

impl TierProfiles {
    /// Use one profile for both tiers.
    pub fn shared(profile: ProcessingProfile) -> Self {
        Self {
            full: profile.clone(),
            lite: profile,
        }
    }

    /// Use independent profiles for each tier.
    pub const fn split(full: ProcessingProfile, lite: ProcessingProfile) -> Self {
        Self { full, lite }
    }

    /// Keep `lite` as given and derive an unreduced full tier from it.
    pub fn unreduced_full(lite: ProcessingProfile) -> Self {
        Self {
            full: lite.unreduced(),
            lite,
        }
    }

    /// Whether both tiers run identical stages.
    pub fn is_shared(&self) -> bool {
        self.full == self.lite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_reference_constants() {
        let profile = ProcessingProfile::default();
        assert!(profile.keep_columns().is_empty());
        assert_eq!(profile.simplify_tolerance(), 0.0006);
        assert_eq!(profile.precision_grid(), Some(1e-6));
        assert_eq!(profile.dedupe_grid(), 1e-5);
        assert!(profile.emit_compressed());
        assert!(!profile.filters_small_features());
    }

    #[rstest]
    #[case(ProfileBuilder::default().simplify_tolerance(-0.1), "simplify_tolerance")]
    #[case(ProfileBuilder::default().simplify_tolerance(f64::NAN), "simplify_tolerance")]
    #[case(ProfileBuilder::default().hole_area_min(f64::INFINITY), "hole_area_min")]
    #[case(ProfileBuilder::default().part_area_min(-1e-9), "part_area_min")]
    fn rejects_negative_or_non_finite_thresholds(
        #[case] builder: ProfileBuilder,
        #[case] expected: &str,
    ) {
        match builder.build() {
            Err(ProfileError::NegativeOrNonFinite { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected a threshold error, got {other:?}"),
        }
    }

    #[rstest]
    #[case(ProfileBuilder::default().precision_grid(Some(0.0)), "precision_grid")]
    #[case(ProfileBuilder::default().precision_grid(Some(-1e-6)), "precision_grid")]
    #[case(ProfileBuilder::default().dedupe_grid(0.0), "dedupe_grid")]
    #[case(ProfileBuilder::default().dedupe_grid(f64::NAN), "dedupe_grid")]
    fn rejects_non_positive_grids(#[case] builder: ProfileBuilder, #[case] expected: &str) {
        match builder.build() {
            Err(ProfileError::NonPositiveGrid { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected a grid error, got {other:?}"),
        }
    }

    #[test]
    fn disabled_precision_grid_is_valid() {
        let profile = ProfileBuilder::default()
            .precision_grid(None)
            .build()
            .expect("valid profile");
        assert_eq!(profile.precision_grid(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialising_applies_defaults_and_validation() {
        let profile: ProcessingProfile =
            serde_json::from_str(r#"{"keep_columns":["NOMBRE"],"hole_area_min":1e-9}"#)
                .expect("valid profile");
        assert_eq!(profile.hole_area_min(), 1e-9);
        assert_eq!(profile.simplify_tolerance(), DEFAULT_SIMPLIFY_TOLERANCE);
        assert!(profile.keep_columns().contains("NOMBRE"));

        let err = serde_json::from_str::<ProcessingProfile>(r#"{"dedupe_grid":-1.0}"#)
            .expect_err("negative grid must be rejected");
        assert!(err.to_string().contains("dedupe_grid"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<ProcessingProfile>(r#"{"tolerance":1.0}"#).is_err());
    }

    #[test]
    fn unreduced_disables_lossy_stages_only() {
        let lite = ProcessingProfile::builder()
            .keep_columns(["NOMBRE"])
            .hole_area_min(1e-9)
            .is_points(true)
            .build()
            .expect("valid profile");
        let tiers = TierProfiles::unreduced_full(lite.clone());
        assert_eq!(tiers.lite, lite);
        assert_eq!(tiers.full.keep_columns(), lite.keep_columns());
        assert!(tiers.full.is_points());
        assert!(!tiers.full.filters_small_features());
        assert!(!tiers.is_shared());
    }
}
