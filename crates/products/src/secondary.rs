//! Secondary unit of measure settings and the quantity conversion core.
//!
//! `secondary = round(primary * ratio, rounding)` going forward and
//! `primary = secondary / ratio` going back. The backward direction is left
//! unrounded on purpose: downstream consumers read the raw value.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use uomsync_core::{DomainError, ValueObject};

use crate::rounding::{DEFAULT_PRECISION, float_compare, float_round};
use crate::uom::UnitOfMeasure;

/// Ratio stored on a product that never configured one.
pub const DEFAULT_RATIO: f64 = 1.0;

/// How a product's secondary quantity is meant to be managed by reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryTracking {
    #[default]
    None,
    Stored,
    Computed,
}

/// Rejected secondary UoM setup. Raised when the product is saved, never
/// silently corrected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("secondary UoM is enabled but no secondary unit is set")]
    MissingUnit,

    #[error("secondary UoM {secondary} must belong to the same category as primary UoM {primary}")]
    CategoryMismatch { primary: String, secondary: String },

    #[error("secondary UoM ratio must be greater than zero (got {0})")]
    NonPositiveRatio(f64),

    #[error("secondary UoM ratio must be a finite number (got {0})")]
    NonFiniteRatio(f64),
}

impl From<ConfigurationError> for DomainError {
    fn from(err: ConfigurationError) -> Self {
        DomainError::validation(err.to_string())
    }
}

/// Secondary UoM configuration of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryUom {
    enabled: bool,
    unit: Option<UnitOfMeasure>,
    ratio: f64,
    tracking: SecondaryTracking,
}

impl ValueObject for SecondaryUom {}

impl Default for SecondaryUom {
    fn default() -> Self {
        Self::disabled()
    }
}

impl SecondaryUom {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            unit: None,
            ratio: DEFAULT_RATIO,
            tracking: SecondaryTracking::None,
        }
    }

    /// Enabled configuration, validated against the product's primary unit.
    pub fn enabled(
        primary: &UnitOfMeasure,
        unit: UnitOfMeasure,
        ratio: f64,
    ) -> Result<Self, ConfigurationError> {
        let config = Self {
            enabled: true,
            unit: Some(unit),
            ratio,
            tracking: SecondaryTracking::None,
        };
        config.validate(primary)?;
        Ok(config)
    }

    pub fn with_tracking(mut self, tracking: SecondaryTracking) -> Self {
        self.tracking = tracking;
        self
    }

    /// Same unit and ratio, switched off.
    pub fn to_disabled(&self) -> Self {
        Self {
            enabled: false,
            ..self.clone()
        }
    }

    /// Check the enabled-state invariants against `primary`.
    ///
    /// Disabled configurations are always valid, whatever they hold.
    pub fn validate(&self, primary: &UnitOfMeasure) -> Result<(), ConfigurationError> {
        if !self.enabled {
            return Ok(());
        }
        let unit = self.unit.as_ref().ok_or(ConfigurationError::MissingUnit)?;
        if !unit.has_common_reference(primary) {
            return Err(ConfigurationError::CategoryMismatch {
                primary: primary.to_string(),
                secondary: unit.to_string(),
            });
        }
        if self.ratio.is_infinite() {
            return Err(ConfigurationError::NonFiniteRatio(self.ratio));
        }
        if !(self.ratio > 0.0) {
            return Err(ConfigurationError::NonPositiveRatio(self.ratio));
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn unit(&self) -> Option<&UnitOfMeasure> {
        self.unit.as_ref()
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn tracking(&self) -> SecondaryTracking {
        self.tracking
    }

    /// Rounding precision of the secondary unit, 0.01 when it has none.
    pub fn rounding(&self) -> f64 {
        self.unit
            .as_ref()
            .map(UnitOfMeasure::rounding)
            .filter(|r| *r > 0.0)
            .unwrap_or(DEFAULT_PRECISION)
    }

    /// Whether conversions do anything. A zero (or NaN) ratio makes them
    /// pass-through instead of dividing by zero.
    pub fn converts(&self) -> bool {
        self.enabled && self.ratio.is_finite() && self.ratio != 0.0
    }

    pub fn round_secondary(&self, qty: f64) -> f64 {
        float_round(qty, self.rounding())
    }

    /// Primary to secondary, rounded to the secondary unit.
    pub fn convert_to_secondary(&self, qty: f64) -> f64 {
        if !self.converts() {
            return qty;
        }
        self.round_secondary(qty * self.ratio)
    }

    /// Secondary to primary, unrounded.
    pub fn convert_to_primary(&self, qty: f64) -> f64 {
        if !self.converts() {
            return qty;
        }
        qty / self.ratio
    }

    /// Value a line's secondary field must hold for `primary`: the forward
    /// conversion when enabled, zero otherwise.
    pub fn secondary_for(&self, primary: f64) -> f64 {
        if self.enabled {
            self.convert_to_secondary(primary)
        } else {
            0.0
        }
    }

    /// Whether `secondary` is what `primary` converts to, at the secondary
    /// unit's precision.
    pub fn is_consistent(&self, primary: f64, secondary: f64) -> bool {
        float_compare(self.secondary_for(primary), secondary, self.rounding()) == Ordering::Equal
    }
}

/// Ratio a product should use for `secondary` given its `primary` unit: one
/// primary unit expressed in the secondary unit, or 1.0 across categories.
pub fn suggest_ratio(primary: &UnitOfMeasure, secondary: &UnitOfMeasure) -> f64 {
    primary
        .compute_quantity(1.0, secondary)
        .unwrap_or(DEFAULT_RATIO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uom::UomCategory;

    fn unit() -> UnitOfMeasure {
        UnitOfMeasure::reference("Unit", UomCategory::new("Count"))
    }

    fn dozen() -> UnitOfMeasure {
        UnitOfMeasure::bigger("Dozen", UomCategory::new("Count"), 12.0).unwrap()
    }

    fn meter() -> UnitOfMeasure {
        UnitOfMeasure::reference("Meter", UomCategory::new("Length"))
    }

    fn per_dozen() -> SecondaryUom {
        SecondaryUom::enabled(&unit(), dozen(), 0.0833333).unwrap()
    }

    #[test]
    fn disabled_conversions_are_identity() {
        let config = SecondaryUom::disabled();
        assert_eq!(config.convert_to_secondary(24.0), 24.0);
        assert_eq!(config.convert_to_primary(3.0), 3.0);
        assert_eq!(config.secondary_for(24.0), 0.0);
    }

    #[test]
    fn forward_rounds_backward_does_not() {
        let config = per_dozen();
        assert_eq!(config.convert_to_secondary(24.0), 2.0);
        assert_eq!(config.convert_to_secondary(5.0), 0.42);

        let primary = config.convert_to_primary(3.0);
        assert!((primary - 36.0).abs() < 1e-3);
        assert_ne!(primary, 36.0);
    }

    #[test]
    fn zero_ratio_passes_through() {
        let config = SecondaryUom {
            enabled: true,
            unit: Some(dozen()),
            ratio: 0.0,
            tracking: SecondaryTracking::None,
        };
        assert!(!config.converts());
        assert_eq!(config.convert_to_secondary(10.0), 10.0);
        assert_eq!(config.convert_to_primary(10.0), 10.0);
    }

    #[test]
    fn rounding_defaults_without_unit() {
        assert_eq!(SecondaryUom::disabled().rounding(), DEFAULT_PRECISION);

        let coarse = dozen().with_rounding(1.0).unwrap();
        let config = SecondaryUom::enabled(&unit(), coarse, 1.0 / 12.0).unwrap();
        assert_eq!(config.rounding(), 1.0);
        assert_eq!(config.convert_to_secondary(30.0), 3.0);
    }

    #[test]
    fn validation_rejects_missing_unit() {
        let config = SecondaryUom {
            enabled: true,
            unit: None,
            ratio: 1.0,
            tracking: SecondaryTracking::None,
        };
        assert_eq!(config.validate(&unit()), Err(ConfigurationError::MissingUnit));
    }

    #[test]
    fn validation_rejects_zero_and_negative_ratio() {
        assert_eq!(
            SecondaryUom::enabled(&unit(), dozen(), 0.0),
            Err(ConfigurationError::NonPositiveRatio(0.0))
        );
        assert_eq!(
            SecondaryUom::enabled(&unit(), dozen(), -1.0),
            Err(ConfigurationError::NonPositiveRatio(-1.0))
        );
        assert!(SecondaryUom::enabled(&unit(), dozen(), f64::NAN).is_err());
    }

    #[test]
    fn validation_rejects_infinite_ratio() {
        assert_eq!(
            SecondaryUom::enabled(&unit(), dozen(), f64::INFINITY),
            Err(ConfigurationError::NonFiniteRatio(f64::INFINITY))
        );
        assert!(SecondaryUom::enabled(&unit(), dozen(), f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn validation_rejects_category_mismatch() {
        let err = SecondaryUom::enabled(&meter(), unit(), 1.0).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::CategoryMismatch {
                primary: "Length/Meter".to_string(),
                secondary: "Count/Unit".to_string(),
            }
        );
        let domain: DomainError = err.into();
        assert!(matches!(domain, DomainError::Validation(_)));
    }

    #[test]
    fn disabled_config_skips_validation() {
        let config = per_dozen().to_disabled();
        assert!(config.validate(&meter()).is_ok());
        assert_eq!(config.unit(), Some(&dozen()));
        assert_eq!(config.ratio(), 0.0833333);
    }

    #[test]
    fn suggested_ratio_follows_units() {
        let ratio = suggest_ratio(&unit(), &dozen());
        assert!((ratio - 1.0 / 12.0).abs() < 1e-12);
        assert_eq!(suggest_ratio(&meter(), &dozen()), DEFAULT_RATIO);
    }

    #[test]
    fn consistency_check_uses_secondary_precision() {
        let config = per_dozen();
        assert!(config.is_consistent(24.0, 2.0));
        assert!(config.is_consistent(24.0, 2.001));
        assert!(!config.is_consistent(24.0, 2.5));
        assert!(SecondaryUom::disabled().is_consistent(24.0, 0.0));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Disabled settings never alter a quantity.
            #[test]
            fn disabled_is_identity(qty in -1.0e9f64..1.0e9) {
                let config = SecondaryUom::disabled();
                prop_assert_eq!(config.convert_to_secondary(qty), qty);
                prop_assert_eq!(config.convert_to_primary(qty), qty);
            }

            /// Forward conversion lands within half a rounding step of qty * ratio.
            #[test]
            fn forward_is_rounded_product(qty in 0.0f64..1.0e6, ratio in 0.001f64..1000.0) {
                let config = SecondaryUom::enabled(&unit(), dozen(), ratio).unwrap();
                let secondary = config.convert_to_secondary(qty);
                let exact = qty * ratio;
                prop_assert!((secondary - exact).abs() <= config.rounding() / 2.0 + exact.abs() * 1e-12);
            }

            /// Going forward then back loses at most one rounding step.
            #[test]
            fn round_trip_is_within_one_step(qty in 0.0f64..1.0e6, ratio in 0.001f64..1000.0) {
                let config = SecondaryUom::enabled(&unit(), dozen(), ratio).unwrap();
                let back = config.convert_to_primary(config.convert_to_secondary(qty));
                let tolerance = config.rounding() / ratio + qty.abs() * 1e-12;
                prop_assert!((back - qty).abs() <= tolerance);
            }

            /// Round trip is exact when qty * ratio is already on the rounding grid.
            #[test]
            fn round_trip_is_exact_on_grid(qty in 0u32..1_000_000, ratio_exp in 0i32..4) {
                let ratio = 2f64.powi(ratio_exp);
                let coarse = dozen().with_rounding(1.0).unwrap();
                let config = SecondaryUom::enabled(&unit(), coarse, ratio).unwrap();
                let qty = f64::from(qty);
                prop_assert_eq!(config.convert_to_primary(config.convert_to_secondary(qty)), qty);
            }

            /// Converting the same quantity twice gives the same answer.
            #[test]
            fn forward_is_idempotent(qty in -1.0e6f64..1.0e6, ratio in 0.001f64..1000.0) {
                let config = SecondaryUom::enabled(&unit(), dozen(), ratio).unwrap();
                prop_assert_eq!(config.convert_to_secondary(qty), config.convert_to_secondary(qty));
            }
        }
    }
}
