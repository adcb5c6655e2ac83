//! Units of measure and their categories.
//!
//! A unit belongs to exactly one category ("Unit", "Length", "Weight", ...).
//! Quantities convert freely between units of the same category through the
//! category's reference unit; never across categories.

use serde::{Deserialize, Serialize};

use uomsync_core::{DomainError, DomainResult, ValueObject};

use crate::rounding::DEFAULT_PRECISION;

/// Measurement category shared by convertible units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UomCategory(String);

impl UomCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for UomCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a unit relative to its category's reference unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UomType {
    Reference,
    Bigger,
    Smaller,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    name: String,
    category: UomCategory,
    uom_type: UomType,
    /// How many of this unit make one reference unit (Dozen: 1/12, cm: 100).
    factor: f64,
    rounding: f64,
}

impl ValueObject for UnitOfMeasure {}

fn positive(value: f64, what: &str) -> DomainResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(DomainError::validation(format!("{what} must be greater than zero")))
    }
}

impl UnitOfMeasure {
    /// Reference unit of `category`.
    pub fn reference(name: impl Into<String>, category: UomCategory) -> Self {
        Self {
            name: name.into(),
            category,
            uom_type: UomType::Reference,
            factor: 1.0,
            rounding: DEFAULT_PRECISION,
        }
    }

    /// Unit holding `ratio` reference units (a Dozen holds 12 Units).
    pub fn bigger(name: impl Into<String>, category: UomCategory, ratio: f64) -> DomainResult<Self> {
        let ratio = positive(ratio, "unit ratio")?;
        Ok(Self {
            name: name.into(),
            category,
            uom_type: UomType::Bigger,
            factor: 1.0 / ratio,
            rounding: DEFAULT_PRECISION,
        })
    }

    /// Unit of which `ratio` make one reference unit (100 cm make 1 m).
    pub fn smaller(name: impl Into<String>, category: UomCategory, ratio: f64) -> DomainResult<Self> {
        let ratio = positive(ratio, "unit ratio")?;
        Ok(Self {
            name: name.into(),
            category,
            uom_type: UomType::Smaller,
            factor: ratio,
            rounding: DEFAULT_PRECISION,
        })
    }

    pub fn with_rounding(mut self, rounding: f64) -> DomainResult<Self> {
        self.rounding = positive(rounding, "rounding precision")?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &UomCategory {
        &self.category
    }

    pub fn uom_type(&self) -> UomType {
        self.uom_type
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn rounding(&self) -> f64 {
        self.rounding
    }

    /// Both units measure the same thing and can be converted into each other.
    pub fn has_common_reference(&self, other: &UnitOfMeasure) -> bool {
        self.category == other.category
    }

    /// Express `qty` of this unit in `to` (unrounded).
    pub fn compute_quantity(&self, qty: f64, to: &UnitOfMeasure) -> DomainResult<f64> {
        if self == to {
            return Ok(qty);
        }
        if !self.has_common_reference(to) {
            return Err(DomainError::validation(format!(
                "cannot convert from {} ({}) to {} ({})",
                self.name, self.category, to.name, to.category
            )));
        }
        Ok(qty / self.factor * to.factor)
    }
}

impl core::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count() -> UomCategory {
        UomCategory::new("Count")
    }

    #[test]
    fn dozen_to_units_and_back() {
        let unit = UnitOfMeasure::reference("Unit", count());
        let dozen = UnitOfMeasure::bigger("Dozen", count(), 12.0).unwrap();

        let units = dozen.compute_quantity(2.0, &unit).unwrap();
        assert!((units - 24.0).abs() < 1e-9);
        let per_unit = unit.compute_quantity(1.0, &dozen).unwrap();
        assert!((per_unit - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn smaller_units_scale_up() {
        let length = UomCategory::new("Length");
        let meter = UnitOfMeasure::reference("Meter", length.clone());
        let cm = UnitOfMeasure::smaller("Centimeter", length, 100.0).unwrap();

        assert_eq!(meter.compute_quantity(1.5, &cm).unwrap(), 150.0);
        assert_eq!(cm.compute_quantity(250.0, &meter).unwrap(), 2.5);
    }

    #[test]
    fn conversion_to_self_is_identity() {
        let unit = UnitOfMeasure::reference("Unit", count());
        assert_eq!(unit.compute_quantity(7.25, &unit).unwrap(), 7.25);
    }

    #[test]
    fn rejects_cross_category_conversion() {
        let meter = UnitOfMeasure::reference("Meter", UomCategory::new("Length"));
        let unit = UnitOfMeasure::reference("Unit", count());

        assert!(!meter.has_common_reference(&unit));
        match meter.compute_quantity(1.0, &unit).unwrap_err() {
            DomainError::Validation(msg) => assert!(msg.contains("Length")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_ratio_and_rounding() {
        assert!(UnitOfMeasure::bigger("Box", count(), 0.0).is_err());
        assert!(UnitOfMeasure::smaller("Half", count(), -2.0).is_err());
        assert!(UnitOfMeasure::bigger("Box", count(), f64::NAN).is_err());

        let unit = UnitOfMeasure::reference("Unit", count());
        assert!(unit.clone().with_rounding(0.0).is_err());
        assert_eq!(unit.with_rounding(1.0).unwrap().rounding(), 1.0);
    }

    #[test]
    fn displays_as_category_slash_name() {
        let meter = UnitOfMeasure::reference("Meter", UomCategory::new("Length"));
        assert_eq!(meter.to_string(), "Length/Meter");
    }
}
