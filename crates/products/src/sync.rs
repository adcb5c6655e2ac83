//! Primary/secondary quantity synchronization for document lines.
//!
//! Every line type that carries a secondary quantity declares one
//! [`QuantityBinding`] per primary/secondary field pair and routes all quantity
//! edits through [`QuantityBinding::apply`]. Two triggers exist:
//!
//! - **forward**: the primary quantity, the product, or the product's settings
//!   changed. The secondary is recomputed from the primary, overwriting whatever
//!   was stored.
//! - **inverse**: the secondary quantity was typed in. It is rounded to the
//!   secondary unit's precision, the primary is derived from it with one write,
//!   and the forward trigger is not re-run for that write.

use serde::{Deserialize, Serialize};
use tracing::debug;

use uomsync_core::{DomainError, DomainResult};

use crate::product::{ProductId, ProductUomSnapshot};
use crate::secondary::SecondaryUom;
use crate::uom::UnitOfMeasure;

/// Product reference and the read-only secondary unit shown on a line.
pub trait SecondaryUomLine {
    fn product_id(&self) -> ProductId;
    fn set_product_id(&mut self, product_id: ProductId);
    fn secondary_unit(&self) -> Option<&UnitOfMeasure>;
    fn set_secondary_unit(&mut self, unit: Option<UnitOfMeasure>);
}

/// Implement [`SecondaryUomLine`] for a struct with `product_id: ProductId` and
/// `secondary_unit: Option<UnitOfMeasure>` fields.
#[macro_export]
macro_rules! impl_secondary_uom_line {
    ($t:ty) => {
        impl $crate::sync::SecondaryUomLine for $t {
            fn product_id(&self) -> $crate::ProductId {
                self.product_id
            }

            fn set_product_id(&mut self, product_id: $crate::ProductId) {
                self.product_id = product_id;
            }

            fn secondary_unit(&self) -> Option<&$crate::UnitOfMeasure> {
                self.secondary_unit.as_ref()
            }

            fn set_secondary_unit(&mut self, unit: Option<$crate::UnitOfMeasure>) {
                self.secondary_unit = unit;
            }
        }
    };
}

/// A single logical edit of a line's quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "quantity", rename_all = "snake_case")]
pub enum LineEdit {
    /// Primary quantity entered.
    SetPrimary(f64),
    /// Secondary quantity entered.
    SetSecondary(f64),
    /// Line now references the snapshot's product.
    ChangeProduct,
    /// Product settings (ratio, unit) changed.
    Resync,
}

impl LineEdit {
    /// Quantity typed in by the user, if the edit carries one.
    pub fn quantity(&self) -> Option<f64> {
        match self {
            LineEdit::SetPrimary(qty) | LineEdit::SetSecondary(qty) => Some(*qty),
            LineEdit::ChangeProduct | LineEdit::Resync => None,
        }
    }
}

/// What an edit wrote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// Forward conversion stored in the secondary field.
    SecondaryRecomputed(f64),
    /// Product has no secondary UoM; secondary field zeroed.
    SecondaryCleared,
    /// Inverse conversion stored in the primary field.
    PrimaryDerived(f64),
    /// The product cannot invert; primary left as is.
    PrimaryUntouched,
}

/// Accessor pair tying a primary quantity field to its secondary field on `L`.
pub struct QuantityBinding<L> {
    primary_field: &'static str,
    secondary_field: &'static str,
    get_primary: fn(&L) -> f64,
    set_primary: fn(&mut L, f64),
    get_secondary: fn(&L) -> f64,
    set_secondary: fn(&mut L, f64),
    editable: bool,
}

impl<L> QuantityBinding<L> {
    /// Binding whose secondary field may be edited (and then drives the primary).
    pub const fn editable(
        primary_field: &'static str,
        secondary_field: &'static str,
        get_primary: fn(&L) -> f64,
        set_primary: fn(&mut L, f64),
        get_secondary: fn(&L) -> f64,
        set_secondary: fn(&mut L, f64),
    ) -> Self {
        Self {
            primary_field,
            secondary_field,
            get_primary,
            set_primary,
            get_secondary,
            set_secondary,
            editable: true,
        }
    }

    /// Binding whose secondary field is only ever derived.
    pub const fn derived(
        primary_field: &'static str,
        secondary_field: &'static str,
        get_primary: fn(&L) -> f64,
        set_primary: fn(&mut L, f64),
        get_secondary: fn(&L) -> f64,
        set_secondary: fn(&mut L, f64),
    ) -> Self {
        Self {
            primary_field,
            secondary_field,
            get_primary,
            set_primary,
            get_secondary,
            set_secondary,
            editable: false,
        }
    }

    pub fn primary_field(&self) -> &'static str {
        self.primary_field
    }

    pub fn secondary_field(&self) -> &'static str {
        self.secondary_field
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn primary(&self, line: &L) -> f64 {
        (self.get_primary)(line)
    }

    pub fn secondary(&self, line: &L) -> f64 {
        (self.get_secondary)(line)
    }

    /// Forward trigger: recompute the secondary from the current primary.
    pub fn recompute(&self, line: &mut L, settings: &SecondaryUom) -> SyncOutcome {
        let primary = (self.get_primary)(line);
        if !settings.is_enabled() {
            (self.set_secondary)(line, 0.0);
            debug!(field = self.secondary_field, "secondary UoM disabled, secondary cleared");
            return SyncOutcome::SecondaryCleared;
        }

        let secondary = settings.convert_to_secondary(primary);
        (self.set_secondary)(line, secondary);
        debug!(
            from = self.primary_field,
            to = self.secondary_field,
            primary,
            secondary,
            "secondary quantity recomputed"
        );
        SyncOutcome::SecondaryRecomputed(secondary)
    }

    /// Inverse trigger. The primary write is final: the forward trigger is
    /// deliberately not run afterwards.
    fn invert(&self, line: &mut L, settings: &SecondaryUom, secondary: f64) -> SyncOutcome {
        if !settings.converts() {
            // Keep the stored secondary in line with the untouched primary.
            self.recompute(line, settings);
            return SyncOutcome::PrimaryUntouched;
        }

        let secondary = settings.round_secondary(secondary);
        (self.set_secondary)(line, secondary);
        let primary = settings.convert_to_primary(secondary);
        (self.set_primary)(line, primary);
        debug!(
            from = self.secondary_field,
            to = self.primary_field,
            secondary,
            primary,
            "primary quantity derived"
        );
        SyncOutcome::PrimaryDerived(primary)
    }

    fn check_edit(&self, edit: LineEdit) -> DomainResult<()> {
        match edit {
            LineEdit::SetPrimary(qty) if !qty.is_finite() => Err(DomainError::validation(format!(
                "{} must be a finite number",
                self.primary_field
            ))),
            LineEdit::SetSecondary(qty) if !qty.is_finite() => Err(DomainError::validation(
                format!("{} must be a finite number", self.secondary_field),
            )),
            LineEdit::SetSecondary(_) if !self.editable => Err(DomainError::validation(format!(
                "{} is computed from {} and cannot be edited",
                self.secondary_field, self.primary_field
            ))),
            _ => Ok(()),
        }
    }
}

impl<L: SecondaryUomLine> QuantityBinding<L> {
    /// Apply one edit to `line` using the settings of `product`.
    ///
    /// `product` must be the line's product, except for
    /// [`LineEdit::ChangeProduct`] which rebinds the line to it. Nothing is
    /// written when the edit is rejected.
    pub fn apply(
        &self,
        line: &mut L,
        product: &ProductUomSnapshot,
        edit: LineEdit,
    ) -> DomainResult<SyncOutcome> {
        self.check_edit(edit)?;
        if edit != LineEdit::ChangeProduct && line.product_id() != product.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }

        line.set_product_id(product.product_id);
        line.set_secondary_unit(product.secondary.unit().cloned());

        let settings = &product.secondary;
        let outcome = match edit {
            LineEdit::SetPrimary(qty) => {
                (self.set_primary)(line, qty);
                self.recompute(line, settings)
            }
            LineEdit::SetSecondary(qty) => self.invert(line, settings, qty),
            LineEdit::ChangeProduct | LineEdit::Resync => self.recompute(line, settings),
        };
        Ok(outcome)
    }

    /// Fill the secondary side of a freshly built line.
    ///
    /// A value copied from an upstream document (`copied`) is kept as is when
    /// the product has secondary UoM enabled; otherwise the forward trigger runs.
    pub fn initialize(
        &self,
        line: &mut L,
        product: &ProductUomSnapshot,
        copied: Option<f64>,
    ) -> DomainResult<SyncOutcome> {
        if line.product_id() != product.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        let primary = (self.get_primary)(line);
        if !primary.is_finite() {
            return Err(DomainError::validation(format!(
                "{} must be a finite number",
                self.primary_field
            )));
        }
        line.set_secondary_unit(product.secondary.unit().cloned());

        match copied {
            Some(secondary) if product.secondary.is_enabled() && secondary.is_finite() => {
                (self.set_secondary)(line, secondary);
                if !product.secondary.is_consistent(primary, secondary) {
                    debug!(
                        field = self.secondary_field,
                        primary,
                        secondary,
                        "copied secondary quantity differs from conversion"
                    );
                }
                Ok(SyncOutcome::SecondaryRecomputed(secondary))
            }
            _ => Ok(self.recompute(line, &product.secondary)),
        }
    }
}
