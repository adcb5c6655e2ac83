//! Products domain module (event-sourced).
//!
//! Units of measure, the secondary UoM conversion core attached to a product,
//! and the synchronizer document lines use to keep primary and secondary
//! quantities consistent. Pure domain logic: no IO, no storage.

pub mod product;
pub mod rounding;
pub mod secondary;
pub mod sync;
pub mod uom;

pub use product::{
    ChangeUnitOfMeasure, ConfigureSecondaryUom, CreateProduct, DisableSecondaryUom, Product,
    ProductCommand, ProductCreated, ProductEvent, ProductId, ProductUomSnapshot,
    SecondaryUomConfigured, SecondaryUomDisabled, UnitOfMeasureChanged,
};
pub use rounding::{DEFAULT_PRECISION, float_compare, float_is_zero, float_round};
pub use secondary::{ConfigurationError, SecondaryTracking, SecondaryUom, suggest_ratio};
pub use sync::{LineEdit, QuantityBinding, SecondaryUomLine, SyncOutcome};
pub use uom::{UnitOfMeasure, UomCategory, UomType};
