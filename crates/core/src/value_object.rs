//! Value object marker.

/// Immutable value compared by its attributes.
///
/// Units of measure and secondary UoM settings are value objects: two units
/// with the same name, category, factor and rounding are the same unit.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
