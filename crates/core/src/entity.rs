//! Entity trait: identity that survives state changes.

/// Something identified by an id rather than by its values, e.g. a document
/// line identified by its line number inside an order.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
