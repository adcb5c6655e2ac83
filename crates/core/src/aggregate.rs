//! Aggregate traits shared by every event-sourced domain model.

/// Identity and version of an aggregate root.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far.
    fn version(&self) -> u64;
}

/// Decide/evolve split for event-sourced aggregates.
///
/// - `handle(&self, cmd)` validates a command against current state and returns
///   the events it produces. It never mutates.
/// - `apply(&mut self, event)` folds one event into state and bumps the version.
///
/// Both are deterministic and free of IO. Any derived value (such as a secondary
/// quantity) is computed in `handle` and carried by the event, so replaying the
/// stream restores exactly what was persisted.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
