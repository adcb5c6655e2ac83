use chrono::{DateTime, Utc};

/// A fact emitted by an aggregate.
///
/// Events are append-only and carry every derived value the aggregate computed
/// while handling the command, so a replay never has to recompute anything.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable dotted name, e.g. `"sales.order.line_synced"`.
    fn event_type(&self) -> &'static str;

    /// Schema version of this event type.
    fn version(&self) -> u32;

    /// Business time of the change.
    fn occurred_at(&self) -> DateTime<Utc>;
}
