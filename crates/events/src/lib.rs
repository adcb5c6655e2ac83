//! Event contract shared by the domain crates.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
