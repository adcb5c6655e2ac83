//! Process-wide tracing setup.

pub mod tracing;

pub use crate::tracing::{LogFormat, ObservabilityConfig, init, init_with};
