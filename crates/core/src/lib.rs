//! `uomsync-core`: shared domain building blocks.
//!
//! Pure domain primitives only. Nothing here touches storage, the network or
//! the clock.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, TenantId};
pub use value_object::ValueObject;
