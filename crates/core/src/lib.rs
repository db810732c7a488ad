//! `keystone-core` — base entity building blocks.
//!
//! Identity, timestamps and mapping serialization shared by every domain object.
//! No storage, no IO.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod model;
pub mod timestamp;

pub use clock::{Clock, SystemClock};
pub use entity::{Entity, Mapping, CLASS_KEY, CREATED_AT_KEY, ID_KEY, UPDATED_AT_KEY};
pub use error::{ModelError, ModelResult};
pub use id::{EntityId, IdProvider, RandomIdProvider};
pub use model::Model;
pub use timestamp::Timestamp;
