//! Entity identifiers and the provider that mints them.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Identifier of an entity.
///
/// Rendered as a hyphenated lowercase UUID string in mappings and display output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new random identifier (UUIDv4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for EntityId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s).map_err(|e| ModelError::invalid_id(format!("{s}: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Source of fresh entity identifiers.
///
/// Production code uses [`RandomIdProvider`]; tests can substitute a
/// deterministic implementation.
pub trait IdProvider {
    fn next_id(&self) -> EntityId;
}

/// Identifier provider backed by random UUIDv4 values.
#[derive(Debug, Default, Copy, Clone)]
pub struct RandomIdProvider;

impl IdProvider for RandomIdProvider {
    fn next_id(&self) -> EntityId {
        EntityId::new()
    }
}
