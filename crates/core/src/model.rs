//! Model trait: the common surface of every entity variant.

use serde_json::Value;

use crate::entity::{Entity, Mapping};
use crate::error::{ModelError, ModelResult};
use crate::id::EntityId;
use crate::timestamp::Timestamp;

/// A concrete entity variant.
///
/// Variants embed an [`Entity`] for identity and timestamps and contribute their
/// own named fields through [`Model::fields`]. Everything else is provided.
///
/// ```ignore
/// struct User { entity: Entity, email: String }
///
/// impl Model for User {
///     const CLASS_NAME: &'static str = "User";
///     fn entity(&self) -> &Entity { &self.entity }
///     fn entity_mut(&mut self) -> &mut Entity { &mut self.entity }
///     fn fields(&self) -> Mapping {
///         let mut m = Mapping::new();
///         m.insert("email".into(), self.email.clone().into());
///         m
///     }
/// }
/// ```
pub trait Model {
    /// Type tag written to `__class__`.
    const CLASS_NAME: &'static str;

    fn entity(&self) -> &Entity;

    fn entity_mut(&mut self) -> &mut Entity;

    /// Variant-specific fields, in the order they should be serialized.
    fn fields(&self) -> Mapping {
        Mapping::new()
    }

    fn id(&self) -> EntityId {
        self.entity().id()
    }

    fn created_at(&self) -> Timestamp {
        self.entity().created_at()
    }

    fn updated_at(&self) -> Timestamp {
        self.entity().updated_at()
    }

    /// Set `updated_at` to the current local time.
    fn save(&mut self) {
        self.entity_mut().save();
    }

    /// Attach an extra attribute to the instance.
    ///
    /// Names already used by [`Model::fields`] are rejected along with the
    /// entity's own keys, so every attribute set here shows up in the mapping.
    fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) -> ModelResult<()> {
        let name = name.into();
        if self.fields().contains_key(&name) {
            return Err(ModelError::reserved(name));
        }
        self.entity_mut().set_attribute(name, value)
    }

    /// Every field currently set on the instance plus the `__class__` tag.
    fn to_mapping(&self) -> Mapping {
        self.entity().to_mapping_with(Self::CLASS_NAME, self.fields())
    }

    /// `[<class>] (<id>) <fields>`, with the fields rendered as a JSON object.
    fn to_display_string(&self) -> String {
        let fields = self.entity().instance_fields(self.fields());
        format!(
            "[{}] ({}) {}",
            Self::CLASS_NAME,
            self.id(),
            serde_json::Value::Object(fields)
        )
    }

    /// Key under which a storage layer indexes this object: `<class>.<id>`.
    fn storage_key(&self) -> String {
        format!("{}.{}", Self::CLASS_NAME, self.id())
    }
}

impl Model for Entity {
    const CLASS_NAME: &'static str = "Entity";

    fn entity(&self) -> &Entity {
        self
    }

    fn entity_mut(&mut self) -> &mut Entity {
        self
    }
}

impl core::fmt::Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_display_string())
    }
}
