//! Base entity: identity, timestamps and an open attribute bag.
//!
//! Variants embed an [`Entity`] and describe themselves through the
//! [`Model`](crate::model::Model) trait. `Entity` carries no locking; sharing
//! one instance across threads for mutation needs external synchronization.

use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::error::{ModelError, ModelResult};
use crate::id::{EntityId, IdProvider, RandomIdProvider};
use crate::timestamp::Timestamp;

/// Ordered field-name → value mapping produced by serialization.
pub type Mapping = serde_json::Map<String, Value>;

pub const ID_KEY: &str = "id";
pub const CREATED_AT_KEY: &str = "created_at";
pub const UPDATED_AT_KEY: &str = "updated_at";
pub const CLASS_KEY: &str = "__class__";

const RESERVED_KEYS: [&str; 4] = [ID_KEY, CREATED_AT_KEY, UPDATED_AT_KEY, CLASS_KEY];

/// Uniquely identified, timestamped record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    created_at: Timestamp,
    updated_at: Timestamp,
    attributes: Mapping,
}

impl Entity {
    /// Create an entity with a random id, stamped with the local wall clock.
    pub fn new() -> Self {
        Self::with_providers(&RandomIdProvider, &SystemClock)
    }

    /// Create an entity using explicit id and time sources.
    ///
    /// Both timestamps come from a single clock read, so they start out equal.
    pub fn with_providers(ids: &dyn IdProvider, clock: &dyn Clock) -> Self {
        let now = clock.now();
        let entity = Self {
            id: ids.next_id(),
            created_at: now,
            updated_at: now,
            attributes: Mapping::new(),
        };
        tracing::debug!(id = %entity.id, created_at = %now, "entity created");
        entity
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Touch the entity: set `updated_at` to the current local time.
    pub fn save(&mut self) {
        self.save_with(&SystemClock);
    }

    /// Touch the entity against an explicit clock.
    ///
    /// A clock that reads earlier than the previous `updated_at` is honored as-is.
    pub fn save_with(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        if now < self.updated_at {
            tracing::warn!(
                id = %self.id,
                previous = %self.updated_at,
                now = %now,
                "clock moved backwards while saving entity"
            );
        }
        self.updated_at = now;
        tracing::debug!(id = %self.id, updated_at = %now, "entity saved");
    }

    pub fn attributes(&self) -> &Mapping {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attach or replace a named attribute. Replacing keeps its original position.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) -> ModelResult<()> {
        let name = name.into();
        if is_reserved(&name) {
            return Err(ModelError::reserved(name));
        }
        self.attributes.insert(name, value.into());
        Ok(())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.shift_remove(name)
    }

    /// Serialize with the given type tag and variant-specific fields.
    ///
    /// Key order: `id`, `created_at`, `updated_at`, variant fields, remaining
    /// attributes, `__class__`. Variant fields shadow attributes of the same name;
    /// reserved keys in `fields` are ignored.
    pub fn to_mapping_with(&self, class_name: &str, fields: Mapping) -> Mapping {
        let mut map = self.instance_fields(fields);
        map.insert(CLASS_KEY.to_string(), Value::String(class_name.to_string()));
        map
    }

    /// Instance fields without the type tag, in serialization order.
    pub(crate) fn instance_fields(&self, fields: Mapping) -> Mapping {
        let mut map = Mapping::new();
        map.insert(ID_KEY.to_string(), Value::String(self.id.to_string()));
        map.insert(CREATED_AT_KEY.to_string(), Value::String(self.created_at.to_iso_string()));
        map.insert(UPDATED_AT_KEY.to_string(), Value::String(self.updated_at.to_iso_string()));

        for (key, value) in fields {
            if !is_reserved(&key) {
                map.insert(key, value);
            }
        }
        for (key, value) in &self.attributes {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }

    /// Rebuild an entity from a mapping produced by `to_mapping`.
    ///
    /// `id`, `created_at` and `updated_at` are required and `updated_at` may not
    /// precede `created_at`; `__class__` is dropped and every other key becomes an
    /// attribute, in mapping order.
    pub fn from_mapping(map: &Mapping) -> ModelResult<Self> {
        let id = required_str(map, ID_KEY)?.parse::<EntityId>()?;
        let created_at = required_timestamp(map, CREATED_AT_KEY)?;
        let updated_at = required_timestamp(map, UPDATED_AT_KEY)?;
        if updated_at < created_at {
            return Err(ModelError::invalid_field(UPDATED_AT_KEY, "earlier than created_at"));
        }

        let attributes = map
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            id,
            created_at,
            updated_at,
            attributes,
        })
    }

    /// Like [`Entity::from_mapping`], but a `__class__` tag, when present, must
    /// equal `class_name`.
    pub fn from_mapping_as(map: &Mapping, class_name: &str) -> ModelResult<Self> {
        if let Some(tag) = map.get(CLASS_KEY) {
            let found = tag
                .as_str()
                .ok_or_else(|| ModelError::invalid_field(CLASS_KEY, "expected a string"))?;
            if found != class_name {
                return Err(ModelError::ClassMismatch {
                    expected: class_name.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Self::from_mapping(map)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

fn required_str<'a>(map: &'a Mapping, field: &str) -> ModelResult<&'a str> {
    map.get(field)
        .ok_or_else(|| ModelError::missing(field))?
        .as_str()
        .ok_or_else(|| ModelError::invalid_field(field, "expected a string"))
}

fn required_timestamp(map: &Mapping, field: &str) -> ModelResult<Timestamp> {
    let raw = required_str(map, field)?;
    Timestamp::parse_iso(raw).map_err(|_| ModelError::invalid_timestamp(field, raw))
}


#[cfg(test)]
mod tests {
    use super::test_support::{ManualClock, SequentialIds};
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn fixed_entity(clock: &ManualClock) -> Entity {
        Entity::with_providers(&SequentialIds::default(), clock)
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` under a WARN-level subscriber and return what it wrote.
    fn capture_warnings(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let sink = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn new_entities_get_distinct_ids() {
        let a = Entity::new();
        let b = Entity::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn timestamps_start_equal() {
        let e = Entity::new();
        assert_eq!(e.created_at(), e.updated_at());
    }

    #[test]
    fn save_moves_updated_at_only() {
        let clock = ManualClock::at(10, 0, 0, 0);
        let mut e = fixed_entity(&clock);
        let t0 = e.created_at();

        clock.advance_micros(1_500);
        e.save_with(&clock);

        assert_eq!(e.created_at(), t0);
        assert!(e.updated_at() > t0);
        assert_eq!(e.updated_at(), clock.now());
    }

    #[test]
    fn save_on_system_clock_keeps_ordering() {
        let mut e = Entity::new();
        let before = e.updated_at();
        e.save();
        assert!(e.updated_at() >= before);
        assert!(e.updated_at() >= e.created_at());
    }

    #[test]
    fn save_honors_clock_rollback() {
        let clock = ManualClock::at(10, 0, 0, 0);
        let mut e = fixed_entity(&clock);
        clock.advance_micros(-1_000_000);
        e.save_with(&clock);
        assert_eq!(e.updated_at(), clock.now());
    }

    #[test]
    fn rollback_is_logged_as_warning() {
        let clock = ManualClock::at(10, 0, 0, 0);
        let mut e = fixed_entity(&clock);

        let forward = capture_warnings(|| {
            clock.advance_micros(5);
            e.save_with(&clock);
        });
        assert!(forward.is_empty(), "unexpected output: {forward}");

        let backward = capture_warnings(|| {
            clock.advance_micros(-1_000_000);
            e.save_with(&clock);
        });
        assert!(backward.contains("WARN"));
        assert!(backward.contains("clock moved backwards while saving entity"));
    }

    #[test]
    fn mapping_scenario() {
        let clock = ManualClock::at(12, 30, 15, 250_000);
        let mut e = fixed_entity(&clock);
        let t0 = e.created_at();
        clock.advance_micros(2_000_000);
        e.save_with(&clock);
        let t1 = clock.now();

        let map = e.to_mapping_with("Entity", Mapping::new());
        assert_eq!(map[CLASS_KEY], json!("Entity"));
        assert_eq!(map[ID_KEY], json!("00000000-0000-0000-0000-000000000001"));
        assert_eq!(map[CREATED_AT_KEY], json!(t0.to_iso_string()));
        assert_eq!(map[UPDATED_AT_KEY], json!(t1.to_iso_string()));
        assert_eq!(map[CREATED_AT_KEY], json!("2017-09-28T12:30:15.250000"));
        assert_eq!(map[UPDATED_AT_KEY], json!("2017-09-28T12:30:17.250000"));
    }

    #[test]
    fn mapping_orders_keys() {
        let clock = ManualClock::at(1, 2, 3, 0);
        let mut e = fixed_entity(&clock);
        e.set_attribute("name", "My First Model").unwrap();
        e.set_attribute("my_number", 89).unwrap();

        let mut fields = Mapping::new();
        fields.insert("kind".into(), json!("box"));
        fields.insert("name".into(), json!("shadowed"));

        let keys: Vec<_> = e.to_mapping_with("Entity", fields.clone()).keys().cloned().collect();
        assert_eq!(
            keys,
            ["id", "created_at", "updated_at", "kind", "name", "my_number", "__class__"]
        );
        assert_eq!(e.to_mapping_with("Entity", fields)["name"], json!("shadowed"));
    }

    #[test]
    fn reserved_fields_cannot_be_overridden() {
        let mut e = Entity::new();
        for key in RESERVED_KEYS {
            assert_eq!(e.set_attribute(key, "x"), Err(ModelError::reserved(key)));
        }

        let mut fields = Mapping::new();
        fields.insert(ID_KEY.into(), json!("forged"));
        let map = e.to_mapping_with("Entity", fields);
        assert_eq!(map[ID_KEY], json!(e.id().to_string()));
    }

    #[test]
    fn attributes_can_be_replaced_and_removed() {
        let mut e = Entity::new();
        e.set_attribute("a", 1).unwrap();
        e.set_attribute("b", 2).unwrap();
        e.set_attribute("a", 3).unwrap();

        let keys: Vec<_> = e.attributes().keys().cloned().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(e.attribute("a"), Some(&json!(3)));

        assert_eq!(e.remove_attribute("a"), Some(json!(3)));
        assert_eq!(e.attribute("a"), None);
    }

    #[test]
    fn from_mapping_restores_entity() {
        let clock = ManualClock::at(9, 15, 0, 17);
        let mut e = fixed_entity(&clock);
        e.set_attribute("name", "restored").unwrap();
        clock.advance_micros(10);
        e.save_with(&clock);

        let map = e.to_mapping_with("Entity", Mapping::new());
        let back = Entity::from_mapping(&map).unwrap();
        assert_eq!(back, e);
        assert!(back.attribute(CLASS_KEY).is_none());
    }

    #[test]
    fn from_mapping_reports_missing_and_malformed_fields() {
        let e = Entity::new();
        let good = e.to_mapping_with("Entity", Mapping::new());

        let mut missing = good.clone();
        missing.shift_remove(CREATED_AT_KEY);
        assert_eq!(
            Entity::from_mapping(&missing),
            Err(ModelError::missing(CREATED_AT_KEY))
        );

        let mut wrong_type = good.clone();
        wrong_type.insert(ID_KEY.into(), json!(42));
        assert!(matches!(
            Entity::from_mapping(&wrong_type),
            Err(ModelError::InvalidField { .. })
        ));

        let mut bad_id = good.clone();
        bad_id.insert(ID_KEY.into(), json!("nope"));
        assert!(matches!(Entity::from_mapping(&bad_id), Err(ModelError::InvalidId(_))));

        let mut bad_time = good.clone();
        bad_time.insert(UPDATED_AT_KEY.into(), json!("2017-13-45"));
        assert_eq!(
            Entity::from_mapping(&bad_time),
            Err(ModelError::invalid_timestamp(UPDATED_AT_KEY, "2017-13-45"))
        );

        let mut reversed = good;
        reversed.insert(CREATED_AT_KEY.into(), json!("2020-01-02T00:00:00"));
        reversed.insert(UPDATED_AT_KEY.into(), json!("2020-01-01T00:00:00"));
        assert_eq!(
            Entity::from_mapping(&reversed),
            Err(ModelError::invalid_field(UPDATED_AT_KEY, "earlier than created_at"))
        );
    }

    #[test]
    fn from_mapping_as_checks_class_tag() {
        let e = Entity::new();
        let map = e.to_mapping_with("Entity", Mapping::new());

        assert!(Entity::from_mapping_as(&map, "Entity").is_ok());
        assert_eq!(
            Entity::from_mapping_as(&map, "User"),
            Err(ModelError::ClassMismatch {
                expected: "User".into(),
                found: "Entity".into(),
            })
        );

        let mut untagged = map;
        untagged.shift_remove(CLASS_KEY);
        assert!(Entity::from_mapping_as(&untagged, "User").is_ok());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: saving never alters identity or creation time.
            #[test]
            fn save_preserves_identity(steps in proptest::collection::vec(0i64..5_000_000, 1..20)) {
                let clock = ManualClock::at(0, 0, 0, 0);
                let mut e = fixed_entity(&clock);
                let (id, created) = (e.id(), e.created_at());

                for step in steps {
                    let before = e.updated_at();
                    clock.advance_micros(step);
                    e.save_with(&clock);
                    prop_assert!(e.updated_at() >= before);
                    prop_assert_eq!(e.id(), id);
                    prop_assert_eq!(e.created_at(), created);
                }
            }

            /// Property: serialized timestamps parse back to the originals.
            #[test]
            fn mapping_timestamps_parse_back(h in 0u32..24, m in 0u32..60, s in 0u32..60, micro in 0u32..1_000_000) {
                let clock = ManualClock::at(h, m, s, micro);
                let e = fixed_entity(&clock);
                let map = e.to_mapping_with("Entity", Mapping::new());

                let created = Timestamp::parse_iso(map[CREATED_AT_KEY].as_str().unwrap()).unwrap();
                let updated = Timestamp::parse_iso(map[UPDATED_AT_KEY].as_str().unwrap()).unwrap();
                prop_assert_eq!(created, e.created_at());
                prop_assert_eq!(updated, e.updated_at());
            }

            /// Property: arbitrary attributes survive a mapping round trip in order.
            #[test]
            fn attributes_survive_round_trip(
                attrs in proptest::collection::vec(("[a-z][a-z_]{0,11}", any::<i64>()), 0..10)
            ) {
                let mut e = Entity::new();
                for (name, value) in &attrs {
                    if !is_reserved(name) {
                        e.set_attribute(name.clone(), *value).unwrap();
                    }
                }
                let back = Entity::from_mapping(&e.to_mapping_with("Entity", Mapping::new())).unwrap();
                prop_assert_eq!(back, e);
            }
        }
    }
}
