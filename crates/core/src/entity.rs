//! Entity trait: the lifecycle every record kind shares.
//!
//! Construction, reconstruction, persistence, rendering and serialization are
//! implemented once here as provided methods. A kind only supplies access to
//! its embedded [`BaseRecord`] and its [`EntityKind`].
//!
//! There is no process-wide engine: every call that reaches storage takes the
//! engine handle explicitly.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::base::BaseRecord;
use crate::error::{StoreError, StoreResult};
use crate::id::{RecordId, RecordKey};
use crate::kind::EntityKind;
use crate::record::Record;
use crate::storage::StorageEngine;
use crate::timestamp;

/// Transport dictionary: a flat JSON object.
pub type Fields = serde_json::Map<String, Value>;

/// Reconstruction-marker key naming the kind a dictionary rehydrates into.
pub const KIND_MARKER: &str = "__kind__";

const ID: &str = "id";
const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

/// A persisted domain record.
///
/// `Default` must produce a blank record with a fresh [`BaseRecord`].
pub trait Entity:
    Clone + Default + core::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Into<Record>
{
    const KIND: EntityKind;

    fn base(&self) -> &BaseRecord;

    fn base_mut(&mut self) -> &mut BaseRecord;

    /// Unwrap a [`Record`] holding this kind.
    fn from_record(record: Record) -> Option<Self>;

    fn id(&self) -> &RecordId {
        &self.base().id
    }

    fn key(&self) -> RecordKey {
        RecordKey::new(Self::KIND, self.id().clone())
    }

    /// Create a fresh record from keyword fields and register it.
    ///
    /// Identity and timestamps are always freshly generated; `id`,
    /// `created_at`, `updated_at` and the kind marker in `fields` are ignored.
    /// Unknown keys are ignored, mistyped ones are a [`StoreError::Format`].
    fn create(engine: &mut dyn StorageEngine, mut fields: Fields) -> StoreResult<Self> {
        for reserved in [ID, CREATED_AT, UPDATED_AT, KIND_MARKER] {
            fields.remove(reserved);
        }
        match serde_json::to_value(BaseRecord::new()) {
            Ok(Value::Object(base)) => fields.extend(base),
            _ => return Err(StoreError::format("base record did not serialize to an object")),
        }

        let record: Self = serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::format(format!("{}: {e}", Self::KIND)))?;
        engine.register(record.clone().into())?;
        Ok(record)
    }

    /// Typed variant of [`Entity::create`]: start blank, let `init` fill in
    /// fields, register.
    fn create_with(
        engine: &mut dyn StorageEngine,
        init: impl FnOnce(&mut Self),
    ) -> StoreResult<Self> {
        let mut record = Self::default();
        init(&mut record);
        engine.register(record.clone().into())?;
        Ok(record)
    }

    /// Rebuild a record from its serialized form. Does not register it.
    fn reconstruct(dict: &Fields) -> StoreResult<Self> {
        let kind = marker_kind(dict)?;
        if kind != Self::KIND {
            return Err(StoreError::format(format!(
                "dictionary is marked '{kind}', expected '{}'",
                Self::KIND
            )));
        }
        require_base_fields(dict)?;

        let mut fields = dict.clone();
        fields.remove(KIND_MARKER);
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::format(format!("{}: {e}", Self::KIND)))
    }

    /// Refresh `updated_at`, hand the new snapshot to the engine and persist.
    fn save(&mut self, engine: &mut dyn StorageEngine) -> StoreResult<()> {
        self.base_mut().touch();
        engine.register(self.clone().into())?;
        engine.persist()
    }

    /// Serialize to the transport dictionary (inverse of [`Entity::reconstruct`]).
    fn to_dict(&self) -> StoreResult<Fields> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.insert(KIND_MARKER.to_string(), Value::from(Self::KIND.as_str()));
                Ok(map)
            }
            Ok(other) => Err(StoreError::format(format!(
                "{} serialized to a non-object value: {other}",
                Self::KIND
            ))),
            Err(e) => Err(StoreError::format(format!("{}: {e}", Self::KIND))),
        }
    }

    /// `[ClassName] (id) {fields}`.
    fn render(&self) -> String {
        let fields = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("[{}] ({}) {}", Self::KIND.class_name(), self.id(), fields)
    }
}

/// Read the reconstruction marker of a serialized dictionary.
pub fn marker_kind(dict: &Fields) -> StoreResult<EntityKind> {
    match dict.get(KIND_MARKER) {
        Some(Value::String(name)) => name.parse(),
        Some(other) => Err(StoreError::format(format!(
            "{KIND_MARKER} must be a string, got {other}"
        ))),
        None => Err(StoreError::format(format!("missing {KIND_MARKER} marker"))),
    }
}

fn require_base_fields(dict: &Fields) -> StoreResult<()> {
    match dict.get(ID) {
        Some(Value::String(id)) if !id.is_empty() => {}
        _ => return Err(StoreError::format("missing or empty id")),
    }
    for field in [CREATED_AT, UPDATED_AT] {
        match dict.get(field) {
            Some(Value::String(text)) => {
                timestamp::parse(field, text)?;
            }
            Some(other) => {
                return Err(StoreError::format(format!(
                    "{field} must be a canonical timestamp string, got {other}"
                )));
            }
            None => return Err(StoreError::format(format!("missing {field}"))),
        }
    }
    Ok(())
}
