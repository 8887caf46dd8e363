//! Record identities and composite identity-map keys.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::kind::EntityKind;

/// Opaque, globally unique record identity.
///
/// Fresh identities are UUIDv4 text, but any non-empty string is accepted on
/// reconstruction (identities are never parsed, only compared).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a new identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity-map key: `(kind, id)`, rendered as `kind.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub kind: EntityKind,
    pub id: RecordId,
}

impl RecordKey {
    pub fn new(kind: EntityKind, id: RecordId) -> Self {
        Self { kind, id }
    }
}

impl core::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

impl FromStr for RecordKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('.')
            .ok_or_else(|| StoreError::format(format!("record key '{s}' is not of the form kind.id")))?;
        if id.is_empty() {
            return Err(StoreError::format(format!("record key '{s}' has an empty identity")));
        }
        Ok(Self::new(kind.parse()?, RecordId::from(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique_and_non_empty() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert!(!a.as_str().is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn key_text_form_round_trips() {
        let key = RecordKey::new(EntityKind::State, RecordId::from("abc123"));
        assert_eq!(key.to_string(), "state.abc123");
        assert_eq!("State.abc123".parse::<RecordKey>().unwrap(), key);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(matches!("state".parse::<RecordKey>(), Err(StoreError::Format(_))));
        assert!(matches!("state.".parse::<RecordKey>(), Err(StoreError::Format(_))));
        assert!(matches!("widget.1".parse::<RecordKey>(), Err(StoreError::Format(_))));
    }
}
