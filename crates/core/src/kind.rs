//! The fixed set of entity kinds.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Logical type of a persisted record.
///
/// Partitions the identity map and routes relational queries to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Place,
    City,
    State,
    Amenity,
    Review,
}

impl EntityKind {
    /// Every kind, in a stable order.
    pub const ALL: [EntityKind; 6] = [
        Self::User,
        Self::Place,
        Self::City,
        Self::State,
        Self::Amenity,
        Self::Review,
    ];

    /// Kind name used in composite keys and as the reconstruction marker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Place => "place",
            Self::City => "city",
            Self::State => "state",
            Self::Amenity => "amenity",
            Self::Review => "review",
        }
    }

    /// Type name used by the human-readable render form.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Place => "Place",
            Self::City => "City",
            Self::State => "State",
            Self::Amenity => "Amenity",
            Self::Review => "Review",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts either the kind name (`city`) or the class name (`City`).
impl FromStr for EntityKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StoreError::format(format!("unknown entity kind '{s}'")))
    }
}

impl TryFrom<&str> for EntityKind {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_class_name_select_the_same_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
            assert_eq!(kind.class_name().parse::<EntityKind>().unwrap(), kind);
        }
        assert_eq!(EntityKind::try_from("AMENITY").unwrap(), EntityKind::Amenity);
    }

    #[test]
    fn unknown_kind_is_a_format_error() {
        let err = "BaseModel".parse::<EntityKind>().unwrap_err();
        assert!(matches!(err, StoreError::Format(msg) if msg.contains("BaseModel")));
    }

    #[test]
    fn serde_uses_kind_name() {
        let json = serde_json::to_string(&EntityKind::Review).unwrap();
        assert_eq!(json, "\"review\"");
    }
}
