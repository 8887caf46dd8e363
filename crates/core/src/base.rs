//! Fields shared by every persisted record.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::id::RecordId;
use crate::timestamp;

/// Identity plus creation/modification timestamps.
///
/// Embedded (flattened) into every entity struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRecord {
    pub id: RecordId,
    #[serde(with = "timestamp::serde_canonical")]
    pub created_at: NaiveDateTime,
    #[serde(with = "timestamp::serde_canonical")]
    pub updated_at: NaiveDateTime,
}

impl BaseRecord {
    /// Fresh identity, both timestamps set to now.
    pub fn new() -> Self {
        let now = timestamp::now();
        Self {
            id: RecordId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`, never letting it fall behind `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = timestamp::now().max(self.created_at);
    }
}

impl Default for BaseRecord {
    fn default() -> Self {
        Self::new()
    }
}
