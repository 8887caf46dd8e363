//! Test double for exercising the lifecycle without a real backend.

use std::collections::BTreeMap;

use crate::error::StoreResult;
use crate::kind::EntityKind;
use crate::record::Record;
use crate::storage::StorageEngine;

/// Records every registration and counts persists.
#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    pub registered: Vec<Record>,
    pub persists: usize,
}

impl StorageEngine for RecordingEngine {
    fn all(&self, kind: Option<EntityKind>) -> StoreResult<BTreeMap<String, Record>> {
        Ok(self
            .registered
            .iter()
            .filter(|r| kind.is_none_or(|k| r.kind() == k))
            .map(|r| (r.key().to_string(), r.clone()))
            .collect())
    }

    fn register(&mut self, record: Record) -> StoreResult<()> {
        self.registered.push(record);
        Ok(())
    }

    fn persist(&mut self) -> StoreResult<()> {
        self.persists += 1;
        Ok(())
    }

    fn delete(&mut self, record: Option<&Record>) -> StoreResult<()> {
        if let Some(record) = record {
            let key = record.key();
            self.registered.retain(|r| r.key() != key);
        }
        Ok(())
    }

    fn reload(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn close(&mut self) {}

    fn is_open(&self) -> bool {
        true
    }
}
