//! Unit of work for the relational backend.
//!
//! Registrations and deletions accumulate here until the next commit. Reads
//! overlay the pending state on top of what the database returns, so callers
//! see their own uncommitted changes.

use std::collections::{BTreeMap, BTreeSet};

use hbnb_core::{EntityKind, Record, RecordKey, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct Session {
    pending: BTreeMap<RecordKey, Record>,
    deleted: BTreeSet<RecordKey>,
}

impl Session {
    /// Stage a record for upsert. A later registration of the same key
    /// replaces the staged snapshot.
    pub fn add(&mut self, record: Record) -> StoreResult<()> {
        let key = record.key();
        if let Some(existing) = self
            .pending
            .keys()
            .find(|k| k.id == key.id && k.kind != key.kind)
        {
            return Err(StoreError::conflict(format!(
                "identity {} is already registered as {existing}",
                key.id
            )));
        }
        self.deleted.remove(&key);
        self.pending.insert(key, record);
        Ok(())
    }

    /// Stage a deletion, returning the upsert it cancels (if any).
    pub fn mark_deleted(&mut self, key: RecordKey) -> Option<Record> {
        let cancelled = self.pending.remove(&key);
        self.deleted.insert(key);
        cancelled
    }

    /// Undo [`Session::mark_deleted`] after a failed commit.
    pub fn unmark_deleted(&mut self, key: &RecordKey, cancelled: Option<Record>) {
        self.deleted.remove(key);
        if let Some(record) = cancelled {
            self.pending.insert(key.clone(), record);
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty() || !self.deleted.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Record> {
        self.pending.values()
    }

    pub fn deleted(&self) -> impl Iterator<Item = &RecordKey> {
        self.deleted.iter()
    }

    /// Forget everything staged; called once a commit succeeded.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deleted.clear();
    }

    /// Apply staged state to a map of committed records (keyed `kind.id`).
    pub fn overlay(&self, records: &mut BTreeMap<String, Record>, kind: Option<EntityKind>) {
        let wanted = |key: &RecordKey| kind.is_none_or(|k| key.kind == k);
        for key in self.deleted.iter().filter(|k| wanted(k)) {
            records.remove(&key.to_string());
        }
        for (key, record) in self.pending.iter().filter(|(k, _)| wanted(k)) {
            records.insert(key.to_string(), record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbnb_core::{Amenity, City, Entity, State};

    fn state(name: &str) -> State {
        State {
            name: name.to_string(),
            ..State::default()
        }
    }

    #[test]
    fn overlay_shows_pending_and_hides_deleted() {
        let kept = state("Kept");
        let gone = state("Gone");
        let fresh = state("Fresh");
        let mut committed = BTreeMap::new();
        committed.insert(kept.key().to_string(), Record::from(kept.clone()));
        committed.insert(gone.key().to_string(), Record::from(gone.clone()));

        let mut session = Session::default();
        session.add(fresh.clone().into()).unwrap();
        session.mark_deleted(gone.key());
        session.overlay(&mut committed, Some(EntityKind::State));

        assert_eq!(committed.len(), 2);
        assert!(committed.contains_key(&kept.key().to_string()));
        assert!(committed.contains_key(&fresh.key().to_string()));
    }

    #[test]
    fn overlay_respects_kind_filter() {
        let mut session = Session::default();
        session.add(state("Ohio").into()).unwrap();
        session.add(Amenity::default().into()).unwrap();

        let mut records = BTreeMap::new();
        session.overlay(&mut records, Some(EntityKind::Amenity));
        assert_eq!(records.len(), 1);
        assert!(records.keys().all(|k| k.starts_with("amenity.")));
    }

    #[test]
    fn cross_kind_identity_conflicts() {
        let ohio = state("Ohio");
        let impostor = City {
            base: ohio.base.clone(),
            ..City::default()
        };
        let mut session = Session::default();
        session.add(ohio.into()).unwrap();
        assert!(matches!(session.add(impostor.into()), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn unmark_restores_cancelled_upsert() {
        let ohio = state("Ohio");
        let mut session = Session::default();
        session.add(ohio.clone().into()).unwrap();

        let cancelled = session.mark_deleted(ohio.key());
        assert_eq!(session.pending().count(), 0);
        assert_eq!(session.deleted().count(), 1);

        session.unmark_deleted(&ohio.key(), cancelled);
        assert_eq!(session.deleted().count(), 0);
        assert_eq!(session.pending().next(), Some(&Record::from(ohio)));
    }

    #[test]
    fn readding_a_deleted_key_cancels_the_delete() {
        let ohio = state("Ohio");
        let mut session = Session::default();
        session.mark_deleted(ohio.key());
        session.add(ohio.into()).unwrap();
        assert_eq!(session.deleted().count(), 0);
        assert!(session.is_dirty());
        session.clear();
        assert!(!session.is_dirty());
    }
}
