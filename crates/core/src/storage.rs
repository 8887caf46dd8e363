//! Storage engine boundary.
//!
//! This module defines the contract every backend implements, so entity code
//! can be written once against it regardless of where records end up.

use std::collections::BTreeMap;

use crate::entity::Entity;
use crate::error::StoreResult;
use crate::id::{RecordId, RecordKey};
use crate::kind::EntityKind;
use crate::record::Record;

/// Identity-mapped object store.
///
/// ## Identity map
///
/// Records are keyed by `(kind, id)`; the text form of that key (`kind.id`) is
/// the key of every map returned by [`StorageEngine::all`]. An identity is
/// unique across kinds: registering an identity already known under another
/// kind is a `Conflict`. Registering the same `(kind, id)` again replaces the
/// pending snapshot (last registration wins).
///
/// ## Resource lifecycle
///
/// Unopened → Open (`reload`) → Closed (`close`). `reload` on a closed engine
/// re-opens it. `all`, `register`, `persist` and `delete` fail with
/// `Resource` outside the Open state; there is no implicit open.
///
/// ## Visibility
///
/// `all` reflects every prior `register`, persisted or not, and never returns
/// deleted records.
///
/// ## Concurrency
///
/// No internal locking: mutating operations take `&mut self` and callers
/// serialize access externally (one engine per worker, or a mutex).
pub trait StorageEngine: Send {
    /// Every known record of `kind` (or of every kind), keyed `kind.id`.
    fn all(&self, kind: Option<EntityKind>) -> StoreResult<BTreeMap<String, Record>>;

    /// Make a record known to the engine without persisting it.
    fn register(&mut self, record: Record) -> StoreResult<()>;

    /// Flush all pending changes to durable storage as one unit.
    fn persist(&mut self) -> StoreResult<()>;

    /// Remove a record durably (persists before returning). `None` is a no-op.
    fn delete(&mut self, record: Option<&Record>) -> StoreResult<()>;

    /// (Re)open the connection/session and ensure the storage structure exists.
    fn reload(&mut self) -> StoreResult<()>;

    /// Release the connection/session. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Look up one record by kind and identity.
    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>> {
        let key = RecordKey::new(kind, id.clone()).to_string();
        Ok(self.all(Some(kind))?.remove(&key))
    }

    /// Number of known records of `kind` (or of every kind).
    fn count(&self, kind: Option<EntityKind>) -> StoreResult<usize> {
        Ok(self.all(kind)?.len())
    }
}

/// Typed helpers available on every engine, including `dyn StorageEngine`.
pub trait StorageEngineExt: StorageEngine {
    /// [`StorageEngine::all`] narrowed to one concrete entity type.
    fn all_of<E: Entity>(&self) -> StoreResult<BTreeMap<String, E>> {
        Ok(self
            .all(Some(E::KIND))?
            .into_iter()
            .filter_map(|(key, record)| record.into_entity::<E>().map(|e| (key, e)))
            .collect())
    }

    /// [`StorageEngine::get`] narrowed to one concrete entity type.
    fn get_of<E: Entity>(&self, id: &RecordId) -> StoreResult<Option<E>> {
        Ok(self.get(E::KIND, id)?.and_then(Record::into_entity::<E>))
    }
}

impl<S: StorageEngine + ?Sized> StorageEngineExt for S {}

impl<S> StorageEngine for Box<S>
where
    S: StorageEngine + ?Sized,
{
    fn all(&self, kind: Option<EntityKind>) -> StoreResult<BTreeMap<String, Record>> {
        (**self).all(kind)
    }

    fn register(&mut self, record: Record) -> StoreResult<()> {
        (**self).register(record)
    }

    fn persist(&mut self) -> StoreResult<()> {
        (**self).persist()
    }

    fn delete(&mut self, record: Option<&Record>) -> StoreResult<()> {
        (**self).delete(record)
    }

    fn reload(&mut self) -> StoreResult<()> {
        (**self).reload()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn get(&self, kind: EntityKind, id: &RecordId) -> StoreResult<Option<Record>> {
        (**self).get(kind, id)
    }

    fn count(&self, kind: Option<EntityKind>) -> StoreResult<usize> {
        (**self).count(kind)
    }
}
