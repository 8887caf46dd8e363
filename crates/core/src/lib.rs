//! `hbnb-core`: records, their shared lifecycle, and the storage engine contract.
//!
//! This crate performs no I/O. Backends live in `hbnb-infra` and implement
//! [`StorageEngine`].

pub mod base;
pub mod entity;
pub mod error;
pub mod id;
pub mod kind;
pub mod models;
pub mod record;
pub mod storage;
pub mod timestamp;

#[cfg(test)]
pub(crate) mod test_support;

pub use base::BaseRecord;
pub use entity::{Entity, Fields, KIND_MARKER};
pub use error::{StoreError, StoreResult};
pub use id::{RecordId, RecordKey};
pub use kind::EntityKind;
pub use models::{Amenity, City, Place, Review, State, User};
pub use record::Record;
pub use storage::{StorageEngine, StorageEngineExt};
