//! Tagged union over every entity kind.
//!
//! Engines store and return `Record`s; callers narrow them back to a concrete
//! kind with [`Record::into_entity`].

use crate::base::BaseRecord;
use crate::entity::{Entity, Fields, marker_kind};
use crate::error::StoreResult;
use crate::id::{RecordId, RecordKey};
use crate::kind::EntityKind;
use crate::models::{Amenity, City, Place, Review, State, User};

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    User(User),
    Place(Place),
    City(City),
    State(State),
    Amenity(Amenity),
    Review(Review),
}

/// Apply the same expression to whichever entity a record holds.
macro_rules! each_kind {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            Record::User($inner) => $body,
            Record::Place($inner) => $body,
            Record::City($inner) => $body,
            Record::State($inner) => $body,
            Record::Amenity($inner) => $body,
            Record::Review($inner) => $body,
        }
    };
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::User(_) => EntityKind::User,
            Record::Place(_) => EntityKind::Place,
            Record::City(_) => EntityKind::City,
            Record::State(_) => EntityKind::State,
            Record::Amenity(_) => EntityKind::Amenity,
            Record::Review(_) => EntityKind::Review,
        }
    }

    pub fn base(&self) -> &BaseRecord {
        each_kind!(self, inner => inner.base())
    }

    pub fn id(&self) -> &RecordId {
        &self.base().id
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.kind(), self.id().clone())
    }

    pub fn to_dict(&self) -> StoreResult<Fields> {
        each_kind!(self, inner => inner.to_dict())
    }

    pub fn render(&self) -> String {
        each_kind!(self, inner => inner.render())
    }

    /// Rebuild whichever kind the dictionary's marker names.
    pub fn from_dict(dict: &Fields) -> StoreResult<Self> {
        Ok(match marker_kind(dict)? {
            EntityKind::User => Record::User(User::reconstruct(dict)?),
            EntityKind::Place => Record::Place(Place::reconstruct(dict)?),
            EntityKind::City => Record::City(City::reconstruct(dict)?),
            EntityKind::State => Record::State(State::reconstruct(dict)?),
            EntityKind::Amenity => Record::Amenity(Amenity::reconstruct(dict)?),
            EntityKind::Review => Record::Review(Review::reconstruct(dict)?),
        })
    }

    /// Narrow to a concrete kind; `None` if the record is another kind.
    pub fn into_entity<E: Entity>(self) -> Option<E> {
        E::from_record(self)
    }
}

impl core::fmt::Display for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.render())
    }
}
