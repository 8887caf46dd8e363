//! Concrete entity kinds.
//!
//! Each kind is a plain struct embedding [`BaseRecord`](crate::BaseRecord);
//! the shared lifecycle comes from [`Entity`](crate::Entity).

/// Wire an entity struct (with a `base: BaseRecord` field) into the lifecycle.
///
/// The struct name doubles as the [`Record`](crate::Record) variant and the
/// [`EntityKind`](crate::EntityKind) variant.
macro_rules! impl_entity {
    ($t:ident) => {
        impl crate::entity::Entity for $t {
            const KIND: crate::kind::EntityKind = crate::kind::EntityKind::$t;

            fn base(&self) -> &crate::base::BaseRecord {
                &self.base
            }

            fn base_mut(&mut self) -> &mut crate::base::BaseRecord {
                &mut self.base
            }

            fn from_record(record: crate::record::Record) -> Option<Self> {
                match record {
                    crate::record::Record::$t(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$t> for crate::record::Record {
            fn from(value: $t) -> Self {
                crate::record::Record::$t(value)
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&crate::entity::Entity::render(self))
            }
        }
    };
}

mod amenity;
mod city;
mod place;
mod review;
mod state;
mod user;

pub use amenity::Amenity;
pub use city::City;
pub use place::Place;
pub use review::Review;
pub use state::State;
pub use user::User;
