use serde::{Deserialize, Serialize};

use crate::base::BaseRecord;
use crate::error::StoreResult;
use crate::storage::{StorageEngine, StorageEngineExt};

use super::{Amenity, Review};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default)]
    pub city_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub number_rooms: i64,
    #[serde(default)]
    pub number_bathrooms: i64,
    #[serde(default)]
    pub max_guest: i64,
    #[serde(default)]
    pub price_by_night: i64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Identities of linked amenities.
    #[serde(default)]
    pub amenity_ids: Vec<String>,
}

impl_entity!(Place);

impl Place {
    /// Reviews whose `place_id` points at this place.
    pub fn reviews(&self, engine: &dyn StorageEngine) -> StoreResult<Vec<Review>> {
        Ok(engine
            .all_of::<Review>()?
            .into_values()
            .filter(|review| review.place_id == self.base.id.as_str())
            .collect())
    }

    /// Amenities listed in `amenity_ids` that the engine knows about.
    pub fn amenities(&self, engine: &dyn StorageEngine) -> StoreResult<Vec<Amenity>> {
        Ok(engine
            .all_of::<Amenity>()?
            .into_values()
            .filter(|amenity| self.amenity_ids.iter().any(|id| id == amenity.base.id.as_str()))
            .collect())
    }

    /// Link an amenity; linking the same one twice is a no-op.
    pub fn add_amenity(&mut self, amenity: &Amenity) {
        let id = amenity.base.id.as_str();
        if !self.amenity_ids.iter().any(|existing| existing == id) {
            self.amenity_ids.push(id.to_string());
        }
    }
}
