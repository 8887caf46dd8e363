use serde::{Deserialize, Serialize};

use crate::base::BaseRecord;
use crate::error::StoreResult;
use crate::storage::{StorageEngine, StorageEngineExt};

use super::City;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default)]
    pub name: String,
}

impl_entity!(State);

impl State {
    /// Cities whose `state_id` points at this state.
    pub fn cities(&self, engine: &dyn StorageEngine) -> StoreResult<Vec<City>> {
        Ok(engine
            .all_of::<City>()?
            .into_values()
            .filter(|city| city.state_id == self.base.id.as_str())
            .collect())
    }
}
