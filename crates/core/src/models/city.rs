use serde::{Deserialize, Serialize};

use crate::base::BaseRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default)]
    pub state_id: String,
    #[serde(default)]
    pub name: String,
}

impl_entity!(City);
