use serde::{Deserialize, Serialize};

use crate::base::BaseRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    #[serde(flatten)]
    pub base: BaseRecord,
    #[serde(default)]
    pub name: String,
}

impl_entity!(Amenity);
