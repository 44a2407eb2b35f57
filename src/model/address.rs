use super::{FieldBindings, FieldRole, Record, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A postal address row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub created_time: Timestamp,
    #[serde(default)]
    pub modified_time: Timestamp,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Record for Address {
    fn bindings() -> &'static FieldBindings<Self> {
        static BINDINGS: OnceLock<FieldBindings<Address>> = OnceLock::new();
        BINDINGS.get_or_init(|| {
            FieldBindings::new(vec![
                field!(Address, "pk", FieldRole::Key, id: int),
                field!(Address, "created_tmz", FieldRole::CreatedMarker, created_time: marker),
                field!(Address, "modified_tmz", FieldRole::ModifiedMarker, modified_time: marker),
                field!(Address, "street", FieldRole::Data, street: text),
                field!(Address, "city", FieldRole::Data, city: text),
                field!(Address, "state", FieldRole::Data, state: text),
                field!(Address, "zip", FieldRole::Data, zip: text),
            ])
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn created(&self) -> Timestamp {
        self.created_time
    }

    fn modified(&self) -> Timestamp {
        self.modified_time
    }

    fn set_modified(&mut self, marker: Timestamp) {
        self.modified_time = marker;
    }

    fn clear_generated(&mut self) {
        self.id = 0;
        self.created_time = Timestamp::UNSET;
        self.modified_time = Timestamp::UNSET;
    }

    fn perturb(&mut self) {
        self.street = self.street.repeat(2);
        self.city = self.city.repeat(2);
        self.state = self.state.repeat(2);
        self.zip = self.zip.repeat(2);
    }
}
