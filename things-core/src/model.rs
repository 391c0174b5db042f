use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The client supplied fields of a thing. No field names or value types are enforced.
pub type ThingFields = Map<String, Value>;

/// Field names a client could use to pick the identifier of a thing.
pub const ID_FIELDS: [&str; 2] = ["_id", "id"];

/// The fields of a thing that is about to be written.
/// Any client supplied identifier has already been removed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewThing {
    fields: ThingFields,
}

impl NewThing {
    pub fn from_fields(mut fields: ThingFields) -> Self {
        for id_field in ID_FIELDS {
            fields.remove(id_field);
        }
        Self { fields }
    }

    pub fn fields(&self) -> &ThingFields {
        &self.fields
    }

    pub fn into_fields(self) -> ThingFields {
        self.fields
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Thing<T> {
    #[serde(rename = "_id")]
    pub id: T,
    #[serde(flatten)]
    pub fields: ThingFields,
}

impl<T> Thing<T> {
    pub fn new(id: T, fields: ThingFields) -> Self {
        Self { id, fields }
    }

    pub fn from_new(id: T, new_thing: NewThing) -> Self {
        Self::new(id, new_thing.into_fields())
    }
}
