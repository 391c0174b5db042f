use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Any json object. Every field is stored as given, except `_id` and `id` which are dropped.
#[derive(ToSchema)]
#[schema(example = json!({ "title": "a", "description": "a thing", "price": 12 }))]
#[allow(dead_code)]
pub struct ThingBody(HashMap<String, Value>);

/// A stored thing: its id plus every field it was saved with.
#[derive(Serialize, ToSchema)]
#[schema(example = json!({ "_id": "6650f0c2a1b2c3d4e5f60718", "title": "a", "price": 12 }))]
#[allow(dead_code)]
pub struct ThingSchema {
    #[serde(rename = "_id")]
    id: String,
}

pub mod examples {
    use crate::error::ThingServiceError;
    use crate::routes::responses::ErrorBody;
    use error_stack::Report;
    use serde_json::Value;
    use std::sync::LazyLock;
    use things_core::result::ThingRepoError;

    static STORAGE_ERROR: LazyLock<Value> = LazyLock::new(|| {
        let report = Report::new(ThingRepoError::Create).change_context(ThingServiceError);
        serde_json::to_value(ErrorBody::from_report(&report))
            .expect("error body is serializable to Value")
    });

    pub fn storage_error() -> &'static Value {
        &STORAGE_ERROR
    }

    static GET_ERROR: LazyLock<Value> = LazyLock::new(|| {
        let report = Report::new(ThingRepoError::Get).change_context(ThingServiceError);
        serde_json::to_value(ErrorBody::from_report(&report))
            .expect("error body is serializable to Value")
    });

    pub fn get_error() -> &'static Value {
        &GET_ERROR
    }
}
