use crate::error::ThingServiceError;
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use error_stack::{FrameKind, Report};
use serde::Serialize;
use things_core::model::Thing;
use utoipa::ToSchema;

pub const SAVED_MESSAGE: &str = "Objet enregistré !";
pub const UPDATED_MESSAGE: &str = "Objet modifié !";
pub const DELETED_MESSAGE: &str = "Objet supprimé !";

#[derive(Debug, Serialize, ToSchema)]
pub struct ThingMessage {
    #[serde(skip)]
    status_code: StatusCode,
    #[serde(skip)]
    location: Option<String>,
    message: &'static str,
}

impl ThingMessage {
    /// `location` is the path the new thing can be fetched from.
    pub fn saved(location: String) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            location: Some(location),
            message: SAVED_MESSAGE,
        }
    }

    pub fn updated() -> Self {
        Self::ok(UPDATED_MESSAGE)
    }

    pub fn deleted() -> Self {
        Self::ok(DELETED_MESSAGE)
    }

    fn ok(message: &'static str) -> Self {
        Self {
            status_code: StatusCode::OK,
            location: None,
            message,
        }
    }
}

impl IntoResponse for ThingMessage {
    fn into_response(mut self) -> Response {
        match self.location.take() {
            Some(location) => {
                (self.status_code, [(header::LOCATION, location)], Json(self)).into_response()
            }
            None => (self.status_code, Json(self)).into_response(),
        }
    }
}

/// A single thing, or `null` when nothing is stored under the requested id.
#[derive(Debug)]
pub struct ThingResponse<T>(Option<Thing<T>>);

impl<T> ThingResponse<T> {
    pub fn ok(thing: Option<Thing<T>>) -> Self {
        Self(thing)
    }
}

impl<T: Serialize> IntoResponse for ThingResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.0)).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// The outermost error.
    message: String,
    /// Every error underneath `message`, outermost first.
    causes: Vec<String>,
}

impl ErrorBody {
    pub fn from_report<C>(report: &Report<C>) -> Self {
        let mut contexts = report.frames().filter_map(|frame| match frame.kind() {
            FrameKind::Context(context) => Some(context.to_string()),
            _ => None,
        });

        Self {
            error: ErrorDetail {
                message: contexts.next().unwrap_or_default(),
                causes: contexts.collect(),
            },
        }
    }
}

/// A failed storage operation. The whole error chain is sent back to the client.
pub struct ThingError {
    status_code: StatusCode,
    report: Report<ThingServiceError>,
}

impl ThingError {
    pub fn bad_request(report: Report<ThingServiceError>) -> Self {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            report,
        }
    }

    pub fn not_found(report: Report<ThingServiceError>) -> Self {
        Self {
            status_code: StatusCode::NOT_FOUND,
            report,
        }
    }
}

impl std::fmt::Debug for ThingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.report.fmt(f)
    }
}

impl IntoResponse for ThingError {
    fn into_response(self) -> Response {
        (self.status_code, Json(ErrorBody::from_report(&self.report))).into_response()
    }
}
