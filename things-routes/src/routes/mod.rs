use crate::cors;
use crate::metrics;
use crate::service::ThingService;
use crate::state::ThingAppState;
use crate::stream::StreamingResponse;
use api_doc::{ThingBody, ThingSchema};
use axum::middleware;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response, Result},
    routing::get,
};
use responses::{ErrorBody, ThingError, ThingMessage, ThingResponse};
use things_core::{ThingEngine, ThingFields};
use tracing::{error, info, instrument};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

mod api_doc;
pub mod responses;

#[cfg(test)]
mod tests;

pub const THINGS_ROOT_PATH: &str = "/api/stuff";

#[derive(OpenApi)]
#[openapi(
    nest(
        (path = THINGS_ROOT_PATH, api = ThingDocs),
    )
)]
struct ApiDoc;

#[derive(OpenApi)]
#[openapi(paths(list_things, get_thing, create_thing, replace_thing, delete_thing))]
struct ThingDocs;

const THING_LIST_PATH: &str = "/";
const THING_CREATE_PATH: &str = "/";
const THING_GET_PATH: &str = "/{thing_id}";
const THING_REPLACE_PATH: &str = "/{thing_id}";
const THING_DELETE_PATH: &str = "/{thing_id}";

const METRICS_PATH: &str = "/metrics";

pub fn build<T: ThingEngine>(app_state: ThingAppState<T>) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes(app_state))
        .split_for_parts();

    cors::allow_everyone(
        router.merge(SwaggerUi::new("/api/swagger-ui").url("/api/api-docs/openapi.json", api)),
    )
}

fn routes<S, T: ThingEngine>(app_state: ThingAppState<T>) -> OpenApiRouter<S> {
    let thing_router = OpenApiRouter::new()
        .route(THING_LIST_PATH, get(list_things::<T>).post(create_thing::<T>))
        .route(
            THING_GET_PATH,
            get(get_thing::<T>)
                .put(replace_thing::<T>)
                .delete(delete_thing::<T>),
        );

    let metrics_recorder = if app_state.metrics_enabled {
        match metrics::setup_recorder() {
            Ok(recorder) => Some(recorder),
            Err(e) => {
                error!("failed to set up metrics, continuing without them: {e:?}");
                None
            }
        }
    } else {
        None
    };

    let router = match metrics_recorder {
        Some(metrics_recorder) => {
            info!("metrics enabled, setting up metrics handler");
            OpenApiRouter::new()
                .nest(
                    THINGS_ROOT_PATH,
                    thing_router.route_layer(middleware::from_fn(metrics::track_http)),
                )
                .route(
                    METRICS_PATH,
                    get(|| async move { metrics_recorder.render() }),
                )
        }
        None => {
            info!("metrics not enabled, setting up service unavailable metrics handler");
            OpenApiRouter::new().nest(THINGS_ROOT_PATH, thing_router).route(
                METRICS_PATH,
                get(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Metrics endpoint is disabled. Metrics must be enabled and the service restarted",
                    )
                }),
            )
        }
    };

    router.with_state(app_state)
}

/// List every stored thing.
#[utoipa::path(
    get,
    path = THING_LIST_PATH,
    responses(
        (status = OK, description = "Every stored thing, possibly none", body = Vec<ThingSchema>),
        (status = BAD_REQUEST, description = "The things could not be read from storage", body = ErrorBody),
    ),
)]
#[instrument(skip(service), err(Debug))]
pub async fn list_things<T>(
    State(service): State<ThingService<T>>,
) -> Result<Response, ThingError>
where
    T: ThingEngine,
{
    let things = service.list().await.map_err(ThingError::bad_request)?;

    metrics::increment_things_retrieved_by(things.len());
    Ok(StreamingResponse::ok(things).into_response())
}

/// Get the thing stored under the given id.
#[utoipa::path(
    get,
    path = THING_GET_PATH,
    responses(
        (status = OK, description = "The thing stored under the id, or null if there is none", body = Option<ThingSchema>),
        (
            status = NOT_FOUND,
            description = "The id is malformed or storage could not be read",
            body = ErrorBody,
            example = json!(api_doc::examples::get_error()),
        ),
    ),
    params(
        ("thing_id" = String, Path, description = "The id of the thing to find"),
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn get_thing<T>(
    State(service): State<ThingService<T>>,
    Path(thing_id): Path<String>,
) -> Result<Response, ThingError>
where
    T: ThingEngine,
{
    let thing = service
        .get(&thing_id)
        .await
        .map_err(ThingError::not_found)?;

    if thing.is_some() {
        metrics::increment_things_retrieved();
    }
    Ok(ThingResponse::ok(thing).into_response())
}

/// Store a new thing. Any `_id` or `id` in the body is ignored, storage assigns the id.
#[utoipa::path(
    post,
    path = THING_CREATE_PATH,
    responses(
        (
            status = CREATED,
            description = "The thing was saved. The Location header holds its path",
            body = ThingMessage,
            headers(("Location" = String, description = "Path of the new thing")),
        ),
        (
            status = BAD_REQUEST,
            description = "The thing could not be saved",
            body = ErrorBody,
            example = json!(api_doc::examples::storage_error()),
        ),
    ),
    request_body = ThingBody
)]
#[instrument(skip_all, err(Debug), fields(req.field_count = body.len()))]
pub async fn create_thing<T>(
    State(service): State<ThingService<T>>,
    Json(body): Json<ThingFields>,
) -> Result<Response, ThingError>
where
    T: ThingEngine,
{
    let thing = service
        .create(body)
        .await
        .map_err(ThingError::bad_request)?;

    metrics::increment_things_created();
    Ok(ThingMessage::saved(format!("{THINGS_ROOT_PATH}/{}", thing.id)).into_response())
}

/// Replace every field of the thing stored under the given id with the body.
/// The stored id never changes, any `_id` or `id` in the body is ignored.
#[utoipa::path(
    put,
    path = THING_REPLACE_PATH,
    responses(
        (status = OK, description = "The thing was replaced, or no thing was stored under the id", body = ThingMessage),
        (status = BAD_REQUEST, description = "The id is malformed or the thing could not be replaced", body = ErrorBody),
    ),
    params(
        ("thing_id" = String, Path, description = "The id of the thing to replace")
    ),
    request_body = ThingBody,
)]
#[instrument(skip(service, body), err(Debug))]
pub async fn replace_thing<T>(
    State(service): State<ThingService<T>>,
    Path(thing_id): Path<String>,
    Json(body): Json<ThingFields>,
) -> Result<Response, ThingError>
where
    T: ThingEngine,
{
    service
        .replace(&thing_id, body)
        .await
        .map_err(ThingError::bad_request)?;

    metrics::increment_things_replaced();
    Ok(ThingMessage::updated().into_response())
}

/// Delete the thing stored under the given id.
#[utoipa::path(
    delete,
    path = THING_DELETE_PATH,
    responses(
        (status = OK, description = "The thing was deleted, or never existed", body = ThingMessage),
        (status = BAD_REQUEST, description = "The id is malformed or the thing could not be deleted", body = ErrorBody),
    ),
    params(
        ("thing_id" = String, Path, description = "The id of the thing to delete")
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn delete_thing<T>(
    State(service): State<ThingService<T>>,
    Path(thing_id): Path<String>,
) -> Result<Response, ThingError>
where
    T: ThingEngine,
{
    service
        .delete(&thing_id)
        .await
        .map_err(ThingError::bad_request)?;

    metrics::increment_things_deleted();
    Ok(ThingMessage::deleted().into_response())
}
