use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

const ALLOWED_HEADERS: [HeaderName; 6] = [
    header::ORIGIN,
    HeaderName::from_static("x-requested-with"),
    HeaderName::from_static("content"),
    header::ACCEPT,
    header::CONTENT_TYPE,
    header::AUTHORIZATION,
];

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
];

pub const ALLOW_HEADERS_VALUE: &str =
    "Origin, X-Requested-With, Content, Accept, Content-Type, Authorization";
pub const ALLOW_METHODS_VALUE: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";

/// Any origin may call every route. The allowed headers and methods are sent
/// on every response, not only on preflight answers.
pub fn allow_everyone(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOW_HEADERS_VALUE),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOW_METHODS_VALUE),
            ))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_headers(ALLOWED_HEADERS)
                    .allow_methods(ALLOWED_METHODS),
            ),
    )
}
