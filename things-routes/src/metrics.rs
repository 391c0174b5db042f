use axum::extract::{MatchedPath, Request};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use error_stack::{Report, ResultExt};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::time::Instant;

const THINGS_RETRIEVED_METRIC_NAME: &str = "things_retrieved";
const THINGS_CREATED_METRIC_NAME: &str = "num_things_created";
const THINGS_REPLACED_METRIC_NAME: &str = "num_things_replaced";
const THINGS_DELETED_METRIC_NAME: &str = "num_things_deleted";

const REQUESTS_TOTAL_METRIC_NAME: &str = "http_requests_total";
const REQUEST_DURATION_METRIC_NAME: &str = "http_requests_duration_seconds";
const REQUEST_SIZE_METRIC_NAME: &str = "http_request_size";

#[derive(Debug, thiserror::Error)]
#[error("failed to set up the prometheus recorder")]
pub struct MetricsSetupError;

pub fn setup_recorder() -> Result<PrometheusHandle, Report<MetricsSetupError>> {
    const EXPONENTIAL_SECONDS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    const REQ_RES_BUCKETS: &[f64] = &[128.0, 256.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0, 16384.0];

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_METRIC_NAME.to_string()),
            EXPONENTIAL_SECONDS,
        )
        .change_context(MetricsSetupError)?
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_SIZE_METRIC_NAME.to_string()),
            REQ_RES_BUCKETS,
        )
        .change_context(MetricsSetupError)?
        .install_recorder()
        .change_context(MetricsSetupError)
}

/// Counts and times requests to the thing routes, labelled by route template
/// (`/api/stuff/{thing_id}`) so per-thing paths do not explode the label set.
pub async fn track_http(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_owned(), |p| p.as_str().to_owned());
    let [method, route] = [("method", req.method().to_string()), ("route", route)];

    if let Some(size) = content_length(req.headers()) {
        metrics::histogram!(REQUEST_SIZE_METRIC_NAME, &[method.clone(), route.clone()])
            .record(size as f64);
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let latency = start.elapsed().as_secs_f64();

    let labels = [
        method,
        route,
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!(REQUESTS_TOTAL_METRIC_NAME, &labels).increment(1);
    metrics::histogram!(REQUEST_DURATION_METRIC_NAME, &labels).record(latency);

    response
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[inline]
pub fn increment_things_retrieved() {
    increment_things_retrieved_by(1);
}

#[inline]
pub fn increment_things_retrieved_by(amt: usize) {
    metrics::counter!(THINGS_RETRIEVED_METRIC_NAME).increment(amt as u64);
}

#[inline]
pub fn increment_things_created() {
    metrics::counter!(THINGS_CREATED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_things_replaced() {
    metrics::counter!(THINGS_REPLACED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_things_deleted() {
    metrics::counter!(THINGS_DELETED_METRIC_NAME).increment(1);
}
