use axum::Router;
use axum::response::Response;
use error_stack::{Report, ResultExt};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, error, info};

pub type AppResult<T> = Result<T, Report<AppError>>;

#[derive(Debug, thiserror::Error)]
#[error("thing service failed to run")]
pub struct AppError;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq)]
pub struct AppProperties {
    pub port: u16,
}

impl Default for AppProperties {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl AppProperties {
    /// Reads the listen port from `port_var`. An unset variable means [`DEFAULT_PORT`].
    pub fn from_env(port_var: &str) -> AppResult<Self> {
        Self::from_port(port_var, std::env::var(port_var).ok())
    }

    fn from_port(port_var: &str, raw_port: Option<String>) -> AppResult<Self> {
        let Some(raw_port) = raw_port else {
            return Ok(Self::default());
        };

        let port = raw_port
            .trim()
            .parse()
            .change_context(AppError)
            .attach_with(|| format!("{port_var} must be a port number, got '{raw_port}'"))?;

        Ok(Self { port })
    }
}

/// Serves `routes` on every interface until ctrl-c is received.
pub async fn run(routes: Router, properties: AppProperties) -> AppResult<()> {
    let listener = build_listener(properties.port).await?;

    info!(
        "starting up thing service on port {}",
        listener
            .local_addr()
            .change_context(AppError)
            .attach("failed to read the bound address")?
            .port()
    );

    serve_on(listener, routes, shutdown_signal()).await
}

pub async fn serve_on<F>(listener: TcpListener, routes: Router, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let routes = routes.layer(ServiceBuilder::new().layer(
        TraceLayer::new_for_http().on_response(
            |response: &Response, latency: Duration, _span: &Span| {
                info!("returned {} in {}ms", response.status(), latency.as_millis());
            },
        ),
    ));

    axum::serve(listener, routes)
        .with_graceful_shutdown(shutdown)
        .await
        .change_context(AppError)
        .attach("failed to serve routes")
}

async fn build_listener(port: u16) -> AppResult<TcpListener> {
    TcpListener::bind(SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::UNSPECIFIED,
        port,
    )))
    .await
    .change_context(AppError)
    .attach_with(|| format!("failed to bind port {port}"))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c, shutting down"),
        Err(e) => {
            error!("failed to listen for ctrl-c, serving until killed: {e}");
            std::future::pending::<()>().await
        }
    }
}
