use apps::{AppProperties, AppResult};
use axum::Router;
use dotenv::dotenv;
use error_stack::fmt::ColorMode;
use repositories::mongodb::things::{ConnectionDetails, ThingRepo};
use things_core::ThingRepository;
use things_routes::state::ThingAppState;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const CONNECTION_VAR: &str = "DBCONNECT";
const PORT_VAR: &str = "THINGS_PORT";
const METRICS_VAR: &str = "THINGS_METRICS";

#[tokio::main]
async fn main() {
    match try_main().await {
        Ok(_) => info!("thing service shutting down"),
        Err(e) => {
            error!("thing service exited with error: {e:?}");
        }
    }
}

fn init_logging() {
    error_stack::Report::set_color_mode(ColorMode::None);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("THINGS_LOG"))
        .init();
}

async fn try_main() -> AppResult<()> {
    init_logging();

    if let Err(e) = dotenv() {
        warn!("failed to load .env file: {e}");
    }

    let properties = AppProperties::from_env(PORT_VAR)?;
    let routes = build_routes().await;

    apps::run(routes, properties).await
}

async fn build_routes() -> Router {
    let engine = ThingEngine::new(build_repo().await);

    debug!("building routes..");
    let app_state = ThingAppState::new(engine).with_metrics(metrics_enabled());

    let routes = things_routes::routes::build(app_state);
    debug!("routes built");
    routes
}

/// The service starts even when storage is unreachable, requests then fail one by one.
#[instrument]
async fn build_repo() -> ThingRepo {
    match ConnectionDetails::from_env(CONNECTION_VAR) {
        Ok(connection_details) => {
            debug!("initializing mongodb repository");
            ThingRepo::connect(connection_details).await
        }
        Err(e) => {
            error!("cannot connect to mongodb: {e:?}");
            ThingRepo::unavailable(format!("{CONNECTION_VAR} is not set"))
        }
    }
}

fn metrics_enabled() -> bool {
    std::env::var(METRICS_VAR).is_ok_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

#[derive(Debug, Clone)]
struct ThingEngine<T> {
    repo: T,
}

impl<T> ThingEngine<T> {
    fn new(repo: T) -> Self {
        Self { repo }
    }
}

impl<T> things_core::ThingEngine for ThingEngine<T>
where
    T: ThingRepository + Clone + Send + Sync + 'static,
{
    type ThingId = T::ThingId;
    type Repo = T;

    fn repo(&self) -> Self::Repo {
        self.repo.clone()
    }
}
