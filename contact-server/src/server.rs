use std::{
    error::Error,
    net::SocketAddr,
    path::Path,
    sync::{Arc, OnceLock},
};

use axum::{
    Extension, Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::get,
    serve,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shared::config::{Config, ConfigError, EnvLoader, LogFormat};
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
};
use tracing::{Subscriber, error, info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, fmt::MakeWriter, util::SubscriberInitExt};

use crate::{
    app_state::AppState,
    db::{bootstrap, pool::create_database_pool},
    http::error::not_found,
    middleware::security::{self, SecurityHeadersState},
    routes, tracer,
};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Process-wide Prometheus handle; installs the recorder on first use.
pub fn metrics_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|err| {
                    error!(error = %err, "failed to install Prometheus recorder");
                    PrometheusBuilder::new().build_recorder().handle()
                })
        })
        .clone()
}

async fn metrics_endpoint(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        handle.render(),
    )
}

fn default_level(config: &Config) -> LevelFilter {
    if config.is_development() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// `RUST_LOG` wins over `default_level`.
fn build_env_filter(default_level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

fn build_subscriber<W>(
    default_level: LevelFilter,
    format: LogFormat,
    writer: W,
) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let builder = fmt::fmt()
        .with_env_filter(build_env_filter(default_level))
        .with_target(false)
        .with_level(true)
        .with_writer(writer);

    match format {
        LogFormat::Json => Box::new(builder.json().with_ansi(false).finish()),
        LogFormat::Text => Box::new(builder.with_ansi(true).finish()),
    }
}

/// Installs the global tracing subscriber described by the configuration.
///
/// A second call leaves the first subscriber in place.
pub fn initialize_tracing(config: &Config) {
    let subscriber = build_subscriber(default_level(config), config.log_format(), std::io::stdout);
    if let Err(err) = subscriber.try_init() {
        eprintln!("tracing already initialized: {err}");
    }
}

/// Loads and validates the configuration.
///
/// The configured subscriber cannot exist before the configuration does, so
/// loader events go to a scoped text subscriber on stderr at `info`.
///
/// # Errors
/// Returns [`ConfigError`] if loading or validation fails.
pub fn load_config(loader: &EnvLoader, environment: &str) -> Result<Config, ConfigError> {
    load_config_with_writer(loader, environment, std::io::stderr)
}

fn load_config_with_writer<W>(
    loader: &EnvLoader,
    environment: &str,
    writer: W,
) -> Result<Config, ConfigError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let subscriber = build_subscriber(LevelFilter::INFO, LogFormat::Text, writer);
    tracing::subscriber::with_default(subscriber, || Config::load(loader, environment))
}

#[must_use]
pub fn create_app_state(pool: Option<sqlx::PgPool>) -> Arc<AppState> {
    Arc::new(AppState::new(pool))
}

/// Any origin; request headers are mirrored back; nothing is exposed.
#[must_use]
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ]))
        .allow_headers(AllowHeaders::mirror_request())
}

#[must_use]
pub fn create_compression_layer() -> CompressionLayer {
    CompressionLayer::new().gzip(true)
}

/// Builds the application router.
///
/// Layers run outermost first: request logging, security headers, CORS,
/// compression.
pub fn create_app_router(
    state: Arc<AppState>,
    config: Arc<Config>,
    metrics_handle: PrometheusHandle,
) -> Router {
    Router::new()
        .merge(routes::root::create_root_router())
        .merge(routes::health::create_health_router())
        .merge(routes::openapi::openapi_routes())
        .route("/metrics", get(metrics_endpoint))
        .fallback(not_found)
        .layer(Extension(config))
        .layer(Extension(metrics_handle))
        .layer(create_compression_layer())
        .layer(create_cors_layer())
        .layer(middleware::from_fn_with_state(
            SecurityHeadersState::default(),
            security::apply_security_headers,
        ))
        .layer(tracer::create_trace_layer())
        .with_state(state)
}

/// Resolves when Ctrl+C is received.
pub async fn create_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

/// Starts the server with a validated configuration.
///
/// `base_dir` is where `migrations/` and `modules/` are looked up.
///
/// # Errors
/// Returns an error if the database cannot be reached, a bootstrap script
/// fails, or the listener cannot be bound.
pub async fn run(config: Config, base_dir: &Path) -> Result<(), Box<dyn Error>> {
    initialize_tracing(&config);
    info!(environment = config.node_env(), "Starting server...");

    let metrics_handle = metrics_handle();
    let config = Arc::new(config);
    let port = config.listen_port()?;
    let db = config.database();

    let pool = create_database_pool(&db).await?;
    bootstrap::ensure_liveness(&pool).await?;

    let report = bootstrap::run(&pool, &db, base_dir).await?;
    info!(
        entities = report.entities_synchronized,
        migrations = report.migrations_applied.len(),
        "database bootstrap complete"
    );

    let state = create_app_state(Some(pool));
    let app = create_app_router(state, config, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(create_shutdown_signal())
    .await?;

    Ok(())
}
