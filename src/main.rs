//! Cargoline Server - cargo, inventory and repair status synchronization
//!
//! REST API server keeping cargo records, equivalent devices and repair
//! tickets consistent.

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cargoline_server::{
    api,
    config::AppConfig,
    error,
    repository::{Repository, SchemaCapabilities},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("cargoline_server={},tower_http=debug", config.logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    error::set_expose_details(config.server.expose_error_details);

    tracing::info!("Starting Cargoline Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let capabilities =
        SchemaCapabilities::detect(&pool, config.features.record_status_column).await?;
    if !capabilities.record_status_column {
        tracing::warn!("cargo.record_status column unavailable, record status kept in repair metadata only");
    }

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool, capabilities);
    let services = Services::new(repository, &config);

    if let Err(e) = services.cargo.adopt_legacy_notes().await {
        tracing::warn!("Adopting legacy repair metadata failed: {}", e);
    }

    // Reconciliations left pending by a previous run
    match services.reconciler.drain_outbox().await {
        Ok(summary) if summary.failed > 0 => tracing::warn!(
            "{} reconciliation(s) still pending after startup drain",
            summary.failed
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!("Startup reconciliation drain failed: {}", e),
    }

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Locations
        .route("/locations", get(api::locations::list_locations))
        .route("/locations/headquarters", get(api::locations::get_headquarters))
        // Inventory
        .route("/inventory/devices", get(api::inventory::list_devices))
        .route("/inventory/devices/:id", get(api::inventory::get_device))
        .route("/inventory/devices/:id/movements", get(api::inventory::list_movements))
        .route("/inventory/dispatch", post(api::inventory::dispatch))
        // Cargo
        .route("/cargo", get(api::cargo::list_cargo).post(api::cargo::create_cargo))
        .route("/cargo/:id", get(api::cargo::get_cargo).patch(api::cargo::update_cargo))
        .route("/cargo/:id/repair", put(api::cargo::update_repair_details))
        // Repairs
        .route("/repairs", post(api::repairs::create_repair))
        .route("/repairs/:id", get(api::repairs::get_repair).patch(api::repairs::update_repair))
        .route("/repairs/:id/link", post(api::repairs::link_repair))
        // Reconciliation
        .route("/reconcile/pending", post(api::reconcile::drain_pending))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
