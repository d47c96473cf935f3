// Campus Notify API server
// Decision: Runs against PostgreSQL when DATABASE_URL is set, otherwise fully in memory
// Decision: Shutdown releases every live session before the server stops accepting

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use campus_notify_control_plane::storage::StorageBackend;
use campus_notify_control_plane::{build_app, ControlPlaneConfig};
use campus_notify_core::telemetry::{init_telemetry, TelemetryConfig};
use campus_notify_core::NotificationService;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    // OTEL_SERVICE_NAME, OTEL_EXPORTER_OTLP_ENDPOINT and RUST_LOG override these
    let telemetry_config = TelemetryConfig::from_env()
        .or_service_name("campus-notify-control-plane")
        .or_log_filter("campus_notify_control_plane=debug,campus_notify_core=debug,tower_http=debug")
        .with_version(env!("CARGO_PKG_VERSION"));

    // Keep the guard alive for the lifetime of the application
    let _telemetry_guard = init_telemetry(telemetry_config);

    tracing::info!("campus-notify starting...");

    let config = ControlPlaneConfig::from_env().context("Invalid configuration")?;

    let backend = match &config.database_url {
        Some(url) => {
            let backend = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            backend
        }
        None => {
            tracing::warn!(
                seeded_users = config.dev_seed_users,
                "DATABASE_URL not set, running in dev mode with in-memory storage"
            );
            StorageBackend::in_memory_seeded(config.dev_seed_users)
        }
    };
    let dev_mode = backend.is_dev_mode();
    let backend = Arc::new(backend);

    tracing::info!(
        queue_capacity = config.notify.queue_capacity,
        heartbeat_secs = config.notify.heartbeat_interval.as_secs(),
        "Live delivery configured"
    );
    let service = Arc::new(NotificationService::new(
        backend.clone(),
        backend,
        config.notify,
    ));

    if !config.api_prefix.is_empty() {
        tracing::info!(prefix = %config.api_prefix, "API prefix configured");
    }

    let app = build_app(service.clone(), &config.api_prefix, dev_mode);

    // Only needed when the UI is served from a different origin than the API
    let cors_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let app = if !cors_origins.is_empty() {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    header::ORIGIN,
                    header::CACHE_CONTROL,
                ])
                .allow_credentials(true),
        )
    } else {
        tracing::info!("CORS not configured (same-origin requests only)");
        app
    };

    // Add tracing
    let app = app.layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("HTTP server listening on {}", config.bind_addr);

    let shutdown_service = service.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
            // Open SSE streams would otherwise hold the server open
            shutdown_service.shutdown();
        })
        .await
        .context("Server error")?;

    tracing::info!("campus-notify stopped");
    Ok(())
}
