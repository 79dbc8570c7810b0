pub mod response;

use axum::{
    http::StatusCode,
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::dispatch::{ConnectionSource, Engine, ResourceRegistry};
use crate::error::AppError;
use crate::features;
use crate::middleware;

/// Register every resource and serve them until shutdown
pub async fn serve(config: Config, pool: PgPool) -> anyhow::Result<()> {
    let mut registry = ResourceRegistry::new();
    features::register(&mut registry, &config.access.policy())?;

    let app = create_router(&config, registry, pool);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(
        context_path = %config.server.context_path,
        office = %config.offices().resolve(&config.server.context_path),
        "Listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Create the application router with all routes and middleware
///
/// Resources are mounted under the configured context path; `/health`
/// stays at the root.
pub fn create_router<S: ConnectionSource>(
    config: &Config,
    registry: ResourceRegistry<S>,
    source: S,
) -> Router {
    let engine = Engine::new(
        source.clone(),
        config.offices(),
        config.server.context_path.clone(),
    );
    let mut resources = registry.into_router(engine, config.cache);
    if config.access.trust_identity_headers {
        resources = resources.layer(from_fn(middleware::identity::trusted_identity));
    }

    let mount = config.server.context_path.trim_end_matches('/');
    let router = if mount.is_empty() {
        Router::new().merge(resources)
    } else {
        Router::new().nest(mount, resources)
    };

    router
        .route("/health", get(move || health(source.clone())))
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health<S: ConnectionSource>(source: S) -> Response {
    match source.check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
                .into_response()
        },
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("route".to_string())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    tracing::info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
