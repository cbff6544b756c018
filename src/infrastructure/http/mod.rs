use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, job::JobController};
use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    job_controller: Arc<JobController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(pool, job_controller);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Router assembly, split out so tests can drive it without a socket.
pub fn build_router(pool: Arc<DbPool>, job_controller: Arc<JobController>) -> Router {
    // Job routes: the trigger endpoint the external scheduler hits, plus a
    // plaintext front page. No authentication; that lives at the network
    // layer.
    let job_routes = Router::new()
        .route("/", get(JobController::index))
        .route("/run", get(JobController::run))
        .with_state(job_controller);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool)
        .merge(job_routes)
        .layer(TraceLayer::new_for_http())
}
