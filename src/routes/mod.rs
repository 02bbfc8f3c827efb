use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::EpisodeStore,
    error::{AppError, AppResult},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::related::DEFAULT_LIMIT,
};

pub mod episodes;
pub mod related;

/// Shared handler state
pub struct AppState {
    pub store: Arc<dyn EpisodeStore>,
    /// Upper bound on the store work done for one request
    pub store_timeout: Duration,
    /// Limit used when a request does not pass one
    pub default_limit: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn EpisodeStore>) -> Self {
        Self {
            store,
            store_timeout: Duration::from_secs(2),
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn with_default_limit(mut self, default_limit: i64) -> Self {
        self.default_limit = default_limit;
        self
    }

    /// Runs store-backed work, failing with `StoreUnavailable` once the timeout elapses
    pub(crate) async fn with_timeout<T>(
        &self,
        work: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        tokio::time::timeout(self.store_timeout, work)
            .await
            .map_err(|_| {
                tracing::warn!(
                    timeout_ms = self.store_timeout.as_millis(),
                    store = self.store.name(),
                    "Store request timed out"
                );
                AppError::StoreUnavailable(format!(
                    "store did not respond within {} ms",
                    self.store_timeout.as_millis()
                ))
            })?
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/episodes/:episode_id/related", get(episodes::related_for_episode))
        .route("/related", post(related::related))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
