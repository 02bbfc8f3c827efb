use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::RelatedEpisode,
    routes::AppState,
    services::{find_related, RelatedQuery},
};

/// Current episode context supplied by the caller
#[derive(Debug, Deserialize)]
pub struct RelatedRequest {
    pub episode_id: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub series_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Handler for related episodes of an explicit episode context
pub async fn related(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RelatedRequest>,
) -> AppResult<Json<Vec<RelatedEpisode>>> {
    tracing::info!(
        request_id = %request_id,
        episode_id = %request.episode_id,
        genre_count = request.genres.len(),
        has_series = request.series_id.is_some(),
        "Processing related request"
    );

    let query = RelatedQuery::new(request.episode_id, request.genres, request.series_id)
        .with_limit(request.limit.unwrap_or(state.default_limit));

    let results = state
        .with_timeout(find_related(state.store.as_ref(), query))
        .await?;

    Ok(Json(results))
}
