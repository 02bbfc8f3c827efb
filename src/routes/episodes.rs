use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{validate_reference, RelatedEpisode},
    routes::AppState,
    services::{find_related, RelatedQuery},
};

#[derive(Debug, Deserialize)]
pub struct RelatedParams {
    pub limit: Option<i64>,
}

/// Handler for related episodes of a stored episode
///
/// Looks the episode up first so callers only need its id.
pub async fn related_for_episode(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(episode_id): Path<String>,
    Query(params): Query<RelatedParams>,
) -> AppResult<Json<Vec<RelatedEpisode>>> {
    validate_reference("episode", &episode_id)?;
    let limit = params.limit.unwrap_or(state.default_limit);

    tracing::info!(
        request_id = %request_id,
        episode_id = %episode_id,
        limit,
        "Processing related episodes request"
    );

    let results = state
        .with_timeout(lookup_and_rank(&state, &episode_id, limit))
        .await?;

    tracing::info!(
        request_id = %request_id,
        returned = results.len(),
        "Related episodes request completed"
    );

    Ok(Json(results))
}

async fn lookup_and_rank(
    state: &AppState,
    episode_id: &str,
    limit: i64,
) -> AppResult<Vec<RelatedEpisode>> {
    let episode = state
        .store
        .find_episode(episode_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("episode {}", episode_id)))?;

    // The caller only sent the episode id; bad references in the stored
    // record are a data problem, not a bad request
    episode.validate().map_err(|e| {
        tracing::error!(
            episode_id = %episode_id,
            store = state.store.name(),
            error = %e,
            "Stored episode has malformed references"
        );
        AppError::Internal(format!("stored episode {} is malformed", episode_id))
    })?;

    let query = RelatedQuery::for_episode(&episode).with_limit(limit);
    find_related(state.store.as_ref(), query).await
}
