use std::cmp::Ordering;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::{
    db::{CandidateFilter, EpisodeStore},
    error::{AppError, AppResult},
    models::{validate_reference, Episode, RelatedEpisode},
    services::scoring::ScoreBreakdown,
};

/// Result count used when the caller does not ask for one
pub const DEFAULT_LIMIT: i64 = 15;

/// Context of the episode being viewed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedQuery {
    pub episode_id: String,
    pub genres: Vec<String>,
    pub series_id: Option<String>,
    pub limit: i64,
}

impl RelatedQuery {
    pub fn new(episode_id: impl Into<String>, genres: Vec<String>, series_id: Option<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            genres,
            series_id,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Builds the query from a stored episode
    pub fn for_episode(episode: &Episode) -> Self {
        Self::new(
            episode.episode_id.clone(),
            episode.genres.clone(),
            episode.series_id.clone(),
        )
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Checks the references and limit, returning the limit as a count
    fn validate(&self) -> AppResult<usize> {
        if self.limit <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "limit must be positive, got {}",
                self.limit
            )));
        }

        validate_reference("episode", &self.episode_id)?;
        for genre in &self.genres {
            validate_reference("genre", genre)?;
        }
        if let Some(series_id) = &self.series_id {
            validate_reference("series", series_id)?;
        }

        usize::try_from(self.limit)
            .map_err(|_| AppError::InvalidArgument(format!("limit {} is too large", self.limit)))
    }

    fn candidate_filter(&self) -> CandidateFilter {
        let mut genres = self.genres.clone();
        genres.sort();
        genres.dedup();

        CandidateFilter {
            exclude_id: self.episode_id.clone(),
            genres,
            series_id: self.series_id.clone(),
        }
    }
}

/// A candidate with its total score
struct ScoredEpisode {
    score: f64,
    episode: Episode,
}

/// Highest score first, then episode id ascending
fn rank(a: &ScoredEpisode, b: &ScoredEpisode) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.episode.episode_id.cmp(&b.episode.episode_id))
}

/// Finds episodes related to the one being viewed
///
/// Candidates share at least one genre with the current episode or belong to
/// its series. Each is scored on genre overlap, same series, recency and
/// popularity; the best `limit` are returned, best first. An empty result is
/// not an error.
pub async fn find_related(
    store: &dyn EpisodeStore,
    query: RelatedQuery,
) -> AppResult<Vec<RelatedEpisode>> {
    find_related_at(store, query, Utc::now()).await
}

/// Same as [`find_related`], with recency measured against `now`
#[tracing::instrument(
    skip(store, query, now),
    fields(
        store = store.name(),
        episode_id = %query.episode_id,
        limit = query.limit,
    )
)]
pub async fn find_related_at(
    store: &dyn EpisodeStore,
    query: RelatedQuery,
    now: DateTime<Utc>,
) -> AppResult<Vec<RelatedEpisode>> {
    let limit = query.validate()?;
    let start = Instant::now();
    let filter = query.candidate_filter();

    let candidates = store.query_candidates(&filter).await?;
    let fetched = candidates.len();

    let mut scored: Vec<ScoredEpisode> = candidates
        .into_iter()
        .filter(|episode| filter.matches(episode))
        .map(|episode| {
            let breakdown = ScoreBreakdown::for_episode(
                &episode,
                &filter.genres,
                filter.series_id.as_deref(),
                now,
            );
            tracing::trace!(
                candidate = %episode.episode_id,
                genre = breakdown.genre,
                series = breakdown.series,
                recency = breakdown.recency,
                popularity = breakdown.popularity,
                "Scored candidate"
            );
            ScoredEpisode {
                score: breakdown.total(),
                episode,
            }
        })
        .collect();

    if scored.len() != fetched {
        tracing::warn!(
            fetched,
            eligible = scored.len(),
            "Store returned episodes outside the candidate filter"
        );
    }

    scored.sort_by(rank);
    scored.truncate(limit);

    tracing::debug!(
        candidates = fetched,
        returned = scored.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Related episodes ranked"
    );

    Ok(scored
        .iter()
        .map(|scored| RelatedEpisode::from(&scored.episode))
        .collect())
}
