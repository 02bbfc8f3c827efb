pub mod memory;
pub mod postgres;

pub use memory::InMemoryEpisodeStore;
pub use postgres::{create_pool, PgEpisodeStore};

use crate::{error::AppResult, models::Episode};

/// Eligibility filter for related-episode candidates
///
/// An episode is a candidate when it is not the excluded episode and it either
/// shares a genre with `genres` or belongs to `series_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    pub exclude_id: String,
    pub genres: Vec<String>,
    pub series_id: Option<String>,
}

impl CandidateFilter {
    pub fn matches(&self, episode: &Episode) -> bool {
        if episode.episode_id == self.exclude_id {
            return false;
        }

        episode.genres.iter().any(|genre| self.genres.contains(genre))
            || episode.in_series(self.series_id.as_deref())
    }
}

/// Read-only access to the episode collection
///
/// Implementations may evaluate `CandidateFilter` inside the backing store or
/// fetch and filter in process; both must yield the same candidate set.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Returns every episode matching the filter, in store order
    async fn query_candidates(&self, filter: &CandidateFilter) -> AppResult<Vec<Episode>>;

    /// Looks up a single episode by its external id
    async fn find_episode(&self, episode_id: &str) -> AppResult<Option<Episode>>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}
