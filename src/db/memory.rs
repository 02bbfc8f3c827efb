use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{CandidateFilter, EpisodeStore};
use crate::{
    error::{AppError, AppResult},
    models::Episode,
};

/// Episode store held in process memory
///
/// Keeps insertion order, which stands in for the storage order a database
/// would return. Cloning shares the same underlying collection.
#[derive(Clone, Default)]
pub struct InMemoryEpisodeStore {
    episodes: Arc<RwLock<Vec<Episode>>>,
}

impl InMemoryEpisodeStore {
    pub fn new(episodes: Vec<Episode>) -> Self {
        Self {
            episodes: Arc::new(RwLock::new(episodes)),
        }
    }

    /// Loads episodes from a JSON array on disk
    pub async fn from_seed_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Internal(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;

        let store = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            episodes = store.len().await,
            "Loaded episode seed file"
        );
        Ok(store)
    }

    /// Parses a JSON array of episodes, rejecting malformed references and
    /// duplicate episode ids
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let episodes: Vec<Episode> = serde_json::from_str(raw)
            .map_err(|e| AppError::Internal(format!("Seed deserialization error: {}", e)))?;

        {
            let mut seen = HashSet::new();
            for episode in &episodes {
                episode.validate().map_err(|e| {
                    AppError::Internal(format!(
                        "Invalid seed episode {:?}: {}",
                        episode.episode_id, e
                    ))
                })?;
                if !seen.insert(episode.episode_id.as_str()) {
                    return Err(AppError::Internal(format!(
                        "Duplicate seed episode {:?}",
                        episode.episode_id
                    )));
                }
            }
        }

        Ok(Self::new(episodes))
    }

    pub async fn len(&self) -> usize {
        self.episodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.episodes.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl EpisodeStore for InMemoryEpisodeStore {
    async fn query_candidates(&self, filter: &CandidateFilter) -> AppResult<Vec<Episode>> {
        let episodes = self.episodes.read().await;
        Ok(episodes
            .iter()
            .filter(|episode| filter.matches(episode))
            .cloned()
            .collect())
    }

    async fn find_episode(&self, episode_id: &str) -> AppResult<Option<Episode>> {
        let episodes = self.episodes.read().await;
        Ok(episodes
            .iter()
            .find(|episode| episode.episode_id == episode_id)
            .cloned())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
