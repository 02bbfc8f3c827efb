use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Longest accepted episode, genre or series id
pub const MAX_REFERENCE_LEN: usize = 64;

/// An episode as stored, with everything the related-episode scorer reads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    /// Stable external identifier (not the storage key)
    pub episode_id: String,
    /// Series the episode belongs to, if any
    #[serde(default)]
    pub series_id: Option<String>,
    /// Genre ids, unordered
    #[serde(default)]
    pub genres: Vec<String>,
    pub display_title: String,
    pub thumbnail: String,
    /// Display duration such as "23:40"
    pub duration: String,
    pub views: u64,
    /// Last material update, used for freshness
    pub updated_at: DateTime<Utc>,
}

/// Projection returned to list views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelatedEpisode {
    pub episode_id: String,
    pub display_title: String,
    pub thumbnail: String,
    pub views: u64,
    pub duration: String,
}

impl From<&Episode> for RelatedEpisode {
    fn from(episode: &Episode) -> Self {
        Self {
            episode_id: episode.episode_id.clone(),
            display_title: episode.display_title.clone(),
            thumbnail: episode.thumbnail.clone(),
            views: episode.views,
            duration: episode.duration.clone(),
        }
    }
}

impl Episode {
    /// Number of distinct genres this episode shares with `genres`
    pub fn shared_genre_count(&self, genres: &[String]) -> usize {
        let mut shared: Vec<&String> = self
            .genres
            .iter()
            .filter(|genre| genres.contains(genre))
            .collect();
        shared.sort();
        shared.dedup();
        shared.len()
    }

    /// Checks the episode's own id and its genre and series references
    pub fn validate(&self) -> AppResult<()> {
        validate_reference("episode", &self.episode_id)?;
        for genre in &self.genres {
            validate_reference("genre", genre)?;
        }
        if let Some(series_id) = &self.series_id {
            validate_reference("series", series_id)?;
        }
        Ok(())
    }

    /// True when the episode belongs to `series_id`
    pub fn in_series(&self, series_id: Option<&str>) -> bool {
        match (series_id, self.series_id.as_deref()) {
            (Some(current), Some(own)) => current == own,
            _ => false,
        }
    }
}

/// Checks that an id is a well-formed reference
///
/// Ids are opaque to the service, but they end up in SQL parameters and URLs,
/// so only a conservative character set is accepted.
pub fn validate_reference(kind: &str, value: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::InvalidArgument(format!("{} id must not be empty", kind)));
    }

    if value.len() > MAX_REFERENCE_LEN {
        return Err(AppError::InvalidArgument(format!(
            "{} id exceeds {} characters",
            kind, MAX_REFERENCE_LEN
        )));
    }

    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));

    if !valid {
        return Err(AppError::InvalidArgument(format!(
            "{} id contains invalid characters: {:?}",
            kind, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn episode(genres: &[&str], series_id: Option<&str>) -> Episode {
        Episode {
            episode_id: "ep-1".to_string(),
            series_id: series_id.map(str::to_string),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            display_title: "Episode 1".to_string(),
            thumbnail: "/thumbs/ep-1.jpg".to_string(),
            duration: "23:40".to_string(),
            views: 42,
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_shared_genre_count() {
        let ep = episode(&["action", "comedy", "drama"], None);
        let current = vec!["comedy".to_string(), "drama".to_string(), "horror".to_string()];
        assert_eq!(ep.shared_genre_count(&current), 2);
        assert_eq!(ep.shared_genre_count(&[]), 0);
    }

    #[test]
    fn test_shared_genre_count_ignores_duplicates() {
        let ep = episode(&["action", "action"], None);
        assert_eq!(ep.shared_genre_count(&["action".to_string()]), 1);
    }

    #[test]
    fn test_in_series() {
        let ep = episode(&[], Some("s-1"));
        assert!(ep.in_series(Some("s-1")));
        assert!(!ep.in_series(Some("s-2")));
        assert!(!ep.in_series(None));
        assert!(!episode(&[], None).in_series(None));
    }

    #[test]
    fn test_validate_episode_references() {
        assert!(episode(&["action", "slice-of-life"], Some("s-1")).validate().is_ok());
        assert!(episode(&[], None).validate().is_ok());

        assert!(matches!(
            episode(&["slice of life"], None).validate(),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            episode(&["action"], Some("")).validate(),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_related_projection() {
        let related = RelatedEpisode::from(&episode(&["action"], Some("s-1")));
        assert_eq!(related.episode_id, "ep-1");
        assert_eq!(related.views, 42);
        assert_eq!(related.duration, "23:40");

        let json = serde_json::to_value(&related).unwrap();
        assert!(json.get("updated_at").is_none());
        assert!(json.get("genres").is_none());
    }

    #[test]
    fn test_episode_deserialize_defaults() {
        let json = r#"{
            "episode_id": "ep-9",
            "display_title": "Pilot",
            "thumbnail": "/t.jpg",
            "duration": "24:00",
            "views": 0,
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let ep: Episode = serde_json::from_str(json).unwrap();
        assert!(ep.genres.is_empty());
        assert_eq!(ep.series_id, None);
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("genre", "action").is_ok());
        assert!(validate_reference("episode", "one-piece-episode-1071").is_ok());
        assert!(validate_reference("series", "64b7f0c2e4b0a1d2c3e4f5a6").is_ok());

        assert!(matches!(
            validate_reference("genre", ""),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_reference("genre", "drop table"),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_reference("genre", &"a".repeat(MAX_REFERENCE_LEN + 1)),
            Err(AppError::InvalidArgument(_))
        ));
    }
}
