use chrono::{DateTime, Duration, Utc};

use crate::models::Episode;

/// Points for the first shared genre
const FIRST_GENRE_POINTS: f64 = 20.0;
/// Points for each shared genre after the first
const EXTRA_GENRE_POINTS: f64 = 10.0;
const SAME_SERIES_POINTS: f64 = 25.0;
const POPULARITY_CAP: f64 = 10.0;

/// Recency steps as (maximum age in months, points), checked in order
const RECENCY_STEPS: [(f64, f64); 3] = [(1.0, 15.0), (3.0, 10.0), (6.0, 5.0)];
const DAYS_PER_MONTH: i64 = 30;

/// Per-candidate score components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub genre: f64,
    pub series: f64,
    pub recency: f64,
    pub popularity: f64,
}

impl ScoreBreakdown {
    /// Scores `episode` against the current episode's genres and series
    pub fn for_episode(
        episode: &Episode,
        genres: &[String],
        series_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            genre: genre_score(episode.shared_genre_count(genres)),
            series: series_score(episode.in_series(series_id)),
            recency: recency_score(episode.updated_at, now),
            popularity: popularity_score(episode.views),
        }
    }

    /// Sum of all components; not clamped
    pub fn total(&self) -> f64 {
        self.genre + self.series + self.recency + self.popularity
    }
}

/// 0 with no shared genres, otherwise 20 plus 10 per additional genre
pub fn genre_score(shared: usize) -> f64 {
    if shared == 0 {
        return 0.0;
    }
    FIRST_GENRE_POINTS + EXTRA_GENRE_POINTS * (shared - 1) as f64
}

pub fn series_score(same_series: bool) -> f64 {
    if same_series {
        SAME_SERIES_POINTS
    } else {
        0.0
    }
}

/// Age of `updated_at` in 30-day months, fractional
pub fn months_since(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed = now.signed_duration_since(updated_at);
    elapsed.num_milliseconds() as f64 / Duration::days(DAYS_PER_MONTH).num_milliseconds() as f64
}

/// Step function over age: 15 up to a month, 10 up to three, 5 up to six, then 0
///
/// Timestamps in the future count as fresh.
pub fn recency_score(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let months = months_since(updated_at, now);
    RECENCY_STEPS
        .iter()
        .find(|(max_months, _)| months <= *max_months)
        .map(|(_, points)| *points)
        .unwrap_or(0.0)
}

/// `min(10, 2 * log10(views + 1))`
pub fn popularity_score(views: u64) -> f64 {
    (2.0 * (views as f64 + 1.0).log10()).min(POPULARITY_CAP)
}
