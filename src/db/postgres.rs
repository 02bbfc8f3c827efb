use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use super::{CandidateFilter, EpisodeStore};
use crate::{
    error::{AppError, AppResult},
    models::Episode,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// Acquiring a connection fails after `acquire_timeout` instead of waiting
/// indefinitely on an unreachable server.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const EPISODE_COLUMNS: &str = r#"
    e.episode_id,
    e.series_id,
    COALESCE(
        ARRAY_AGG(eg.genre_id ORDER BY eg.genre_id) FILTER (WHERE eg.genre_id IS NOT NULL),
        '{}'
    )::TEXT[] AS genres,
    e.display_title,
    e.thumbnail,
    e.duration,
    e.views,
    e.updated_at
"#;

/// Raw episode row with genres aggregated into an array
#[derive(Debug, FromRow)]
struct EpisodeRow {
    episode_id: String,
    series_id: Option<String>,
    genres: Vec<String>,
    display_title: String,
    thumbnail: String,
    duration: String,
    views: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EpisodeRow> for Episode {
    type Error = AppError;

    fn try_from(row: EpisodeRow) -> AppResult<Self> {
        let views = u64::try_from(row.views).map_err(|_| {
            AppError::Internal(format!(
                "Episode {} has negative view count {}",
                row.episode_id, row.views
            ))
        })?;

        Ok(Episode {
            episode_id: row.episode_id,
            series_id: row.series_id,
            genres: row.genres,
            display_title: row.display_title,
            thumbnail: row.thumbnail,
            duration: row.duration,
            views,
            updated_at: row.updated_at,
        })
    }
}

/// Episode store backed by PostgreSQL
///
/// The candidate filter is evaluated by the database so only eligible rows
/// cross the wire.
#[derive(Clone)]
pub struct PgEpisodeStore {
    pool: PgPool,
}

impl PgEpisodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EpisodeStore for PgEpisodeStore {
    async fn query_candidates(&self, filter: &CandidateFilter) -> AppResult<Vec<Episode>> {
        let sql = format!(
            r#"
            SELECT {EPISODE_COLUMNS}
            FROM episodes e
            LEFT JOIN episode_genres eg ON eg.episode_id = e.episode_id
            WHERE e.episode_id <> $1
              AND (
                EXISTS (
                    SELECT 1 FROM episode_genres m
                    WHERE m.episode_id = e.episode_id AND m.genre_id = ANY($2)
                )
                OR ($3::TEXT IS NOT NULL AND e.series_id = $3)
              )
            GROUP BY e.episode_id
            ORDER BY e.episode_id
            "#
        );

        let rows: Vec<EpisodeRow> = sqlx::query_as(&sql)
            .bind(&filter.exclude_id)
            .bind(filter.genres.as_slice())
            .bind(filter.series_id.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Candidate query failed");
                AppError::from(e)
            })?;

        tracing::debug!(rows = rows.len(), "Fetched candidate rows");

        rows.into_iter().map(Episode::try_from).collect()
    }

    async fn find_episode(&self, episode_id: &str) -> AppResult<Option<Episode>> {
        let sql = format!(
            r#"
            SELECT {EPISODE_COLUMNS}
            FROM episodes e
            LEFT JOIN episode_genres eg ON eg.episode_id = e.episode_id
            WHERE e.episode_id = $1
            GROUP BY e.episode_id
            "#
        );

        let row: Option<EpisodeRow> = sqlx::query_as(&sql)
            .bind(episode_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Episode::try_from).transpose()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
