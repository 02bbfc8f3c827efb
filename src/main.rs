use std::sync::Arc;

use related_api::{
    config::{Config, StoreBackend},
    db::{self, EpisodeStore, InMemoryEpisodeStore, PgEpisodeStore},
    routes::{create_router, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("related_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let store = build_store(&config).await?;

    let state = AppState::new(store)
        .with_store_timeout(config.store_timeout())
        .with_default_limit(config.default_related_limit);
    let app = create_router(Arc::new(state));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn EpisodeStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(
                &config.database_url,
                config.max_connections,
                config.store_timeout(),
            )
            .await?;
            db::postgres::run_migrations(&pool).await?;
            tracing::info!("Connected to PostgreSQL and applied migrations");
            Ok(Arc::new(PgEpisodeStore::new(pool)))
        }
        StoreBackend::Memory => {
            let store = match &config.seed_path {
                Some(path) => InMemoryEpisodeStore::from_seed_file(path).await?,
                None => {
                    tracing::warn!("In-memory store started without a seed file");
                    InMemoryEpisodeStore::default()
                }
            };
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
