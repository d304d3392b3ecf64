use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::storage::FilesystemMediaStore;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use yatube::config::AppConfig;
use yatube::state::AppState;
use yatube::utils::cache::PageCache;
use yatube::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("yatube=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    seed::seed_groups(&db, &config.seed.groups).await?;
    seed::ensure_indexes(&db).await?;

    let media = FilesystemMediaStore::new(config.media.root.clone(), config.media.max_image_size)
        .await
        .context("Failed to prepare media directory")?;
    info!("Storing media under {}", config.media.root.display());

    let page_cache = PageCache::new(Duration::from_secs(config.posts.index_cache_seconds));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config,
        media: Arc::new(media),
        page_cache: Arc::new(page_cache),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
