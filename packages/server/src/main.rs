use std::sync::Arc;

use anyhow::Context;
use common::storage::FilesystemBlobStore;
use server::config::AppConfig;
use server::database::init_db;
use server::image::{ImageService, SeaOrmImageRepository};
use server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;

    let store =
        FilesystemBlobStore::new(config.storage.root.clone(), config.storage.max_blob_size)
            .await
            .context("Failed to initialize blob storage")?;
    info!(root = %config.storage.root.display(), "Blob storage ready");

    let images = ImageService::new(
        Arc::new(store),
        Arc::new(SeaOrmImageRepository::new(db)),
        config.storage.clone(),
    )
    .context("Invalid storage configuration")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        images: Arc::new(images),
        config: Arc::new(config),
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
