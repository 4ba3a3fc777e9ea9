use std::path::Path;
use std::sync::Arc;

use nudge_api::config::Config;
use nudge_api::db::{create_pool, create_redis_client, run_migrations, Cache};
use nudge_api::routes::{create_router, AppState};
use nudge_api::services::ScorerService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client).await;

    let scorer = Arc::new(ScorerService::init(Path::new(&config.model_path)));

    let state = AppState { db, cache, scorer };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("Shutdown signal received");
}
