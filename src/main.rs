use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_pixel_tracker::config::load_config;
use ai_pixel_tracker::routes::{create_router, AppState};
use ai_pixel_tracker::services::retention::run_retention_sweep;
use ai_pixel_tracker::store::{EventStore, MemoryEventStore, PgEventStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;

    let store: Arc<dyn EventStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let store = PgEventStore::new(pool);
            store.ensure_schema().await?;
            info!("connected to Postgres event store");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, events will be kept in memory only");
            Arc::new(MemoryEventStore::new())
        }
    };

    tokio::spawn(run_retention_sweep(store.clone(), config.retention_days));

    let state = AppState {
        store,
        public_url: config.public_url.clone(),
    };
    let app = create_router(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    info!(address = %config.server_address, "ai-pixel-tracker listening");
    axum::serve(listener, app).await?;

    Ok(())
}
