mod app;
mod config;
mod db;
mod handlers;
mod models;
mod record;
mod service;
mod simulate;
mod state;
mod store;

use std::{process, sync::Arc};
use vitals_common::{bind_listener, init_tracing, shutdown_signal};

use crate::config::ServiceConfig;
use crate::db::PgStore;
use crate::state::AppState;
use crate::store::{MemoryStore, StoreError, VitalsStore};

#[tokio::main]
async fn main() {
    let _guards = init_tracing("telemetry-service");

    let config = ServiceConfig::from_env();
    if config.api_key.is_none() {
        tracing::warn!("API_KEY is not set; every upload will be rejected");
    }

    let store = match build_store(&config).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "connect store failed");
            process::exit(1);
        }
    };

    let port = config.port;
    let app = app::build_router(AppState::new(config, store));
    let listener = match bind_listener(port).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port, "bind listener failed");
            process::exit(1);
        }
    };
    tracing::info!(port, "telemetry service listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        process::exit(1);
    }
}

async fn build_store(config: &ServiceConfig) -> Result<Arc<dyn VitalsStore>, StoreError> {
    match config.database_url.as_deref() {
        Some(database_url) => Ok(Arc::new(PgStore::connect(database_url).await?)),
        None => {
            tracing::warn!("DATABASE_URL is not set; records are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
