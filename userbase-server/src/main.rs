//! userbase server binary

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use userbase_core::{MemoryUserStore, UserService, UserStore};
use userbase_engine::StorageEngine;
use userbase_server::{LogFormat, ServerConfig, UserbaseServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    init_tracing(config.log_format);

    info!("Starting userbase server");
    info!("Bind address: {}", config.bind);

    if config.ephemeral_secret {
        warn!("No token secret configured; generated one for this run, tokens will not survive a restart");
    }

    let store: Arc<dyn UserStore> = if config.in_memory {
        info!("Using in-memory user store");
        Arc::new(MemoryUserStore::new())
    } else {
        if !config.data_dir.exists() {
            std::fs::create_dir_all(&config.data_dir)?;
            info!("Created data directory: {}", config.data_dir.display());
        }
        info!("Data directory: {}", config.data_dir.display());

        let engine = StorageEngine::new(&config.data_dir)
            .context("Failed to initialize storage engine")?;
        Arc::new(engine.users()?)
    };

    let service = UserService::new(store, &config.auth);
    UserbaseServer::new(service).serve(config.bind).await?;

    info!("Server shutdown gracefully");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
