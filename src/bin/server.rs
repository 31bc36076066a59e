use log::{error, info, warn};
use std::sync::Arc;

use rusty_relay::config::ServerConfig;
use rusty_relay::core::Server;
use rusty_relay::storage::{MemoryStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config from the environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, database={}",
        config.host, config.port, config.database_url
    );

    // Open the storage backend
    let storage: Arc<dyn Storage> = if config.database_url == "memory" {
        warn!("Using in-memory storage; messages will not survive a restart");
        Arc::new(MemoryStorage::new())
    } else {
        match SqliteStorage::connect(&config.database_url).await {
            Ok(storage) => Arc::new(storage),
            Err(e) => {
                error!("Failed to open storage: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Bind and run the server
    let server = match Server::bind(config, storage).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Rusty Relay server");

    if let Err(e) = server.run().await {
        error!("Server terminated: {}", e);
        std::process::exit(1);
    }
}
