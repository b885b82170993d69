//! Climate Data API - server entry point
//!
//! Serves precipitation, station and temperature queries over the climate
//! dataset as JSON.
//!
//! Usage:
//!   cargo run --release
//!
//! Environment:
//!   DATABASE_URL             - PostgreSQL connection string (or set in .env)
//!   CLIMATE_SERVICE_CONFIG   - alternative path to climate_service.toml
//!   CLIMATE_SERVICE_PORT     - overrides [server] port
//!   CLIMATE_SERVICE_WORKERS  - overrides [server] workers
//!   RUST_LOG                 - log filter (default: info)

use climate_service::{config, endpoint};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Climate Data API starting");

    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Listening on {} with {} workers, tables in schema '{}'",
        config.listen_address(),
        config.server.workers,
        config.database.schema
    );

    if let Err(e) = endpoint::start_endpoint_server(&config) {
        log::error!("Startup failed:\n\n{}\n", e);
        std::process::exit(1);
    }
}
