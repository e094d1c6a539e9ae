mod api;
mod blockchain;
mod config;
mod consensus;
mod error;
mod network;
mod pool;
mod storage;
mod telemetry;
#[cfg(test)]
mod testing;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use config::NodeConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = NodeConfig::from_env();
    let state = AppState::from_config(&config).map_err(std::io::Error::other)?;
    let state = web::Data::new(state);

    info!(
        "⛓️ Starting node {} (consensus={:?}, difficulty={}, height={})",
        config.node_address,
        config.consensus,
        config.difficulty,
        state.ledger.len()
    );
    if let Some(path) = &config.data_file {
        info!("Checkpointing chain to {}", path.display());
    }

    state.sync.bootstrap(&config.seed_peers);
    state
        .sync
        .start(config.discovery_interval, config.sync_interval);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
