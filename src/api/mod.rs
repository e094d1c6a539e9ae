mod chain;
mod events;
mod health;
pub mod models;
mod p2p;
mod payloads;
mod stake;
mod stats;

use actix_web::HttpResponse;
use actix_web::error::InternalError;
use actix_web::web::{self, ServiceConfig};
use log::debug;

pub use models::AppState;

/// Peer wire protocol at the root, facade under `/api/v1`.
pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.app_data(json_config())
        .service(p2p::get_peers)
        .service(p2p::register_peer)
        .service(p2p::get_sync)
        .service(p2p::broadcast_block)
        .service(stats::get_metrics)
        .service(
            web::scope("/api/v1")
                .service(health::health_check)
                .service(chain::get_chain)
                .service(chain::latest_block)
                .service(chain::get_block)
                .service(chain::validate_chain)
                .service(chain::mine_block)
                .service(chain::get_difficulty)
                .service(chain::set_difficulty)
                .service(payloads::post_payload)
                .service(payloads::get_payloads)
                .service(stake::post_staker)
                .service(stake::get_validator)
                .service(stats::get_stats)
                .service(events::block_events),
        );
}

/// Malformed bodies are a request-level failure: 400 with the parse error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        debug!("{} {} - bad body: {err}", req.method(), req.path());
        let resp = HttpResponse::BadRequest().body(err.to_string());
        InternalError::from_response(err, resp).into()
    })
}
