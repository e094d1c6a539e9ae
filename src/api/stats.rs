use actix_web::{HttpResponse, Responder, get, web};
use log::error;

use super::models::{AppState, StatsResponse};
use crate::consensus::Consensus;

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    // each component is locked on its own, never together
    let height = state.ledger.len();
    let (difficulty, consensus) = {
        let engine = state.consensus.read().expect("lock poisoned");
        (engine.difficulty(), engine.name())
    };
    let registry = state.sync.peers();
    let peers = registry.snapshot();

    HttpResponse::Ok().json(StatsResponse {
        height,
        difficulty,
        consensus,
        node_address: registry.self_address().to_string(),
        peer_count: peers.len(),
        peers,
        known_blocks: state.sync.known_blocks().len(),
        payload_pool_size: state.payloads.len(),
        counters: state.stats.counters(),
    })
}

/// Prometheus scrape endpoint.
#[get("/metrics")]
pub async fn get_metrics(state: web::Data<AppState>) -> impl Responder {
    state
        .stats
        .observe(state.ledger.len(), state.sync.peers().len());
    match state.stats.render() {
        Ok((content_type, body)) => HttpResponse::Ok().content_type(content_type).body(body),
        Err(e) => {
            error!("METRICS - encoding failed: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
