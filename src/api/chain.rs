use std::time::Instant;

use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, info, warn};

use super::models::{
    AppState, ChainResponse, DifficultyResponse, MineRequest, MineResponse, SetDifficultyRequest,
    ValidateResponse,
};
use crate::blockchain::DIFF_MAX;
use crate::consensus::Consensus;

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let chain = state.ledger.all();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        difficulty: current_difficulty(&state),
        chain,
    })
}

#[get("/blocks/latest/")]
pub async fn latest_block(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.ledger.latest())
}

#[get("/blocks/{hash}/")]
pub async fn get_block(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let hash = path.into_inner().0;
    match state.ledger.find(&hash) {
        Some(block) => HttpResponse::Ok().json(block),
        None => HttpResponse::NotFound().body("block not found"),
    }
}

/// Re-validate the whole stored chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ValidateResponse {
        valid: state.ledger.is_valid(),
        length: state.ledger.len(),
        difficulty: current_difficulty(&state),
    })
}

/// Seal a block and gossip it:
/// - payload from the body, otherwise the oldest pending payload
/// - difficulty from the consensus engine
/// - nonce search on the blocking pool, off the worker thread
/// - 409 when the tip moved while sealing (block not appended)
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let (payload, pooled) = match req.into_inner().data.filter(|d| !d.is_empty()) {
        Some(data) => (data, false),
        None => match state.payloads.pop() {
            Some(data) => (data, true),
            None => {
                return HttpResponse::BadRequest()
                    .body("no data supplied and the payload pool is empty");
            }
        },
    };
    let difficulty = current_difficulty(&state);

    let t0 = Instant::now();
    let ledger = state.ledger.clone();
    let block = match web::block(move || ledger.append(payload, difficulty)).await {
        Ok(block) => block,
        Err(e) => {
            error!("MINER - sealing task failed: {e}");
            return HttpResponse::InternalServerError().body("sealing failed");
        }
    };
    state.stats.record_seal(t0.elapsed());

    let appended = state.ledger.holds(&block);
    let resp = MineResponse {
        appended,
        mined_index: block.index,
        hash: block.hash.clone(),
        nonce: block.nonce.clone(),
        difficulty,
    };

    if !appended {
        warn!("MINER - block #{} lost the race for the tip", block.index);
        if pooled {
            if let Err(e) = state.payloads.requeue(block.data) {
                warn!("MINER - dropping stale payload of block #{}: {e}", block.index);
            }
        }
        return HttpResponse::Conflict().json(resp);
    }

    info!(
        "MINER - sealed block #{} in {} ms (hash={})",
        block.index,
        t0.elapsed().as_millis(),
        block.hash
    );
    state.sync.announce(block);
    HttpResponse::Ok().json(resp)
}

/// Get current difficulty.
#[get("/difficulty/")]
pub async fn get_difficulty(state: web::Data<AppState>) -> impl Responder {
    let engine = state.consensus.read().expect("lock poisoned");
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: engine.difficulty(),
        consensus: engine.name(),
    })
}

/// Update difficulty (affects future blocks only).
#[post("/difficulty/")]
pub async fn set_difficulty(
    state: web::Data<AppState>,
    body: web::Json<SetDifficultyRequest>,
) -> impl Responder {
    if body.difficulty > DIFF_MAX {
        return HttpResponse::BadRequest()
            .body(format!("difficulty too high for dev mode (max {DIFF_MAX})"));
    }
    let mut engine = state.consensus.write().expect("lock poisoned");
    engine.set_difficulty(body.difficulty);
    info!("CONSENSUS - difficulty set to {}", body.difficulty);
    HttpResponse::Ok().json(DifficultyResponse {
        difficulty: engine.difficulty(),
        consensus: engine.name(),
    })
}

fn current_difficulty(state: &AppState) -> u32 {
    state.consensus.read().expect("lock poisoned").difficulty()
}
