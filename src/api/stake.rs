use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, StakeRequest, ValidatorResponse};

#[post("/stakers/")]
pub async fn post_staker(state: web::Data<AppState>, body: web::Json<StakeRequest>) -> impl Responder {
    let address = body.address.trim();
    if address.is_empty() {
        return HttpResponse::BadRequest().body("address required");
    }
    let mut engine = state.consensus.write().expect("lock poisoned");
    let Some(pos) = engine.as_stake_mut() else {
        return HttpResponse::BadRequest().body("node is not running proof-of-stake");
    };
    match pos.add_staker(address, body.stake) {
        Ok(total_stake) => {
            info!("STAKE - {address} now stakes {}", body.stake);
            HttpResponse::Ok().json(ValidatorResponse {
                validator: None,
                total_stake,
            })
        }
        Err(e) => {
            warn!("STAKE - rejected stake from {address}: {e}");
            HttpResponse::BadRequest().body(e.to_string())
        }
    }
}

/// Draw a validator weighted by stake.
#[get("/validator/")]
pub async fn get_validator(state: web::Data<AppState>) -> impl Responder {
    let engine = state.consensus.read().expect("lock poisoned");
    let Some(pos) = engine.as_stake() else {
        return HttpResponse::BadRequest().body("node is not running proof-of-stake");
    };
    let validator = pos
        .select_validator(&mut rand::thread_rng())
        .map(str::to_string);
    HttpResponse::Ok().json(ValidatorResponse {
        validator,
        total_stake: pos.total_stake(),
    })
}
