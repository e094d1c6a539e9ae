use actix_web::{HttpResponse, Responder, get, post, web};
use log::debug;

use super::models::{AppState, NewPayloadRequest, PayloadsResponse};

/// Queue an opaque payload for a future block.
#[post("/payloads/")]
pub async fn post_payload(
    state: web::Data<AppState>,
    body: web::Json<NewPayloadRequest>,
) -> impl Responder {
    if body.data.is_empty() {
        return HttpResponse::BadRequest().body("data must not be empty");
    }
    match state.payloads.push(body.into_inner().data) {
        Ok(size) => {
            debug!("POOL - payload queued, {size} pending");
            HttpResponse::Accepted().json(PayloadsResponse {
                size,
                payloads: Vec::new(),
            })
        }
        Err(e) => HttpResponse::Conflict().body(e.to_string()),
    }
}

#[get("/payloads/")]
pub async fn get_payloads(state: web::Data<AppState>) -> impl Responder {
    let payloads = state.payloads.pending();
    HttpResponse::Ok().json(PayloadsResponse {
        size: payloads.len(),
        payloads,
    })
}
