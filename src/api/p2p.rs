use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};

use super::models::{AppState, GossipResponse};
use crate::blockchain::Block;
use crate::network::{NODE_ADDRESS_HEADER, RegisterPeerRequest};

/// Known peer addresses, most recently seen first.
#[get("/peers")]
pub async fn get_peers(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.sync.peers().addresses())
}

#[post("/register-peer")]
pub async fn register_peer(
    state: web::Data<AppState>,
    body: web::Json<RegisterPeerRequest>,
) -> impl Responder {
    let address = body.address.trim();
    if address.is_empty() {
        return HttpResponse::BadRequest().body("Missing peer address");
    }
    state.sync.register_peer(address);
    HttpResponse::Ok().finish()
}

/// Full chain, for reconciliation by peers.
#[get("/sync")]
pub async fn get_sync(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.ledger.all())
}

/// Inbound gossip. Always 200 for a well-formed block; duplicates are no-ops.
#[post("/broadcast-block")]
pub async fn broadcast_block(
    state: web::Data<AppState>,
    req: HttpRequest,
    block: web::Json<Block>,
) -> impl Responder {
    let sender = sender_address(&req);
    let status = state.sync.handle_incoming(block.into_inner(), sender.as_deref());
    HttpResponse::Ok().json(GossipResponse { status })
}

/// The sender's advertised address, falling back to the first proxy hop.
fn sender_address(req: &HttpRequest) -> Option<String> {
    let headers = req.headers();
    if let Some(addr) = headers.get(NODE_ADDRESS_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(addr.trim().to_string());
    }
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test, web};

    use crate::api::{AppState, init_routes};
    use crate::blockchain::{Block, Blockchain};
    use crate::config::NodeConfig;

    fn node(address: &str) -> web::Data<AppState> {
        let config = NodeConfig {
            node_address: address.to_string(),
            ..NodeConfig::default()
        };
        web::Data::new(AppState::from_config(&config).unwrap())
    }

    #[actix_web::test]
    async fn received_block_is_appended_once() {
        let node_a = node("127.0.0.1:9101");
        let node_b = node("127.0.0.1:9102");
        let app_b =
            test::init_service(App::new().app_data(node_b.clone()).configure(init_routes)).await;

        let block = node_a.ledger.append("mined on A".into(), 1);
        assert_eq!(node_a.ledger.len(), 2);

        for expected in ["accepted", "duplicate"] {
            let req = test::TestRequest::post()
                .uri("/broadcast-block")
                .insert_header(("X-Node-Address", "127.0.0.1:9101"))
                .set_json(&block)
                .to_request();
            let resp: serde_json::Value = test::call_and_read_body_json(&app_b, req).await;
            assert_eq!(resp["status"], expected);
        }

        assert_eq!(node_b.ledger.len(), 2);
        assert_eq!(node_b.ledger.latest(), block);
        assert_eq!(node_b.sync.known_blocks().len(), 1);
    }

    #[actix_web::test]
    async fn malformed_block_is_a_bad_request() {
        let state = node("127.0.0.1:9103");
        let app = test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::post()
            .uri("/broadcast-block")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"index\": \"one\"}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.ledger.len(), 1);
    }

    #[actix_web::test]
    async fn register_then_list_peers() {
        let state = node("127.0.0.1:9104");
        let app = test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        for (address, code) in [
            ("127.0.0.1:9105", StatusCode::OK),
            ("127.0.0.1:9104", StatusCode::OK),
            ("", StatusCode::BAD_REQUEST),
        ] {
            let req = test::TestRequest::post()
                .uri("/register-peer")
                .set_json(serde_json::json!({ "address": address }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), code);
        }

        let req = test::TestRequest::post()
            .uri("/register-peer")
            .set_json(serde_json::json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/peers").to_request();
        let peers: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(peers, vec!["127.0.0.1:9105".to_string()]);
    }

    #[actix_web::test]
    async fn sync_serves_full_chain() {
        let state = node("127.0.0.1:9106");
        state.ledger.append("one".into(), 1);
        state.ledger.append("two".into(), 1);
        let app = test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::get().uri("/sync").to_request();
        let blocks: Vec<Block> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(blocks.len(), 3);
        assert!(Blockchain::is_valid_chain(&blocks));
    }

    #[actix_web::test]
    async fn invalid_peer_chain_is_not_installed() {
        let state = node("127.0.0.1:9107");

        let mut other = Blockchain::new();
        for i in 0..2 {
            assert!(other.try_append(Block::seal(other.last_block(), i.to_string(), 1)));
        }
        let mut blocks = other.blocks().to_vec();
        blocks[1].prev_hash = "0mismatch".into();

        assert!(!state.ledger.replace(blocks));
        assert_eq!(state.ledger.len(), 1);
    }
}
