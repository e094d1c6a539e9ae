//! Live HTTP nodes on loopback for tests that cross the wire.

use std::net::TcpListener;
use std::time::Duration;

use actix_web::web::{self, ServiceConfig};
use actix_web::{App, HttpServer, rt};

use crate::api::{AppState, init_routes};
use crate::config::NodeConfig;

/// Serve `routes` on an ephemeral loopback port; returns `host:port`.
pub fn spawn_service(
    listener: TcpListener,
    routes: impl Fn(&mut ServiceConfig) + Send + Clone + 'static,
) -> String {
    let address = listener.local_addr().unwrap().to_string();
    let server = HttpServer::new(move || App::new().configure(routes.clone()))
        .workers(1)
        .disable_signals()
        .listen(listener)
        .unwrap()
        .run();
    rt::spawn(server);
    address
}

pub fn loopback() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").unwrap()
}

/// A full node with short peer timeouts, reachable at the returned address.
pub fn spawn_node(tweak: impl FnOnce(&mut NodeConfig)) -> (String, web::Data<AppState>) {
    let listener = loopback();
    let mut config = NodeConfig {
        node_address: listener.local_addr().unwrap().to_string(),
        peer_timeout: Duration::from_millis(500),
        peer_retry_attempts: 1,
        peer_retry_backoff: Duration::from_millis(10),
        ..NodeConfig::default()
    };
    tweak(&mut config);
    let state = web::Data::new(AppState::from_config(&config).unwrap());

    let data = state.clone();
    let address = spawn_service(listener, move |cfg| {
        cfg.app_data(data.clone());
        init_routes(cfg);
    });
    (address, state)
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if check() {
            return true;
        }
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// An address nothing listens on.
pub fn dead_address() -> String {
    let listener = loopback();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    address
}
