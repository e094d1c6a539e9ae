use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::{Client, Response};
use serde::Serialize;

use super::{NODE_ADDRESS_HEADER, RegisterPeerRequest};
use crate::blockchain::Block;
use crate::error::PeerError;

/// Outbound side of the peer wire protocol. Every call carries the
/// configured timeout and is retried a bounded number of times.
#[derive(Clone)]
pub struct PeerClient {
    http: Client,
    self_address: String,
    attempts: u32,
    backoff: Duration,
}

impl PeerClient {
    pub fn new(
        self_address: impl Into<String>,
        timeout: Duration,
        attempts: u32,
        backoff: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            self_address: self_address.into(),
            attempts: attempts.max(1),
            backoff,
        })
    }

    pub async fn fetch_peers(&self, peer: &str) -> Result<Vec<String>, PeerError> {
        let url = format!("http://{peer}/peers");
        let resp = self.with_retry(peer, || self.get(&url)).await?;
        resp.json().await.map_err(|e| PeerError::http(peer, e))
    }

    pub async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError> {
        let url = format!("http://{peer}/sync");
        let resp = self.with_retry(peer, || self.get(&url)).await?;
        resp.json().await.map_err(|e| PeerError::http(peer, e))
    }

    /// Announce ourselves to `peer`.
    pub async fn register_with(&self, peer: &str) -> Result<(), PeerError> {
        let url = format!("http://{peer}/register-peer");
        let body = RegisterPeerRequest {
            address: self.self_address.clone(),
        };
        self.with_retry(peer, || self.post(&url, &body)).await?;
        Ok(())
    }

    pub async fn send_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        let url = format!("http://{peer}/broadcast-block");
        self.with_retry(peer, || self.post(&url, block)).await?;
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.http
            .get(url)
            .header(NODE_ADDRESS_HEADER, &self.self_address)
            .send()
            .await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Response, reqwest::Error> {
        self.http
            .post(url)
            .header(NODE_ADDRESS_HEADER, &self.self_address)
            .json(body)
            .send()
            .await
    }

    /// Run `call` up to `attempts` times, doubling the pause between tries.
    /// Non-success statuses are not retried: the peer answered.
    async fn with_retry<F, Fut>(&self, peer: &str, call: F) -> Result<Response, PeerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut pause = self.backoff;
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    return Err(PeerError::Status {
                        peer: peer.to_string(),
                        status: resp.status().as_u16(),
                    });
                }
                Err(e) if attempt < self.attempts => {
                    debug!("PEER {peer} - attempt {attempt} failed ({e}), retrying in {pause:?}");
                    tokio::time::sleep(pause).await;
                    pause *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(PeerError::http(peer, e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use actix_web::{HttpResponse, web};

    use super::PeerClient;
    use crate::error::PeerError;
    use crate::testing::{dead_address, loopback, spawn_node, spawn_service};

    fn client(timeout_ms: u64, attempts: u32) -> PeerClient {
        PeerClient::new(
            "127.0.0.1:9400",
            Duration::from_millis(timeout_ms),
            attempts,
            Duration::from_millis(20),
        )
        .unwrap()
    }

    #[actix_web::test]
    async fn talks_to_a_live_node() {
        let (peer, state) = spawn_node(|_| {});
        state.ledger.append("remote".into(), 1);
        let client = client(500, 1);

        let chain = client.fetch_chain(&peer).await.unwrap();
        assert_eq!(chain, state.ledger.all());

        client.register_with(&peer).await.unwrap();
        assert_eq!(client.fetch_peers(&peer).await.unwrap(), vec!["127.0.0.1:9400"]);
    }

    #[actix_web::test]
    async fn silent_peer_times_out_after_every_attempt() {
        // accepts connections but never answers
        let listener = loopback();
        let peer = listener.local_addr().unwrap().to_string();

        let started = Instant::now();
        let err = client(100, 3).fetch_peers(&peer).await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            PeerError::Http { source, .. } => assert!(source.is_timeout(), "{source}"),
            other => panic!("unexpected error: {other}"),
        }
        // three timeouts plus 20ms and 40ms of backoff
        assert!(elapsed >= Duration::from_millis(360), "{elapsed:?}");
        drop(listener);
    }

    #[actix_web::test]
    async fn refused_connection_is_retried_with_backoff() {
        let peer = dead_address();
        let started = Instant::now();
        let err = client(200, 3).fetch_chain(&peer).await.unwrap_err();
        assert!(matches!(err, PeerError::Http { .. }));
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[actix_web::test]
    async fn error_status_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = web::Data::from(hits.clone());
        let peer = spawn_service(loopback(), move |cfg| {
            cfg.app_data(counter.clone()).route(
                "/peers",
                web::get().to(|count: web::Data<AtomicUsize>| async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    HttpResponse::InternalServerError().finish()
                }),
            );
        });

        let err = client(500, 3).fetch_peers(&peer).await.unwrap_err();
        assert!(matches!(err, PeerError::Status { status: 500, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn garbage_body_is_a_decode_error() {
        let peer = spawn_service(loopback(), |cfg| {
            cfg.route(
                "/sync",
                web::get().to(|| async { HttpResponse::Ok().body("not a chain") }),
            );
        });
        let err = client(500, 1).fetch_chain(&peer).await.unwrap_err();
        assert!(matches!(err, PeerError::Decode { .. }));
    }
}
