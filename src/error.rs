use thiserror::Error;

/// Failure of a single outbound call to a peer. Never fatal to the node.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("request to {peer} failed: {source}")]
    Http {
        peer: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{peer} answered with status {status}")]
    Status { peer: String, status: u16 },
    #[error("could not decode response from {peer}: {source}")]
    Decode {
        peer: String,
        #[source]
        source: reqwest::Error,
    },
}

impl PeerError {
    pub fn http(peer: &str, source: reqwest::Error) -> Self {
        if source.is_decode() {
            Self::Decode {
                peer: peer.to_string(),
                source,
            }
        } else {
            Self::Http {
                peer: peer.to_string(),
                source,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored chain failed validation")]
    InvalidChain,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("payload pool is full ({capacity} pending)")]
    Full { capacity: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StakeError {
    #[error("stake of {stake} would overflow the total stake")]
    Overflow { stake: u64 },
}

/// Failure to assemble the node before it starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}
