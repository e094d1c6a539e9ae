use std::env;
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::blockchain::DEFAULT_DIFFICULTY;
use crate::consensus::ConsensusKind;

/// Node settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    /// Address peers use to reach us; also what we exclude from discovery.
    pub node_address: String,
    pub seed_peers: Vec<String>,
    pub difficulty: u32,
    pub consensus: ConsensusKind,
    pub discovery_interval: Duration,
    pub sync_interval: Duration,
    pub peer_timeout: Duration,
    pub peer_retry_attempts: u32,
    pub peer_retry_backoff: Duration,
    pub fanout_concurrency: usize,
    pub max_peers: NonZeroUsize,
    pub max_known_blocks: NonZeroUsize,
    pub payload_pool_size: usize,
    /// Tip changes buffered per dashboard subscriber before it starts lagging.
    pub event_buffer: usize,
    pub data_file: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            node_address: "127.0.0.1:8080".to_string(),
            seed_peers: Vec::new(),
            difficulty: DEFAULT_DIFFICULTY,
            consensus: ConsensusKind::ProofOfWork,
            discovery_interval: Duration::from_secs(30),
            sync_interval: Duration::from_secs(60),
            peer_timeout: Duration::from_millis(5000),
            peer_retry_attempts: 2,
            peer_retry_backoff: Duration::from_millis(200),
            fanout_concurrency: 8,
            max_peers: NonZeroUsize::new(128).expect("non-zero"),
            max_known_blocks: NonZeroUsize::new(10_000).expect("non-zero"),
            payload_pool_size: 1000,
            event_buffer: 256,
            data_file: None,
        }
    }
}

impl NodeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing or unparseable keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let host = lookup("HOST").unwrap_or(d.host);
        let port = parse_or(&lookup, "PORT", d.port);
        let node_address = lookup("NODE_ADDRESS")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("{host}:{port}"));
        let seed_peers = lookup("SEED_PEERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            node_address,
            seed_peers,
            difficulty: parse_or(&lookup, "BLOCKCHAIN_DIFFICULTY", d.difficulty),
            consensus: parse_or(&lookup, "CONSENSUS", d.consensus),
            discovery_interval: secs_or(&lookup, "DISCOVERY_INTERVAL_SECS", d.discovery_interval),
            sync_interval: secs_or(&lookup, "SYNC_INTERVAL_SECS", d.sync_interval),
            peer_timeout: millis_or(&lookup, "PEER_TIMEOUT_MS", d.peer_timeout),
            peer_retry_attempts: parse_or(&lookup, "PEER_RETRY_ATTEMPTS", d.peer_retry_attempts),
            peer_retry_backoff: millis_or(&lookup, "PEER_RETRY_BACKOFF_MS", d.peer_retry_backoff),
            fanout_concurrency: parse_or(&lookup, "FANOUT_CONCURRENCY", d.fanout_concurrency),
            max_peers: parse_or(&lookup, "MAX_PEERS", d.max_peers),
            max_known_blocks: parse_or(&lookup, "MAX_KNOWN_BLOCKS", d.max_known_blocks),
            payload_pool_size: parse_or(&lookup, "PAYLOAD_POOL_SIZE", d.payload_pool_size),
            event_buffer: parse_or(&lookup, "EVENT_BUFFER", d.event_buffer),
            data_file: lookup("DATA_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            host,
            port,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("CONFIG - {key}={raw:?} is invalid ({e}), using default");
            default
        }
    }
}

fn secs_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_or(lookup, key, default.as_secs()))
}

fn millis_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    Duration::from_millis(parse_or(lookup, key, default.as_millis() as u64))
}
