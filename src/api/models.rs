use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, BlockFeed, Ledger};
use crate::config::NodeConfig;
use crate::consensus::{ConsensusEngine, SharedConsensus};
use crate::error::StartupError;
use crate::network::{GossipOutcome, KnownBlocks, Peer, PeerClient, PeerRegistry, SyncService};
use crate::pool::PayloadPool;
use crate::storage::JsonFileStore;
use crate::telemetry::{NodeStats, StatsCounters};

/// Shared application state: the ledger, its consensus rule, the sync
/// protocol and the collaborators hanging off them.
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub consensus: SharedConsensus,
    pub sync: Arc<SyncService>,
    pub payloads: PayloadPool,
    pub stats: Arc<NodeStats>,
    pub events: Arc<BlockFeed>,
}

impl AppState {
    pub fn from_config(config: &NodeConfig) -> Result<Self, StartupError> {
        let stats = Arc::new(NodeStats::new()?);
        let events = Arc::new(BlockFeed::new(config.event_buffer));
        let ledger = match &config.data_file {
            Some(path) => Ledger::open(Box::new(JsonFileStore::new(path))),
            None => Ledger::default(),
        };
        let ledger = Arc::new(
            ledger
                .with_observer(stats.clone())
                .with_observer(events.clone()),
        );
        let consensus = ConsensusEngine::new(config.consensus, config.difficulty).shared();

        let client = PeerClient::new(
            config.node_address.clone(),
            config.peer_timeout,
            config.peer_retry_attempts,
            config.peer_retry_backoff,
        )?;
        let sync = SyncService::new(
            ledger.clone(),
            consensus.clone(),
            PeerRegistry::new(config.node_address.clone(), config.max_peers),
            KnownBlocks::new(config.max_known_blocks),
            client,
            config.fanout_concurrency,
            stats.clone(),
        );

        Ok(Self {
            ledger,
            consensus,
            sync: Arc::new(sync),
            payloads: PayloadPool::new(config.payload_pool_size),
            stats,
            events,
        })
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub length: usize,
    pub difficulty: u32,
    pub chain: Vec<Block>,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct MineRequest {
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub appended: bool,
    pub mined_index: u64,
    pub hash: String,
    pub nonce: String,
    pub difficulty: u32,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
    pub consensus: &'static str,
}

#[derive(Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty: u32,
}

/* ---------- Payload API Models ---------- */

#[derive(Deserialize)]
pub struct NewPayloadRequest {
    pub data: String,
}

#[derive(Serialize)]
pub struct PayloadsResponse {
    pub size: usize,
    pub payloads: Vec<String>,
}

/* ---------- Stake API Models ---------- */

#[derive(Deserialize)]
pub struct StakeRequest {
    pub address: String,
    pub stake: u64,
}

#[derive(Serialize)]
pub struct ValidatorResponse {
    pub validator: Option<String>,
    pub total_stake: u64,
}

/* ---------- P2P Models ---------- */

#[derive(Serialize)]
pub struct GossipResponse {
    pub status: GossipOutcome,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub difficulty: u32,
    pub consensus: &'static str,
    pub node_address: String,
    pub peer_count: usize,
    pub peers: Vec<Peer>,
    pub known_blocks: usize,
    pub payload_pool_size: usize,
    #[serde(flatten)]
    pub counters: StatsCounters,
}
