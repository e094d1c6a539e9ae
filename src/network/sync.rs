use std::sync::Arc;
use std::time::Duration;

use actix_web::rt;
use futures::StreamExt;
use futures::stream;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use super::{KnownBlocks, PeerClient, PeerRegistry};
use crate::blockchain::{Block, Ledger};
use crate::consensus::{Consensus, SharedConsensus};
use crate::telemetry::NodeStats;

/// What happened to a block delivered by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GossipOutcome {
    Accepted,
    Duplicate,
    Ignored,
}

/// Peer discovery, periodic reconciliation and block gossip for one node.
///
/// The ledger, the peer registry and the known-block set each guard their own
/// state; no method here holds more than one of those locks at a time.
pub struct SyncService {
    ledger: Arc<Ledger>,
    consensus: SharedConsensus,
    peers: PeerRegistry,
    known: KnownBlocks,
    client: PeerClient,
    fanout: usize,
    stats: Arc<NodeStats>,
}

impl SyncService {
    pub fn new(
        ledger: Arc<Ledger>,
        consensus: SharedConsensus,
        peers: PeerRegistry,
        known: KnownBlocks,
        client: PeerClient,
        fanout: usize,
        stats: Arc<NodeStats>,
    ) -> Self {
        Self {
            ledger,
            consensus,
            peers,
            known,
            client,
            fanout: fanout.max(1),
            stats,
        }
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn known_blocks(&self) -> &KnownBlocks {
        &self.known
    }

    /// Add configured seed peers and announce ourselves to them.
    pub fn bootstrap(&self, seeds: &[String]) {
        for seed in seeds {
            if self.peers.add(seed) {
                info!("P2P - added seed peer {seed}");
                self.spawn_register(seed.clone());
            }
        }
    }

    /// Spawn the discovery and reconciliation timers.
    pub fn start(self: &Arc<Self>, discovery_every: Duration, sync_every: Duration) {
        let this = Arc::clone(self);
        rt::spawn(async move {
            let mut ticker = tokio::time::interval(discovery_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.discover_peers().await;
            }
        });

        let this = Arc::clone(self);
        rt::spawn(async move {
            let mut ticker = tokio::time::interval(sync_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.reconcile().await;
            }
        });
    }

    /// Register a peer that contacted us. Returns whether it was new.
    pub fn register_peer(&self, address: &str) -> bool {
        let added = self.peers.add(address);
        if added {
            info!("P2P - added peer: {address}");
        }
        added
    }

    /// One discovery pass: ask every known peer for its peer list and adopt
    /// (and register with) every address we did not know yet.
    pub async fn discover_peers(&self) {
        let targets = self.peers.addresses();
        stream::iter(targets)
            .for_each_concurrent(self.fanout, |peer| async move {
                let list = match self.client.fetch_peers(&peer).await {
                    Ok(list) => list,
                    Err(e) => {
                        warn!("P2P - failed to get peers from {peer}: {e}");
                        return;
                    }
                };
                self.peers.touch(&peer);
                for address in list {
                    if address != peer && self.register_peer(&address) {
                        self.spawn_register(address);
                    }
                }
            })
            .await;
    }

    /// One reconciliation pass: pull every peer's chain and adopt any that is
    /// strictly longer and valid. Invalid chains are ignored, not penalized.
    pub async fn reconcile(&self) {
        let targets = self.peers.addresses();
        stream::iter(targets)
            .for_each_concurrent(self.fanout, |peer| async move {
                let blocks = match self.client.fetch_chain(&peer).await {
                    Ok(blocks) => blocks,
                    Err(e) => {
                        warn!("P2P - failed to sync with {peer}: {e}");
                        return;
                    }
                };
                self.peers.touch(&peer);
                if blocks.len() > self.ledger.len() && self.ledger.replace(blocks) {
                    info!("P2P - blockchain replaced with longer chain from {peer}");
                }
            })
            .await;
    }

    /// Gossip a block this node just mined.
    pub fn announce(&self, block: Block) {
        self.known.mark_seen(&block.hash);
        self.broadcast(block, None);
    }

    /// Inbound gossip: dedupe, validate against the tip and consensus,
    /// append, then flood to everyone but the sender.
    pub fn handle_incoming(&self, block: Block, sender: Option<&str>) -> GossipOutcome {
        if !self.known.mark_seen(&block.hash) {
            self.stats.record_duplicate();
            debug!("P2P - already seen block {}", block.hash);
            return GossipOutcome::Duplicate;
        }

        let tip = self.ledger.latest();
        if !block.is_valid(&tip) {
            debug!(
                "P2P - block #{} does not extend tip #{}, leaving it to reconciliation",
                block.index, tip.index
            );
            return GossipOutcome::Ignored;
        }
        let approved = self
            .consensus
            .read()
            .expect("lock poisoned")
            .validate_block(&block);
        self.stats.record_consensus(approved);
        if !approved {
            debug!("P2P - consensus rejected block {}", block.hash);
            return GossipOutcome::Ignored;
        }
        if !self.ledger.accept_block(block.clone()) {
            return GossipOutcome::Ignored;
        }

        self.broadcast(block, sender);
        GossipOutcome::Accepted
    }

    /// Fire-and-forget fan-out with bounded concurrency.
    fn broadcast(&self, block: Block, exclude: Option<&str>) {
        let targets: Vec<String> = self
            .peers
            .addresses()
            .into_iter()
            .filter(|addr| Some(addr.as_str()) != exclude)
            .collect();
        if targets.is_empty() {
            return;
        }

        let client = self.client.clone();
        let fanout = self.fanout;
        rt::spawn(async move {
            let (client, block) = (&client, &block);
            stream::iter(targets)
                .for_each_concurrent(fanout, |peer| async move {
                    if let Err(e) = client.send_block(&peer, block).await {
                        warn!("P2P - failed to send block {} to {peer}: {e}", block.hash);
                    }
                })
                .await;
        });
    }

    fn spawn_register(&self, address: String) {
        let client = self.client.clone();
        rt::spawn(async move {
            if let Err(e) = client.register_with(&address).await {
                warn!("P2P - failed to register with peer {address}: {e}");
            }
        });
    }
}
