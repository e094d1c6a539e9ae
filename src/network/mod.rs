pub mod client;
pub mod known;
pub mod peers;
pub mod sync;

use serde::{Deserialize, Serialize};

pub use client::PeerClient;
pub use known::KnownBlocks;
pub use peers::{Peer, PeerRegistry};
pub use sync::{GossipOutcome, SyncService};

/// Set on every outbound peer call; identifies the sender for gossip forwarding.
pub const NODE_ADDRESS_HEADER: &str = "X-Node-Address";

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterPeerRequest {
    pub address: String,
}
