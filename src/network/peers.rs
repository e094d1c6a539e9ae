use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::debug;
use lru::LruCache;
use serde::Serialize;

/// A remote node known to this one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    pub address: String,
    pub last_seen: DateTime<Utc>,
}

/// Capacity-limited peer set; the least recently seen peer is evicted first.
pub struct PeerRegistry {
    self_address: String,
    peers: Mutex<LruCache<String, Peer>>,
}

impl PeerRegistry {
    pub fn new(self_address: impl Into<String>, capacity: NonZeroUsize) -> Self {
        Self {
            self_address: self_address.into(),
            peers: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Insert a new peer. Returns `false` for our own address, blank input,
    /// or an address that is already known (which only refreshes it).
    pub fn add(&self, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() || address == self.self_address {
            return false;
        }
        let mut peers = self.peers.lock().expect("mutex poisoned");
        if let Some(peer) = peers.get_mut(address) {
            peer.last_seen = Utc::now();
            return false;
        }
        if let Some((evicted, _)) = peers.push(
            address.to_string(),
            Peer {
                address: address.to_string(),
                last_seen: Utc::now(),
            },
        ) {
            debug!("PEERS - registry full, evicted {evicted}");
        }
        true
    }

    /// Refresh `last_seen` after a successful exchange with a known peer.
    pub fn touch(&self, address: &str) {
        let mut peers = self.peers.lock().expect("mutex poisoned");
        if let Some(peer) = peers.get_mut(address) {
            peer.last_seen = Utc::now();
        }
    }

    /// Known addresses, most recently seen first.
    pub fn addresses(&self) -> Vec<String> {
        let peers = self.peers.lock().expect("mutex poisoned");
        peers.iter().map(|(addr, _)| addr.clone()).collect()
    }

    pub fn snapshot(&self) -> Vec<Peer> {
        let peers = self.peers.lock().expect("mutex poisoned");
        peers.iter().map(|(_, peer)| peer.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.lock().expect("mutex poisoned").len()
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }
}
