use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{GENESIS_DATA, GENESIS_DIFFICULTY, GENESIS_TIMESTAMP};

/// A sealed ledger entry. Immutable once `hash` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: String, // RFC 3339, advisory only
    pub data: String,
    pub hash: String,
    pub prev_hash: String,
    pub difficulty: u32,
    pub nonce: String, // lowercase hex of the winning counter
}

impl Block {
    /// The fixed first block shared by every node.
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            timestamp: GENESIS_TIMESTAMP.to_string(),
            data: GENESIS_DATA.to_string(),
            hash: String::new(),
            prev_hash: String::new(),
            difficulty: GENESIS_DIFFICULTY,
            nonce: String::new(),
        };
        block.mine();
        block
    }

    /// Seal a new block on top of `previous`: sequential nonce search
    /// (0, 1, 2, ... in hex) until the digest has `difficulty` leading
    /// zero hex characters. Blocks the calling thread until it succeeds.
    pub fn seal(previous: &Block, data: String, difficulty: u32) -> Self {
        let mut block = Self {
            index: previous.index + 1,
            timestamp: Utc::now().to_rfc3339(),
            data,
            hash: String::new(),
            prev_hash: previous.hash.clone(),
            difficulty,
            nonce: String::new(),
        };
        block.mine();
        block
    }

    fn mine(&mut self) {
        let mut counter: u64 = 0;
        loop {
            self.nonce = format!("{counter:x}");
            let candidate = self.compute_hash();
            if hash_meets_difficulty(&candidate, self.difficulty) {
                self.hash = candidate;
                return;
            }
            counter = counter.wrapping_add(1);
        }
    }

    /// SHA-256 over index, timestamp, data, prev_hash and nonce, hex-encoded.
    pub fn compute_hash(&self) -> String {
        let preimage = format!(
            "{}{}{}{}{}",
            self.index, self.timestamp, self.data, self.prev_hash, self.nonce
        );
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Structural successor check: sequential index, linked `prev_hash` and
    /// a stored hash that recomputes. Difficulty is left to consensus.
    pub fn is_valid(&self, previous: &Block) -> bool {
        previous.index + 1 == self.index
            && self.prev_hash == previous.hash
            && self.compute_hash() == self.hash
    }

    /// True when the stored hash satisfies the difficulty recorded in the block.
    pub fn meets_own_difficulty(&self) -> bool {
        hash_meets_difficulty(&self.hash, self.difficulty)
    }
}

/// Difficulty predicate: at least `difficulty` leading `'0'` hex characters.
pub fn hash_meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let wanted = difficulty as usize;
    hash.len() >= wanted && hash.bytes().take(wanted).all(|c| c == b'0')
}
