pub mod pos;
pub mod pow;

use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::blockchain::Block;

pub use pos::ProofOfStake;
pub use pow::ProofOfWork;

/// Acceptance rule consulted before a candidate block joins the chain.
pub trait Consensus {
    fn validate_block(&self, block: &Block) -> bool;

    fn set_difficulty(&mut self, difficulty: u32);

    fn difficulty(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusKind {
    ProofOfWork,
    ProofOfStake,
}

impl FromStr for ConsensusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pow" | "proof-of-work" => Ok(Self::ProofOfWork),
            "pos" | "proof-of-stake" => Ok(Self::ProofOfStake),
            other => Err(format!("unknown consensus `{other}` (expected pow or pos)")),
        }
    }
}

/// The configured strategy, one variant per algorithm.
#[derive(Debug)]
pub enum ConsensusEngine {
    Work(ProofOfWork),
    Stake(ProofOfStake),
}

/// Shared between the facade (difficulty, stakers) and the gossip path.
pub type SharedConsensus = Arc<RwLock<ConsensusEngine>>;

impl ConsensusEngine {
    pub fn new(kind: ConsensusKind, difficulty: u32) -> Self {
        match kind {
            ConsensusKind::ProofOfWork => Self::Work(ProofOfWork::new(difficulty)),
            ConsensusKind::ProofOfStake => Self::Stake(ProofOfStake::new(difficulty)),
        }
    }

    pub fn shared(self) -> SharedConsensus {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Work(_) => "proof-of-work",
            Self::Stake(_) => "proof-of-stake",
        }
    }

    pub fn as_stake(&self) -> Option<&ProofOfStake> {
        match self {
            Self::Stake(pos) => Some(pos),
            Self::Work(_) => None,
        }
    }

    pub fn as_stake_mut(&mut self) -> Option<&mut ProofOfStake> {
        match self {
            Self::Stake(pos) => Some(pos),
            Self::Work(_) => None,
        }
    }
}

impl Consensus for ConsensusEngine {
    fn validate_block(&self, block: &Block) -> bool {
        match self {
            Self::Work(pow) => pow.validate_block(block),
            Self::Stake(pos) => pos.validate_block(block),
        }
    }

    fn set_difficulty(&mut self, difficulty: u32) {
        match self {
            Self::Work(pow) => pow.set_difficulty(difficulty),
            Self::Stake(pos) => pos.set_difficulty(difficulty),
        }
    }

    fn difficulty(&self) -> u32 {
        match self {
            Self::Work(pow) => pow.difficulty(),
            Self::Stake(pos) => pos.difficulty(),
        }
    }
}
