use super::Consensus;
use crate::blockchain::Block;
use crate::blockchain::block::hash_meets_difficulty;

/// Accepts blocks whose hash has `difficulty` leading zero hex characters.
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new(difficulty: u32) -> Self {
        Self { difficulty }
    }
}

impl Consensus for ProofOfWork {
    fn validate_block(&self, block: &Block) -> bool {
        hash_meets_difficulty(&block.hash, self.difficulty)
    }

    fn set_difficulty(&mut self, difficulty: u32) {
        // NOTE: only affects blocks checked from now on
        self.difficulty = difficulty;
    }

    fn difficulty(&self) -> u32 {
        self.difficulty
    }
}
