use super::Block;

/// Ordered, mutually consistent block list. Only grows or is replaced wholesale.
#[derive(Debug, Clone)]
pub struct Blockchain {
    chain: Vec<Block>,
}

impl Blockchain {
    /// Initialize a new blockchain with the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
        }
    }

    /// Adopt a previously stored block list if it forms a valid chain.
    pub fn from_blocks(blocks: Vec<Block>) -> Option<Self> {
        if Self::is_valid_chain(&blocks) {
            Some(Self { chain: blocks })
        } else {
            None
        }
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn find(&self, hash: &str) -> Option<&Block> {
        self.chain.iter().rev().find(|b| b.hash == hash)
    }

    /// Push `block` iff it is a valid successor of the current tip and its
    /// hash meets the difficulty it records.
    pub fn try_append(&mut self, block: Block) -> bool {
        if !block.is_valid(self.last_block()) || !block.meets_own_difficulty() {
            return false;
        }
        self.chain.push(block);
        true
    }

    /// Longest-valid-chain rule: swap in `candidate` iff it is strictly
    /// longer and valid end to end. Equal length never replaces.
    pub fn replace(&mut self, candidate: Vec<Block>) -> bool {
        if candidate.len() <= self.chain.len() {
            return false;
        }
        if !Self::is_valid_chain(&candidate) {
            return false;
        }
        self.chain = candidate;
        true
    }

    /// Validate a whole block list: fixed genesis, every adjacent pair linked,
    /// every hash recomputing and meeting its own difficulty.
    pub fn is_valid_chain(blocks: &[Block]) -> bool {
        let Some(first) = blocks.first() else {
            return false;
        };
        if *first != Block::genesis() {
            return false;
        }
        blocks
            .windows(2)
            .all(|pair| pair[1].is_valid(&pair[0]) && pair[1].meets_own_difficulty())
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}
