use std::collections::BTreeMap;

use rand::Rng;

use super::Consensus;
use crate::blockchain::Block;
use crate::error::StakeError;

/// Stake-weighted validator selection.
///
/// Block validation is a placeholder that accepts everything: it does not
/// check that a block came from the selected validator. The sum of all
/// stakes always fits in a `u64`.
#[derive(Debug, Clone)]
pub struct ProofOfStake {
    difficulty: u32,
    stakers: BTreeMap<String, u64>,
}

impl ProofOfStake {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            stakers: BTreeMap::new(),
        }
    }

    /// Register or overwrite the stake held by `address`. Returns the new
    /// total, or an error (leaving the stakers untouched) when it would
    /// not fit in a `u64`.
    pub fn add_staker(
        &mut self,
        address: impl Into<String>,
        stake: u64,
    ) -> Result<u64, StakeError> {
        let address = address.into();
        let previous = self.stakers.get(&address).copied().unwrap_or(0);
        let total = (self.total_stake() - previous)
            .checked_add(stake)
            .ok_or(StakeError::Overflow { stake })?;
        self.stakers.insert(address, stake);
        Ok(total)
    }

    pub fn stakers(&self) -> &BTreeMap<String, u64> {
        &self.stakers
    }

    pub fn total_stake(&self) -> u64 {
        self.stakers
            .values()
            .fold(0u64, |total, stake| total.saturating_add(*stake))
    }

    /// Uniform draw over the cumulative stake ranges; `None` without stake.
    pub fn select_validator<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        let total = self.total_stake();
        if total == 0 {
            return None;
        }
        let point = rng.gen_range(0..total);
        let mut upper = 0u64;
        for (address, stake) in &self.stakers {
            upper = upper.saturating_add(*stake);
            if point < upper {
                return Some(address.as_str());
            }
        }
        None
    }
}

impl Consensus for ProofOfStake {
    fn validate_block(&self, _block: &Block) -> bool {
        true
    }

    fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
    }

    fn difficulty(&self) -> u32 {
        self.difficulty
    }
}
