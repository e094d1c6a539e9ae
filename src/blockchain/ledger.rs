use std::sync::{Arc, Mutex};

use log::{info, warn};

use super::{AcceptKind, Block, BlockObserver, Blockchain};
use crate::storage::{self, BlockStore};

/// The node's single owned chain. Every read or mutation goes through one
/// mutex held only for the in-memory step; observers and checkpoints run
/// after it is released.
pub struct Ledger {
    chain: Mutex<Blockchain>,
    observers: Vec<Arc<dyn BlockObserver>>,
    checkpoint: Option<Checkpoint>,
}

struct Checkpoint {
    store: Box<dyn BlockStore>,
    saved_len: Mutex<usize>,
}

impl Checkpoint {
    fn save(&self, blocks: &[Block]) {
        let mut saved_len = self.saved_len.lock().expect("mutex poisoned");
        // chain length only grows, so a shorter snapshot lost a race
        if blocks.len() <= *saved_len {
            return;
        }
        match self.store.save(blocks) {
            Ok(()) => *saved_len = blocks.len(),
            Err(e) => warn!("checkpoint of {} blocks failed: {e}", blocks.len()),
        }
    }
}

impl Ledger {
    pub fn new(chain: Blockchain) -> Self {
        Self {
            chain: Mutex::new(chain),
            observers: Vec::new(),
            checkpoint: None,
        }
    }

    /// Seed from `store` when it holds a valid chain, genesis otherwise,
    /// and checkpoint into it from then on.
    pub fn open(store: Box<dyn BlockStore>) -> Self {
        let (chain, saved_len) = match storage::load_chain(store.as_ref()) {
            Ok(Some(chain)) => {
                info!("LEDGER - restored {} blocks from storage", chain.len());
                let len = chain.len();
                (chain, len)
            }
            Ok(None) => (Blockchain::new(), 0),
            Err(e) => {
                warn!("LEDGER - ignoring stored chain ({e}), starting from genesis");
                (Blockchain::new(), 0)
            }
        };
        Self {
            chain: Mutex::new(chain),
            observers: Vec::new(),
            checkpoint: Some(Checkpoint {
                store,
                saved_len: Mutex::new(saved_len),
            }),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn BlockObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn latest(&self) -> Block {
        self.chain.lock().expect("mutex poisoned").last_block().clone()
    }

    pub fn all(&self) -> Vec<Block> {
        self.chain.lock().expect("mutex poisoned").blocks().to_vec()
    }

    pub fn len(&self) -> usize {
        self.chain.lock().expect("mutex poisoned").len()
    }

    pub fn find(&self, hash: &str) -> Option<Block> {
        self.chain.lock().expect("mutex poisoned").find(hash).cloned()
    }

    /// Whether `block` currently sits at its index in the chain.
    pub fn holds(&self, block: &Block) -> bool {
        let chain = self.chain.lock().expect("mutex poisoned");
        chain
            .blocks()
            .get(block.index as usize)
            .is_some_and(|b| b.hash == block.hash)
    }

    pub fn is_valid(&self) -> bool {
        let chain = self.chain.lock().expect("mutex poisoned");
        Blockchain::is_valid_chain(chain.blocks())
    }

    /// Seal `payload` on top of the current tip and append it.
    ///
    /// The nonce search runs without the lock. If the tip moved meanwhile the
    /// block is not appended, yet it is still returned: use [`Ledger::holds`]
    /// to find out.
    pub fn append(&self, payload: String, difficulty: u32) -> Block {
        let tip = self.latest();
        let block = Block::seal(&tip, payload, difficulty);

        let snapshot = {
            let mut chain = self.chain.lock().expect("mutex poisoned");
            if !chain.try_append(block.clone()) {
                warn!(
                    "LEDGER - sealed block #{} went stale, tip moved to #{}",
                    block.index,
                    chain.last_block().index
                );
                return block;
            }
            self.snapshot(&chain)
        };

        info!(
            "LEDGER - mined block #{} (hash={}, nonce={})",
            block.index, block.hash, block.nonce
        );
        self.committed(&block, AcceptKind::Mined, snapshot);
        block
    }

    /// Extend the chain with a block received from a peer. Equivalent to
    /// `replace(all() + [block])` as one critical section.
    pub fn accept_block(&self, block: Block) -> bool {
        let snapshot = {
            let mut chain = self.chain.lock().expect("mutex poisoned");
            if !chain.try_append(block.clone()) {
                return false;
            }
            self.snapshot(&chain)
        };
        info!("LEDGER - added block #{} from peer: {}", block.index, block.hash);
        self.committed(&block, AcceptKind::Gossip, snapshot);
        true
    }

    /// Longest valid chain wins. Returns whether the local chain was swapped.
    pub fn replace(&self, candidate: Vec<Block>) -> bool {
        let (tip, snapshot) = {
            let mut chain = self.chain.lock().expect("mutex poisoned");
            if !chain.replace(candidate) {
                return false;
            }
            (chain.last_block().clone(), self.snapshot(&chain))
        };
        info!(
            "LEDGER - chain replaced, new tip #{} ({})",
            tip.index, tip.hash
        );
        self.committed(&tip, AcceptKind::Replaced, snapshot);
        true
    }

    fn snapshot(&self, chain: &Blockchain) -> Option<Vec<Block>> {
        self.checkpoint.as_ref().map(|_| chain.blocks().to_vec())
    }

    fn committed(&self, tip: &Block, kind: AcceptKind, snapshot: Option<Vec<Block>>) {
        for observer in &self.observers {
            observer.block_accepted(tip, kind);
        }
        if let (Some(checkpoint), Some(blocks)) = (&self.checkpoint, snapshot) {
            checkpoint.save(&blocks);
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(Blockchain::new())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use super::Ledger;
    use crate::blockchain::{AcceptKind, Block, BlockObserver, Blockchain};
    use crate::storage::{BlockStore, JsonFileStore};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(u64, AcceptKind)>>);

    impl BlockObserver for Recorder {
        fn block_accepted(&self, tip: &Block, kind: AcceptKind) {
            self.0.lock().unwrap().push((tip.index, kind));
        }
    }

    #[test]
    fn append_grows_chain_and_notifies_once() {
        let recorder = Arc::new(Recorder::default());
        let ledger = Ledger::default().with_observer(recorder.clone());

        let block = ledger.append("hello".into(), 1);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.holds(&block));
        assert_eq!(ledger.latest(), block);
        assert_eq!(*recorder.0.lock().unwrap(), vec![(1, AcceptKind::Mined)]);
    }

    #[test]
    fn stale_seal_is_returned_but_not_appended() {
        let ledger = Ledger::default();
        let stale = Block::seal(&ledger.latest(), "stale".into(), 1);
        ledger.append("winner".into(), 1);

        assert!(!ledger.accept_block(stale.clone()));
        assert!(!ledger.holds(&stale));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn failed_replace_is_silent() {
        let recorder = Arc::new(Recorder::default());
        let ledger = Ledger::default().with_observer(recorder.clone());

        let mut bad = vec![Block::genesis()];
        let b1 = Block::seal(&bad[0], "1".into(), 1);
        let mut b2 = Block::seal(&b1, "2".into(), 1);
        b2.prev_hash = "mismatch".into();
        bad.extend([b1, b2]);

        assert!(!ledger.replace(bad));
        assert_eq!(ledger.len(), 1);
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn replace_notifies_with_new_tip() {
        let recorder = Arc::new(Recorder::default());
        let ledger = Ledger::default().with_observer(recorder.clone());

        let mut other = Blockchain::new();
        for i in 0..3 {
            assert!(other.try_append(Block::seal(other.last_block(), i.to_string(), 1)));
        }
        assert!(ledger.replace(other.blocks().to_vec()));
        assert_eq!(ledger.all(), other.blocks());
        assert_eq!(*recorder.0.lock().unwrap(), vec![(3, AcceptKind::Replaced)]);
    }

    #[test]
    fn concurrent_appends_keep_chain_valid() {
        let ledger = Arc::new(Ledger::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for j in 0..3 {
                        ledger.append(format!("{i}-{j}"), 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(ledger.is_valid());
        assert!(ledger.len() >= 2);
    }

    #[test]
    fn mutations_are_checkpointed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");

        let ledger = Ledger::open(Box::new(JsonFileStore::new(&path)));
        let block = ledger.append("durable".into(), 1);

        let saved = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1], block);

        let reopened = Ledger::open(Box::new(JsonFileStore::new(&path)));
        assert_eq!(reopened.all(), ledger.all());
    }
}
