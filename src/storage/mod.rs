use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::blockchain::{Block, Blockchain};
use crate::error::StoreError;

/// Durable checkpoint of the chain. Loaded once at start-up and written
/// after every successful mutation.
pub trait BlockStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Block>>, StoreError>;

    fn save(&self, blocks: &[Block]) -> Result<(), StoreError>;
}

/// Whole chain as one JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BlockStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Block>>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn save(&self, blocks: &[Block]) -> Result<(), StoreError> {
        // write-then-rename so a crash never leaves a half-written chain
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(blocks)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Load the persisted chain, if any, and check it before it is trusted.
pub fn load_chain(store: &dyn BlockStore) -> Result<Option<Blockchain>, StoreError> {
    match store.load()? {
        None => Ok(None),
        Some(blocks) => Blockchain::from_blocks(blocks)
            .map(Some)
            .ok_or(StoreError::InvalidChain),
    }
}
