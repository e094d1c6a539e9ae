pub mod block;
pub mod events;
pub mod ledger;
pub mod model;

pub use block::Block;
pub use events::{AcceptKind, BlockEvent, BlockFeed, BlockObserver};
pub use ledger::Ledger;
pub use model::Blockchain;

/// Payload of the fixed first block.
pub const GENESIS_DATA: &str = "Genesis Block";

/// Genesis timestamp is pinned so every node derives the same genesis hash.
pub const GENESIS_TIMESTAMP: &str = "1970-01-01T00:00:00+00:00";

pub const GENESIS_DIFFICULTY: u32 = 1;

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 1;

/// Upper bound accepted by the difficulty endpoint (keep low in dev to avoid long waits)
pub const DIFF_MAX: u32 = 6;
