use serde::Serialize;
use tokio::sync::broadcast;

use super::Block;

/// How a block became the new tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptKind {
    Mined,
    Gossip,
    Replaced,
}

/// Notified exactly once per tip change, after the chain lock is released.
pub trait BlockObserver: Send + Sync {
    fn block_accepted(&self, tip: &Block, kind: AcceptKind);
}

/// A tip change as pushed to dashboard subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct BlockEvent {
    pub kind: AcceptKind,
    pub block: Block,
}

/// Fans tip changes out to any number of subscribers. Slow subscribers
/// lose the oldest events rather than holding up the ledger.
pub struct BlockFeed {
    sender: broadcast::Sender<BlockEvent>,
}

impl BlockFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BlockEvent> {
        self.sender.subscribe()
    }

    pub fn subscribers(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl BlockObserver for BlockFeed {
    fn block_accepted(&self, tip: &Block, kind: AcceptKind) {
        // no subscribers is not an error
        let _ = self.sender.send(BlockEvent {
            kind,
            block: tip.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::{AcceptKind, BlockFeed, BlockObserver};
    use crate::blockchain::{Block, Ledger};

    #[test]
    fn every_subscriber_sees_each_tip() {
        let feed = std::sync::Arc::new(BlockFeed::new(8));
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();
        assert_eq!(feed.subscribers(), 2);

        let ledger = Ledger::default().with_observer(feed.clone());
        let block = ledger.append("watched".into(), 1);

        for rx in [&mut first, &mut second] {
            let event = rx.try_recv().unwrap();
            assert_eq!(event.kind, AcceptKind::Mined);
            assert_eq!(event.block, block);
            assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        }
    }

    #[test]
    fn slow_subscriber_lags_instead_of_blocking() {
        let feed = BlockFeed::new(2);
        let mut rx = feed.subscribe();
        let genesis = Block::genesis();
        for _ in 0..3 {
            feed.block_accepted(&genesis, AcceptKind::Gossip);
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(1))));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = BlockFeed::new(4);
        feed.block_accepted(&Block::genesis(), AcceptKind::Replaced);
        assert_eq!(feed.subscribers(), 0);
    }

    #[test]
    fn event_wire_shape() {
        let event = super::BlockEvent {
            kind: AcceptKind::Gossip,
            block: Block::genesis(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "gossip");
        assert_eq!(json["block"]["index"], 0);
        assert!(json["block"]["prevHash"].is_string());
    }
}
