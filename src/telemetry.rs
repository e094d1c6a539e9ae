use std::time::{Duration, Instant};

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, exponential_buckets,
};
use serde::Serialize;

use crate::blockchain::{AcceptKind, Block, BlockObserver};

/// Node metrics, registered on a registry owned by this node so that
/// several nodes can live in one process.
///
/// Counters are fed by the ledger's accept hook, the mining path and the
/// gossip path. Gauges are refreshed by [`NodeStats::observe`] right before
/// a scrape.
pub struct NodeStats {
    registry: Registry,
    started: Instant,
    blocks_accepted: IntCounterVec,
    gossip_duplicates: IntCounter,
    consensus_checks: IntCounterVec,
    seal_duration: Histogram,
    chain_height: IntGauge,
    peers: IntGauge,
    uptime: IntGauge,
}

/// JSON view of the counters, flattened into `/stats/`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsCounters {
    pub uptime_secs: u64,
    pub blocks_mined: u64,
    pub blocks_from_peers: u64,
    pub chain_replacements: u64,
    pub gossip_duplicates: u64,
    pub consensus_rejections: u64,
    pub seals: u64,
    pub avg_seal_ms: Option<f64>,
}

impl NodeStats {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let blocks_accepted = IntCounterVec::new(
            Opts::new("ledger_blocks_accepted_total", "Blocks that became the chain tip"),
            &["source"],
        )?;
        let gossip_duplicates = IntCounter::new(
            "ledger_gossip_duplicates_total",
            "Gossiped blocks dropped because they were already seen",
        )?;
        let consensus_checks = IntCounterVec::new(
            Opts::new("ledger_consensus_checks_total", "Consensus verdicts on inbound blocks"),
            &["outcome"],
        )?;
        let seal_duration = Histogram::with_opts(
            HistogramOpts::new("ledger_seal_duration_seconds", "Time spent sealing a block")
                .buckets(exponential_buckets(0.001, 2.0, 15)?),
        )?;
        let chain_height = IntGauge::new("ledger_chain_height", "Blocks in the local chain")?;
        let peers = IntGauge::new("ledger_peers", "Peers in the registry")?;
        let up = IntGauge::new("ledger_up", "1 while the node is serving")?;
        let uptime = IntGauge::new("ledger_uptime_seconds", "Seconds since the node started")?;

        registry.register(Box::new(blocks_accepted.clone()))?;
        registry.register(Box::new(gossip_duplicates.clone()))?;
        registry.register(Box::new(consensus_checks.clone()))?;
        registry.register(Box::new(seal_duration.clone()))?;
        registry.register(Box::new(chain_height.clone()))?;
        registry.register(Box::new(peers.clone()))?;
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(uptime.clone()))?;
        up.set(1);

        Ok(Self {
            registry,
            started: Instant::now(),
            blocks_accepted,
            gossip_duplicates,
            consensus_checks,
            seal_duration,
            chain_height,
            peers,
            uptime,
        })
    }

    pub fn record_seal(&self, elapsed: Duration) {
        self.seal_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_duplicate(&self) {
        self.gossip_duplicates.inc();
    }

    pub fn record_consensus(&self, approved: bool) {
        let outcome = if approved { "approved" } else { "rejected" };
        self.consensus_checks.with_label_values(&[outcome]).inc();
    }

    /// Refresh the gauges that mirror state owned elsewhere.
    pub fn observe(&self, chain_height: usize, peers: usize) {
        self.chain_height.set(chain_height as i64);
        self.peers.set(peers as i64);
        self.uptime.set(self.started.elapsed().as_secs() as i64);
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<(String, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        let body = String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))?;
        Ok((encoder.format_type().to_string(), body))
    }

    pub fn counters(&self) -> StatsCounters {
        let seals = self.seal_duration.get_sample_count();
        let accepted = |source: &str| self.blocks_accepted.with_label_values(&[source]).get();
        StatsCounters {
            uptime_secs: self.started.elapsed().as_secs(),
            blocks_mined: accepted("mined"),
            blocks_from_peers: accepted("gossip"),
            chain_replacements: accepted("replaced"),
            gossip_duplicates: self.gossip_duplicates.get(),
            consensus_rejections: self.consensus_checks.with_label_values(&["rejected"]).get(),
            seals,
            avg_seal_ms: (seals > 0)
                .then(|| self.seal_duration.get_sample_sum() * 1000.0 / seals as f64),
        }
    }
}

impl BlockObserver for NodeStats {
    fn block_accepted(&self, tip: &Block, kind: AcceptKind) {
        let source = match kind {
            AcceptKind::Mined => "mined",
            AcceptKind::Gossip => "gossip",
            AcceptKind::Replaced => "replaced",
        };
        self.blocks_accepted.with_label_values(&[source]).inc();
        self.chain_height.set(tip.index as i64 + 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::NodeStats;
    use crate::blockchain::{AcceptKind, Block, BlockObserver};

    #[test]
    fn counts_by_kind() {
        let stats = NodeStats::new().unwrap();
        let genesis = Block::genesis();
        stats.block_accepted(&genesis, AcceptKind::Mined);
        stats.block_accepted(&genesis, AcceptKind::Mined);
        stats.block_accepted(&genesis, AcceptKind::Replaced);
        stats.record_duplicate();
        stats.record_consensus(false);
        stats.record_consensus(true);

        let c = stats.counters();
        assert_eq!(c.blocks_mined, 2);
        assert_eq!(c.blocks_from_peers, 0);
        assert_eq!(c.chain_replacements, 1);
        assert_eq!(c.gossip_duplicates, 1);
        assert_eq!(c.consensus_rejections, 1);
    }

    #[test]
    fn seal_durations() {
        let stats = NodeStats::new().unwrap();
        assert!(stats.counters().avg_seal_ms.is_none());
        stats.record_seal(Duration::from_millis(10));
        stats.record_seal(Duration::from_millis(30));
        let c = stats.counters();
        assert_eq!(c.seals, 2);
        let avg = c.avg_seal_ms.unwrap();
        assert!((avg - 20.0).abs() < 1e-6, "avg {avg}");
    }

    #[test]
    fn renders_text_exposition() {
        let stats = NodeStats::new().unwrap();
        stats.block_accepted(&Block::genesis(), AcceptKind::Gossip);
        stats.observe(5, 3);

        let (content_type, body) = stats.render().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("ledger_blocks_accepted_total{source=\"gossip\"} 1"));
        assert!(body.contains("ledger_chain_height 5"));
        assert!(body.contains("ledger_peers 3"));
        assert!(body.contains("ledger_up 1"));
        assert!(body.contains("ledger_seal_duration_seconds_count 0"));
    }
}
