//! Engine configuration: capacities and the adaptive controller's
//! reference thresholds, all overridable for testing.

/// How the engine arranges policy lists across a policy switch.
///
/// See the design note on the cross-list-state open question: both
/// arrangements satisfy Invariant 1, but `Unified` avoids the documented
/// "iterate misses most residents right after a switch" defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListArrangement {
    /// Old-policy list entries outlive a switch; only new arrivals flow
    /// into the new policy's list. Preserves the original's documented
    /// inconsistency verbatim.
    PerPolicy,
    /// At switch commit, every tracked page is re-tagged and its list node
    /// moved into the new policy's list.
    Unified,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on tracked pages; the metadata store is not expected to
    /// be hit in practice but guards against the host violating its own
    /// hook delivery ordering.
    pub max_tracked_pages: usize,

    /// Bounded capacity for the working-set approximation.
    pub working_set_capacity: usize,

    /// Estimate of the cache's total capacity in pages, used for the
    /// working-set ratio and the S3-FIFO small/main iteration choice.
    pub cache_size_estimate: u64,

    /// Sample the controller only every `check_interval` accesses.
    pub check_interval: u64,
    /// Gate condition 1: minimum window accesses before a switch is
    /// considered.
    pub min_samples: u64,
    /// Gate condition 2: minimum logical ticks since the last switch.
    pub min_time_in_policy: u64,
    /// Gate condition 3: window hit rate (percent) below which a switch is
    /// considered.
    pub hit_rate_threshold: u64,

    /// Number of still-valid nodes the MRU kernel protects from eviction
    /// at the tail of a single sweep.
    pub mru_protected_nodes: usize,

    /// Whether the S3-FIFO kernel is available as a selection target.
    pub enable_s3fifo: bool,
    /// Whether the Hit-density kernel is available as a selection target.
    pub enable_lhd: bool,

    /// How policy lists are arranged across a switch.
    pub list_arrangement: ListArrangement,

    /// Cadence, in accesses, of the supplemental metric-snapshot debug
    /// log (distinct from policy-switch events).
    pub metric_snapshot_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tracked_pages: 4_000_000,
            working_set_capacity: 100_000,
            cache_size_estimate: 1_000,
            check_interval: 1_000,
            min_samples: 1_000,
            min_time_in_policy: 10_000,
            hit_rate_threshold: 30,
            mru_protected_nodes: 200,
            enable_s3fifo: true,
            enable_lhd: true,
            list_arrangement: ListArrangement::Unified,
            metric_snapshot_interval: 100,
        }
    }
}
