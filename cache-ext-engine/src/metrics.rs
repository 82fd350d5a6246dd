//! Workload metric accumulator (component C).
//!
//! Window counters (`total_accesses`, `cache_hits`, `cache_misses`) reset on
//! every policy switch; everything else here is a persistent, monotonically
//! nondecreasing aggregate across the engine's whole lifetime. All counters
//! are atomics: a single cgroup's hooks are delivered serially, but the
//! host may in the general case dispatch hooks for different cgroups (or,
//! in a future multi-writer deployment, the same cgroup) from different
//! CPUs concurrently.

use std::sync::atomic::{AtomicU64, Ordering};

use cache_ext_core::Policy;

const NO_LAST: u64 = u64::MAX;
const POLICY_COUNT: usize = 5;

#[derive(Debug, Default)]
struct PolicyTally {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

#[derive(Debug)]
pub struct MetricAccumulator {
    // Window-local; reset on switch.
    total_accesses: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,

    // Persistent across windows.
    one_time_accesses: AtomicU64,
    multi_accesses: AtomicU64,
    total_hits_sum: AtomicU64,
    pages_evicted: AtomicU64,
    reuse_distance_sum: AtomicU64,
    reuse_distance_count: AtomicU64,
    total_lifetime_sum: AtomicU64,
    total_idle_time_sum: AtomicU64,
    dirty_evictions: AtomicU64,
    total_evictions: AtomicU64,
    sequential_count: AtomicU64,
    random_count: AtomicU64,

    last_inode: AtomicU64,
    last_offset: AtomicU64,

    per_policy: [PolicyTally; POLICY_COUNT],
}

impl Default for MetricAccumulator {
    fn default() -> Self {
        Self {
            total_accesses: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            one_time_accesses: AtomicU64::new(0),
            multi_accesses: AtomicU64::new(0),
            total_hits_sum: AtomicU64::new(0),
            pages_evicted: AtomicU64::new(0),
            reuse_distance_sum: AtomicU64::new(0),
            reuse_distance_count: AtomicU64::new(0),
            total_lifetime_sum: AtomicU64::new(0),
            total_idle_time_sum: AtomicU64::new(0),
            dirty_evictions: AtomicU64::new(0),
            total_evictions: AtomicU64::new(0),
            sequential_count: AtomicU64::new(0),
            random_count: AtomicU64::new(0),
            last_inode: AtomicU64::new(NO_LAST),
            last_offset: AtomicU64::new(NO_LAST),
            per_policy: Default::default(),
        }
    }
}

fn policy_slot(policy: Policy) -> usize {
    policy.as_u32() as usize
}

fn pct(numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        0
    } else {
        100 * numerator / denominator
    }
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- writers ----------------------------------------------------

    /// Called from `on_added`, before the new page's metadata exists in
    /// the sequential tracker's "last" slot.
    pub fn record_added_pattern(&self, inode: u64, offset: u64) {
        let last_inode = self.last_inode.load(Ordering::Relaxed);
        let last_offset = self.last_offset.load(Ordering::Relaxed);
        if last_inode == inode && last_offset != NO_LAST && offset == last_offset.wrapping_add(1)
        {
            self.sequential_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.random_count.fetch_add(1, Ordering::Relaxed);
        }
        self.last_inode.store(inode, Ordering::Relaxed);
        self.last_offset.store(offset, Ordering::Relaxed);
    }

    /// Called from `on_accessed`, before `last_access_ts` is overwritten.
    pub fn record_reuse_distance(&self, access_count: u64, last_access_ts: u64, now: u64) {
        if access_count > 0 {
            self.reuse_distance_sum
                .fetch_add(now.saturating_sub(last_access_ts), Ordering::Relaxed);
            self.reuse_distance_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_hit(&self, policy: Policy) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        self.total_accesses.fetch_add(1, Ordering::Relaxed);
        self.per_policy[policy_slot(policy)]
            .hits
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, policy: Policy) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        self.total_accesses.fetch_add(1, Ordering::Relaxed);
        self.per_policy[policy_slot(policy)]
            .misses
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Called from `on_evicted` with the metadata being destroyed.
    pub fn record_eviction(
        &self,
        access_count: u64,
        dirty: bool,
        lifetime: u64,
        idle_time: u64,
        policy: Policy,
    ) {
        if access_count <= 1 {
            self.one_time_accesses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.multi_accesses.fetch_add(1, Ordering::Relaxed);
        }
        self.total_hits_sum
            .fetch_add(access_count, Ordering::Relaxed);
        self.pages_evicted.fetch_add(1, Ordering::Relaxed);
        self.total_lifetime_sum
            .fetch_add(lifetime, Ordering::Relaxed);
        self.total_idle_time_sum
            .fetch_add(idle_time, Ordering::Relaxed);
        if dirty {
            self.dirty_evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.total_evictions.fetch_add(1, Ordering::Relaxed);
        self.per_policy[policy_slot(policy)]
            .evictions
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the window-local counters. Called at switch commit; persistent
    /// aggregates and per-policy tallies are left untouched.
    pub fn reset_window(&self) {
        self.total_accesses.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }

    // ---- raw readers --------------------------------------------------

    pub fn total_accesses(&self) -> u64 {
        self.total_accesses.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn pages_evicted(&self) -> u64 {
        self.pages_evicted.load(Ordering::Relaxed)
    }

    // ---- derived values -------------------------------------------------

    pub fn hit_rate(&self) -> u64 {
        pct(self.cache_hits.load(Ordering::Relaxed), self.total_accesses())
    }

    pub fn one_time_ratio(&self) -> u64 {
        let one_time = self.one_time_accesses.load(Ordering::Relaxed);
        let multi = self.multi_accesses.load(Ordering::Relaxed);
        pct(one_time, one_time + multi)
    }

    pub fn sequential_ratio(&self) -> u64 {
        let seq = self.sequential_count.load(Ordering::Relaxed);
        let rand = self.random_count.load(Ordering::Relaxed);
        pct(seq, seq + rand)
    }

    pub fn avg_hits_per_page(&self) -> u64 {
        let evicted = self.pages_evicted();
        if evicted == 0 {
            0
        } else {
            self.total_hits_sum.load(Ordering::Relaxed) / evicted
        }
    }

    pub fn avg_reuse_distance(&self) -> u64 {
        let count = self.reuse_distance_count.load(Ordering::Relaxed);
        if count == 0 {
            0
        } else {
            self.reuse_distance_sum.load(Ordering::Relaxed) / count
        }
    }

    pub fn dirty_ratio(&self) -> u64 {
        pct(
            self.dirty_evictions.load(Ordering::Relaxed),
            self.total_evictions.load(Ordering::Relaxed),
        )
    }

    pub fn avg_lifetime(&self) -> u64 {
        let evicted = self.pages_evicted();
        if evicted == 0 {
            0
        } else {
            self.total_lifetime_sum.load(Ordering::Relaxed) / evicted
        }
    }

    pub fn avg_idle_time(&self) -> u64 {
        let evicted = self.pages_evicted();
        if evicted == 0 {
            0
        } else {
            self.total_idle_time_sum.load(Ordering::Relaxed) / evicted
        }
    }

    pub fn per_policy_hit_rate(&self, policy: Policy) -> u64 {
        let tally = &self.per_policy[policy_slot(policy)];
        let hits = tally.hits.load(Ordering::Relaxed);
        let misses = tally.misses.load(Ordering::Relaxed);
        pct(hits, hits + misses)
    }

    /// The fallback clause of `decide_best_policy`: the policy with the
    /// highest historical hit rate among those that have served at least
    /// one access.
    pub fn best_historical_policy(&self) -> Option<Policy> {
        Policy::ALL
            .into_iter()
            .filter(|&p| {
                let tally = &self.per_policy[policy_slot(p)];
                tally.hits.load(Ordering::Relaxed) + tally.misses.load(Ordering::Relaxed) > 0
            })
            .max_by_key(|&p| self.per_policy_hit_rate(p))
    }

    pub fn working_set_ratio(&self, working_set_len: usize, cache_size_estimate: u64) -> u64 {
        pct(working_set_len as u64, cache_size_estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_with_no_accesses() {
        let metrics = MetricAccumulator::new();
        assert_eq!(metrics.hit_rate(), 0);
    }

    #[test]
    fn hit_rate_reflects_hits_and_misses() {
        let metrics = MetricAccumulator::new();
        for _ in 0..8 {
            metrics.record_hit(Policy::Lru);
        }
        for _ in 0..2 {
            metrics.record_miss(Policy::Lru);
        }
        assert_eq!(metrics.hit_rate(), 80);
    }

    #[test]
    fn reset_window_zeroes_only_window_counters() {
        let metrics = MetricAccumulator::new();
        metrics.record_hit(Policy::Mru);
        metrics.record_eviction(1, false, 5, 2, Policy::Mru);
        metrics.reset_window();
        assert_eq!(metrics.total_accesses(), 0);
        assert_eq!(metrics.hit_rate(), 0);
        // Persistent aggregate survives the reset.
        assert_eq!(metrics.pages_evicted(), 1);
    }

    #[test]
    fn sequential_detection_contiguous_offsets() {
        let metrics = MetricAccumulator::new();
        for offset in 0..100u64 {
            metrics.record_added_pattern(1, offset);
        }
        assert!(metrics.sequential_ratio() > 95);
    }

    #[test]
    fn sequential_detection_random_offsets() {
        let metrics = MetricAccumulator::new();
        let offsets = [5u64, 900, 12, 384, 2, 77, 431, 9, 650, 3];
        for offset in offsets {
            metrics.record_added_pattern(1, offset);
        }
        assert!(metrics.sequential_ratio() < 20);
    }

    #[test]
    fn one_time_ratio_counts_single_access_evictions() {
        let metrics = MetricAccumulator::new();
        metrics.record_eviction(1, false, 10, 10, Policy::Fifo);
        metrics.record_eviction(1, false, 10, 10, Policy::Fifo);
        metrics.record_eviction(5, false, 10, 10, Policy::Fifo);
        assert_eq!(metrics.one_time_ratio(), 66);
    }

    #[test]
    fn dirty_ratio_tracks_dirty_evictions() {
        let metrics = MetricAccumulator::new();
        metrics.record_eviction(1, true, 0, 0, Policy::Lru);
        metrics.record_eviction(1, false, 0, 0, Policy::Lru);
        metrics.record_eviction(1, false, 0, 0, Policy::Lru);
        metrics.record_eviction(1, false, 0, 0, Policy::Lru);
        assert_eq!(metrics.dirty_ratio(), 25);
    }

    #[test]
    fn best_historical_policy_picks_highest_hit_rate() {
        let metrics = MetricAccumulator::new();
        for _ in 0..9 {
            metrics.record_hit(Policy::Mru);
        }
        metrics.record_miss(Policy::Mru);
        for _ in 0..2 {
            metrics.record_hit(Policy::Fifo);
        }
        for _ in 0..8 {
            metrics.record_miss(Policy::Fifo);
        }
        assert_eq!(metrics.best_historical_policy(), Some(Policy::Mru));
    }
}
