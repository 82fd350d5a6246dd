//! Hook dispatcher (component F): thin fan-in from the five lifecycle
//! hooks to the metadata store, metric accumulator, policy kernels, and
//! adaptive controller.

use cache_ext_core::{PageFlags, PageId};
use tracing::{debug, trace, trace_span};

use crate::engine::{kernel_for, Engine};
use crate::metadata::PageMetadata;

/// The host's per-request eviction context: supplies the residency flags
/// and remaining budget for the pages it's considering, and accumulates
/// the victims the engine nominates. The core never implements this trait
/// itself — it is the interface to the out-of-scope kernel callback
/// surface.
pub trait EvictionContext {
    /// Residency flags for `id` as the host currently sees them.
    fn flags(&self, id: PageId) -> PageFlags;
    /// How many more victims the host wants right now.
    fn budget(&self) -> usize;
    /// Accept one nominated victim. The core has not removed its list node
    /// or metadata at this point; that happens only when the host later
    /// calls `on_evicted` for the same id.
    fn submit(&mut self, id: PageId);
}

impl Engine {
    /// `on_added(page)`: filter via the inode watchlist; if out of scope,
    /// return. Otherwise create metadata, update pattern counters, run the
    /// current policy's on-add rule, and bump the miss/access counters.
    pub fn on_added(&mut self, id: PageId) {
        let _span = trace_span!("on_added", inode = id.inode, offset = id.offset).entered();

        if !self.watchlist.contains(id.inode) {
            return;
        }
        if let Some(existing) = self.metadata.get(id) {
            self.metadata.debug_counters().note_duplicate_added();
            // The stale node may live in a different policy's list than the
            // one this add is about to use (e.g. under `PerPolicy` list
            // arrangement, if a switch happened since the first add). Clear
            // it first so a duplicate add can never leave two list nodes
            // for one `PageId`.
            self.lists.remove_from(existing.list_tag, id);
        }

        self.working_set.observe(id.inode);
        self.metrics.record_added_pattern(id.inode, id.offset);

        let policy = self.controller.current_policy();
        let tag = kernel_for(&self.kernels, policy).home_tag();
        let now = self.clock.tick();

        self.metadata.upsert(id, PageMetadata::new(now, policy, tag));
        kernel_for(&self.kernels, policy).on_add(&mut self.lists, id);
        self.metrics.record_miss(policy);

        trace!(?policy, "page added");
    }

    /// `on_accessed(page)`: filter, look up metadata (miss -> silently
    /// dropped per the host ordering contract), update the reuse-distance
    /// accumulator before touching `last_access_ts`, bump `access_count`,
    /// run the current policy's on-access rule, and bump the hit counters.
    pub fn on_accessed(&mut self, id: PageId) {
        let _span = trace_span!("on_accessed", inode = id.inode, offset = id.offset).entered();

        if !self.watchlist.contains(id.inode) {
            return;
        }
        if !self.metadata.contains(id) {
            self.metadata.debug_counters().note_accessed_missing_metadata();
            return;
        }

        let now = self.clock.tick();
        let policy = self.controller.current_policy();

        let (access_count, last_access_ts, assigned_policy, list_tag) = self
            .metadata
            .get(id)
            .map(|md| (md.access_count, md.last_access_ts, md.assigned_policy, md.list_tag))
            .expect("presence checked above");

        // A mismatch here means the page's `assigned_policy` no longer
        // names the list its node actually lives in — an invariant
        // breach. Under `ListArrangement::PerPolicy` it is normal for
        // `assigned_policy` to differ from the engine's current policy for
        // pre-switch residents, so that comparison is not the breach
        // signal.
        if assigned_policy != list_tag.owning_policy() {
            self.metadata.debug_counters().note_assigned_policy_mismatch();
        }

        self.metrics.record_reuse_distance(access_count, last_access_ts, now);

        self.metadata.with_mut(id, |md| {
            kernel_for(&self.kernels, md.assigned_policy).on_access(&mut self.lists, md, id, now);
            md.last_access_ts = now;
            md.access_count += 1;
        });

        self.metrics.record_hit(assigned_policy);
        self.maybe_log_metric_snapshot(now);

        trace!(?policy, access_count, "page accessed");
    }

    /// Emits an unconditional diagnostics log on the configured cadence,
    /// independent of whether the adaptive controller considers a switch.
    /// Recovered from the debug variant of the original policy source;
    /// not part of the policy-switch wire schema and does not touch the
    /// switch counter.
    fn maybe_log_metric_snapshot(&self, now: u64) {
        let interval = self.config.metric_snapshot_interval;
        if interval == 0 || self.metrics.total_accesses() % interval != 0 {
            return;
        }
        debug!(
            total_accesses = self.metrics.total_accesses(),
            hit_rate = self.metrics.hit_rate(),
            one_time_ratio = self.metrics.one_time_ratio(),
            sequential_ratio = self.metrics.sequential_ratio(),
            avg_hits_per_page = self.metrics.avg_hits_per_page(),
            current_policy = %self.controller.current_policy(),
            pages_evicted = self.metrics.pages_evicted(),
            timestamp = now,
            "metric snapshot"
        );
    }

    /// `on_evicted(page)`: tally one-time vs multi, accumulate per-page
    /// aggregates, remove the node from its list, and destroy metadata.
    /// This is the sole path that destroys metadata (Invariant 2) and the
    /// sole path that removes a list node for an evicted page.
    pub fn on_evicted(&mut self, id: PageId, flags: PageFlags) {
        let _span = trace_span!("on_evicted", inode = id.inode, offset = id.offset).entered();

        let Some(md) = self.metadata.remove(id) else {
            return;
        };

        let now = self.clock.now();
        let lifetime = now.saturating_sub(md.added_ts);
        let idle_time = now.saturating_sub(md.last_access_ts);

        self.lists.remove_from(md.list_tag, id);
        self.metrics
            .record_eviction(md.access_count, flags.dirty, lifetime, idle_time, md.assigned_policy);

        trace!(policy = ?md.assigned_policy, access_count = md.access_count, "page evicted");
    }

    /// `on_evict_request(ctx, cgroup)`: if the sampling condition holds,
    /// run a controller tick; then invoke the current policy's iterate to
    /// nominate victims into the host's eviction context.
    pub fn on_evict_request(&mut self, ctx: &mut dyn EvictionContext) {
        let _span = trace_span!("on_evict_request").entered();

        let switch = self.controller.tick(
            &mut self.lists,
            &self.metadata,
            &self.metrics,
            &self.clock,
            &self.config,
            self.sink.as_ref(),
            self.working_set.len(),
        );
        if let Some(event) = &switch {
            trace!(new_policy = ?event.new_policy, "adaptive controller switch committed");
        }

        let policy = self.controller.current_policy();
        let budget = ctx.budget();
        let iterate_ctx = crate::kernels::IterateContext {
            budget,
            flags_of: &|id| ctx.flags(id),
        };
        let victims = kernel_for(&self.kernels, policy).iterate(
            &mut self.lists,
            &self.metadata,
            &self.config,
            &iterate_ctx,
        );

        for id in victims {
            ctx.submit(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_ext_core::{CompatibilityMode, InodeWatchlist, NullSink, Policy};

    use crate::config::{EngineConfig, ListArrangement};

    struct FakeCtx {
        budget: usize,
        submitted: Vec<PageId>,
    }

    impl EvictionContext for FakeCtx {
        fn flags(&self, _id: PageId) -> PageFlags {
            PageFlags::new(true, true, false)
        }

        fn budget(&self) -> usize {
            self.budget
        }

        fn submit(&mut self, id: PageId) {
            self.submitted.push(id);
        }
    }

    fn test_engine() -> Engine {
        Engine::with_sink(
            EngineConfig::default(),
            InodeWatchlist::from_inodes([1]),
            Box::new(NullSink),
            CompatibilityMode::Full,
        )
    }

    #[test]
    fn added_then_evicted_leaves_no_residue() {
        let mut engine = test_engine();
        let id = PageId::new(1, 0);
        engine.on_added(id);
        assert_eq!(engine.tracked_pages(), 1);
        engine.on_evicted(id, PageFlags::default());
        assert_eq!(engine.tracked_pages(), 0);
        assert_eq!(engine.metrics().pages_evicted(), 1);
    }

    #[test]
    fn out_of_scope_inode_is_ignored() {
        let mut engine = test_engine();
        let id = PageId::new(99, 0);
        engine.on_added(id);
        assert_eq!(engine.tracked_pages(), 0);
    }

    #[test]
    fn access_on_tracked_page_bumps_access_count() {
        let mut engine = test_engine();
        let id = PageId::new(1, 0);
        engine.on_added(id);
        engine.on_accessed(id);
        let md = engine.metadata.get(id).unwrap();
        assert_eq!(md.access_count, 1);
    }

    #[test]
    fn access_on_missing_metadata_is_silently_dropped() {
        let mut engine = test_engine();
        let id = PageId::new(1, 0);
        engine.on_accessed(id);
        assert_eq!(
            engine
                .metadata
                .debug_counters()
                .accessed_missing_metadata
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn evict_request_nominates_without_removing() {
        let mut engine = test_engine();
        for n in 0..5 {
            engine.on_added(PageId::new(1, n));
        }
        let mut ctx = FakeCtx {
            budget: 10,
            submitted: Vec::new(),
        };
        engine.on_evict_request(&mut ctx);
        // MRU protects the first 200 valid nodes from the tail; with only
        // 5 present, nothing is nominated yet.
        assert!(ctx.submitted.is_empty());
        assert_eq!(engine.tracked_pages(), 5);
    }

    #[test]
    fn duplicate_added_under_per_policy_moves_stale_node_and_preserves_access_count() {
        let cfg = EngineConfig {
            min_samples: 10,
            check_interval: 10,
            min_time_in_policy: 0,
            hit_rate_threshold: 100,
            cache_size_estimate: 1,
            list_arrangement: ListArrangement::PerPolicy,
            ..EngineConfig::default()
        };
        let mut engine = Engine::with_sink(
            cfg,
            InodeWatchlist::from_inodes([1]),
            Box::new(NullSink),
            CompatibilityMode::Full,
        );

        // Sequential offsets on one inode drive `sequential_ratio` above
        // the gate's clause-3 threshold, and `total_accesses` lands on a
        // sampling moment after exactly 10 adds.
        for offset in 0..10u64 {
            engine.on_added(PageId::new(1, offset));
        }

        let mut ctx = FakeCtx {
            budget: 0,
            submitted: Vec::new(),
        };
        engine.on_evict_request(&mut ctx);
        assert_eq!(engine.current_policy(), Policy::Fifo);

        // `PerPolicy` never retags pre-switch residents: this page's node
        // is still in the MRU list under the old `assigned_policy`.
        let id = PageId::new(1, 0);
        assert!(engine.lists.mru.contains(id));
        assert_eq!(engine.metadata.get(id).unwrap().assigned_policy, Policy::Mru);

        engine.on_accessed(id);
        engine.on_accessed(id);
        assert_eq!(engine.metadata.get(id).unwrap().access_count, 2);

        // The host redelivers `added` for this page; the new add runs
        // under the now-current Fifo policy.
        engine.on_added(id);

        assert!(!engine.lists.mru.contains(id));
        assert!(engine.lists.fifo.contains(id));
        assert_eq!(engine.list_entries(), engine.tracked_pages());
        assert_eq!(engine.metadata.get(id).unwrap().access_count, 2);
    }
}
