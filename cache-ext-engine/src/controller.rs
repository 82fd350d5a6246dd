//! Adaptive controller (component E): decides when to consider a switch,
//! selects a target policy from measured metrics, and commits the switch.

use cache_ext_core::{EventSink, LogicalClock, Policy, PolicySwitchEvent};
use tracing::info;

use crate::config::{EngineConfig, ListArrangement};
use crate::kernels::ListSet;
use crate::list::PolicyTag;
use crate::metadata::MetadataStore;
use crate::metrics::MetricAccumulator;

/// Maps a policy to the list tag a page assigned to it resides in, used by
/// the unified-list re-tagging pass at switch commit.
fn home_tag(policy: Policy) -> PolicyTag {
    match policy {
        Policy::Mru => PolicyTag::Mru,
        Policy::Fifo => PolicyTag::Fifo,
        Policy::Lru => PolicyTag::Lru,
        // A page re-tagged to S3-FIFO always re-enters at the small queue;
        // promotion is earned again under the new policy's own rules.
        Policy::S3Fifo => PolicyTag::S3Small,
        Policy::Lhd => PolicyTag::Lhd,
    }
}

/// Whether `policy`'s home list takes new/re-tagged arrivals at the head
/// or the tail, mirroring each kernel's `on_add`.
fn inserts_at_head(policy: Policy) -> bool {
    matches!(policy, Policy::Mru)
}

/// Adaptive controller state: current policy, switch bookkeeping, and the
/// gate/selection logic described in the component design notes.
pub struct AdaptiveController {
    current_policy: Policy,
    last_switch_ts: u64,
    switch_count: u64,
}

impl AdaptiveController {
    pub fn new() -> Self {
        Self {
            current_policy: Policy::Mru,
            last_switch_ts: 0,
            switch_count: 0,
        }
    }

    pub fn current_policy(&self) -> Policy {
        self.current_policy
    }

    pub fn last_switch_ts(&self) -> u64 {
        self.last_switch_ts
    }

    pub fn switch_count(&self) -> u64 {
        self.switch_count
    }

    /// Whether `total_accesses mod check_interval == 0`: the controller
    /// only ever runs at these sampled moments.
    pub fn is_sampling_moment(total_accesses: u64, cfg: &EngineConfig) -> bool {
        cfg.check_interval != 0 && total_accesses % cfg.check_interval == 0
    }

    fn gate_passes(&self, now: u64, metrics: &MetricAccumulator, cfg: &EngineConfig) -> bool {
        metrics.total_accesses() >= cfg.min_samples
            && now.saturating_sub(self.last_switch_ts) >= cfg.min_time_in_policy
            && metrics.hit_rate() < cfg.hit_rate_threshold
    }

    /// The 8-clause selection cascade; the first matching clause wins.
    /// `ws_ratio` is the working-set ratio computed by the caller from the
    /// engine's tracked working set (see `Engine::tick`).
    fn decide_best_policy_with_ws(
        &self,
        metrics: &MetricAccumulator,
        cfg: &EngineConfig,
        ws_ratio: u64,
    ) -> Policy {
        if ws_ratio > 300 {
            return Policy::Fifo;
        }
        if ws_ratio < 60 {
            return Policy::Mru;
        }
        if metrics.sequential_ratio() > 80 {
            return Policy::Fifo;
        }
        if metrics.one_time_ratio() > 60 && metrics.avg_hits_per_page() < 2 {
            return if cfg.enable_s3fifo {
                Policy::S3Fifo
            } else {
                Policy::Fifo
            };
        }
        if metrics.avg_hits_per_page() > 5 && metrics.one_time_ratio() < 30 {
            return Policy::Mru;
        }
        let reuse = metrics.avg_reuse_distance();
        if reuse > 0 && reuse < 50_000 {
            return Policy::Lru;
        }
        if (100..=200).contains(&ws_ratio) {
            return if cfg.enable_lhd { Policy::Lhd } else { Policy::Lru };
        }
        metrics.best_historical_policy().unwrap_or(self.current_policy)
    }

    /// Run one controller tick: check the sampling condition, the gate, and
    /// if both pass and the selected policy differs from the current one,
    /// commit the switch. Returns the event emitted, if any.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        lists: &mut ListSet,
        md_store: &MetadataStore,
        metrics: &MetricAccumulator,
        clock: &LogicalClock,
        cfg: &EngineConfig,
        sink: &dyn EventSink,
        working_set_len: usize,
    ) -> Option<PolicySwitchEvent> {
        let now = clock.now();
        if !Self::is_sampling_moment(metrics.total_accesses(), cfg) {
            return None;
        }
        if !self.gate_passes(now, metrics, cfg) {
            return None;
        }

        let ws_ratio = metrics.working_set_ratio(working_set_len, cfg.cache_size_estimate);
        let target = self.decide_best_policy_with_ws(metrics, cfg, ws_ratio);
        if target == self.current_policy {
            return None;
        }

        let old_policy = self.current_policy;
        let old_policy_hit_rate = metrics.per_policy_hit_rate(old_policy);

        let event = PolicySwitchEvent {
            old_policy,
            new_policy: target,
            timestamp: now,
            hit_rate: metrics.hit_rate(),
            total_accesses: metrics.total_accesses(),
            one_time_ratio: metrics.one_time_ratio(),
            sequential_ratio: metrics.sequential_ratio(),
            avg_hits_per_page: metrics.avg_hits_per_page(),
            avg_reuse_distance: metrics.avg_reuse_distance(),
            dirty_ratio: metrics.dirty_ratio(),
            old_policy_hit_rate,
            working_set_size: working_set_len as u64,
            working_set_ratio: ws_ratio,
        };

        if cfg.list_arrangement == ListArrangement::Unified {
            self.retag_unified(lists, md_store, target);
        }

        self.current_policy = target;
        self.last_switch_ts = now;
        self.switch_count += 1;
        metrics.reset_window();

        info!(
            old = %old_policy,
            new = %target,
            timestamp = now,
            hit_rate = event.hit_rate,
            "adaptive controller switched policy"
        );

        if !sink.offer(&event) {
            md_store.debug_counters().note_dropped_switch_event();
        }

        Some(event)
    }

    /// Re-tag every tracked page's `assigned_policy` and physically move
    /// its list node into the new policy's list, preserving the relative
    /// order the new policy's own `on_add` rule would have produced (head
    /// for MRU, tail for everything else).
    fn retag_unified(&self, lists: &mut ListSet, md_store: &MetadataStore, target: Policy) {
        let target_tag = home_tag(target);
        let at_head = inserts_at_head(target);

        for id in md_store.page_ids() {
            let Some(old_tag) = md_store.get(id).map(|md| md.list_tag) else {
                continue;
            };
            if old_tag == target_tag {
                md_store.with_mut(id, |md| md.assigned_policy = target);
                continue;
            }
            lists.list_mut(old_tag).remove(id);
            if at_head {
                lists.list_mut(target_tag).add_head(id);
            } else {
                lists.list_mut(target_tag).add_tail(id);
            }
            md_store.with_mut(id, |md| {
                md.assigned_policy = target;
                md.list_tag = target_tag;
                md.in_main = false;
                md.freq = 0;
            });
        }
    }
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_ext_core::{NullSink, PageId};
    use crate::metadata::PageMetadata;

    fn cfg() -> EngineConfig {
        EngineConfig {
            min_samples: 10,
            min_time_in_policy: 5,
            hit_rate_threshold: 30,
            check_interval: 10,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn gate_blocks_switch_below_min_samples() {
        let controller = AdaptiveController::new();
        let metrics = MetricAccumulator::new();
        for _ in 0..5 {
            metrics.record_miss(Policy::Mru);
        }
        assert!(!controller.gate_passes(100, &metrics, &cfg()));
    }

    #[test]
    fn decide_best_policy_clause_1_high_ws_ratio_picks_fifo() {
        let controller = AdaptiveController::new();
        let metrics = MetricAccumulator::new();
        let decided = controller.decide_best_policy_with_ws(&metrics, &cfg(), 400);
        assert_eq!(decided, Policy::Fifo);
    }

    #[test]
    fn decide_best_policy_clause_2_low_ws_ratio_picks_mru() {
        let controller = AdaptiveController::new();
        let metrics = MetricAccumulator::new();
        let decided = controller.decide_best_policy_with_ws(&metrics, &cfg(), 10);
        assert_eq!(decided, Policy::Mru);
    }

    #[test]
    fn no_switch_when_selected_equals_current() {
        let mut controller = AdaptiveController::new();
        let mut lists = ListSet::new();
        let md_store = MetadataStore::new();
        let metrics = MetricAccumulator::new();
        let clock = LogicalClock::new();
        for _ in 0..20 {
            clock.tick();
            metrics.record_miss(Policy::Mru);
        }
        let event = controller.tick(
            &mut lists,
            &md_store,
            &metrics,
            &clock,
            &cfg(),
            &NullSink,
            10,
        );
        // Current policy starts at MRU; ws_ratio = 100*10/1000 = 1 < 60 -> MRU.
        assert!(event.is_none());
        assert_eq!(controller.current_policy(), Policy::Mru);
        assert_eq!(controller.switch_count(), 0);
    }

    #[test]
    fn switch_resets_window_and_advances_bookkeeping() {
        let mut controller = AdaptiveController::new();
        let mut lists = ListSet::new();
        let md_store = MetadataStore::new();
        let metrics = MetricAccumulator::new();
        let clock = LogicalClock::new();
        for _ in 0..20 {
            clock.tick();
            metrics.record_miss(Policy::Mru);
        }
        // ws_ratio = 100*4000/1000 = 400 -> clause 1 -> FIFO, differs from MRU.
        let event = controller.tick(
            &mut lists,
            &md_store,
            &metrics,
            &clock,
            &cfg(),
            &NullSink,
            4000,
        );
        assert!(event.is_some());
        assert_eq!(controller.current_policy(), Policy::Fifo);
        assert_eq!(controller.switch_count(), 1);
        assert_eq!(metrics.total_accesses(), 0);
        assert_eq!(metrics.hit_rate(), 0);
    }

    #[test]
    fn unified_retag_moves_pages_and_updates_assigned_policy() {
        let mut controller = AdaptiveController::new();
        let mut lists = ListSet::new();
        let md_store = MetadataStore::new();
        let id = PageId::new(1, 0);
        md_store.upsert(id, PageMetadata::new(0, Policy::Mru, PolicyTag::Mru));
        lists.mru.add_head(id);

        controller.retag_unified(&mut lists, &md_store, Policy::Fifo);

        assert!(lists.fifo.contains(id));
        assert!(!lists.mru.contains(id));
        assert_eq!(md_store.get(id).unwrap().assigned_policy, Policy::Fifo);
        assert_eq!(md_store.get(id).unwrap().list_tag, PolicyTag::Fifo);
    }
}
