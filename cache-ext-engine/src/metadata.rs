//! Per-page metadata store (component A).

use cache_ext_core::Policy;
use dashmap::DashMap;

use crate::list::PolicyTag;
use cache_ext_core::PageId;

/// Per-page metadata, created on `added`, mutated on `accessed` and by
/// policy kernels, destroyed on `evicted`.
#[derive(Debug, Clone)]
pub struct PageMetadata {
    pub added_ts: u64,
    pub last_access_ts: u64,
    pub access_count: u64,
    pub assigned_policy: Policy,
    /// S3-FIFO small-queue hit counter, saturating at 3.
    pub freq: u8,
    /// Whether the page has been promoted to the S3-FIFO main queue.
    pub in_main: bool,
    /// Hit-density policy's gap between the two most recent accesses.
    pub last_hit_age: u64,
    /// Which list tag currently owns this page's node.
    pub list_tag: PolicyTag,
}

impl PageMetadata {
    pub fn new(now: u64, assigned_policy: Policy, list_tag: PolicyTag) -> Self {
        Self {
            added_ts: now,
            last_access_ts: now,
            access_count: 0,
            assigned_policy,
            freq: 0,
            in_main: false,
            last_hit_age: 0,
            list_tag,
        }
    }

    /// Saturating increment of the S3-FIFO small-queue hit counter, clamped to 0..=3.
    pub fn bump_freq(&mut self) {
        self.freq = self.freq.saturating_add(1).min(3);
    }

    pub fn decay_freq(&mut self) {
        self.freq = self.freq.saturating_sub(1);
    }
}

/// Counters for conditions the error handling design requires the engine
/// to absorb silently rather than surface as errors.
#[derive(Debug, Default)]
pub struct DebugCounters {
    pub duplicate_added: std::sync::atomic::AtomicU64,
    pub accessed_missing_metadata: std::sync::atomic::AtomicU64,
    pub assigned_policy_mismatch: std::sync::atomic::AtomicU64,
    pub dropped_switch_events: std::sync::atomic::AtomicU64,
}

impl DebugCounters {
    fn bump(counter: &std::sync::atomic::AtomicU64) {
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn note_duplicate_added(&self) {
        Self::bump(&self.duplicate_added);
    }

    pub fn note_accessed_missing_metadata(&self) {
        Self::bump(&self.accessed_missing_metadata);
    }

    pub fn note_assigned_policy_mismatch(&self) {
        Self::bump(&self.assigned_policy_mismatch);
    }

    pub fn note_dropped_switch_event(&self) {
        Self::bump(&self.dropped_switch_events);
    }
}

/// Mapping from page identity to per-page metadata.
///
/// Backed by `DashMap` so concurrent `upsert`/`get`/`remove` is safe even
/// though the dispatcher's own ordering contract means a single cgroup's
/// hooks arrive serially.
#[derive(Debug, Default)]
pub struct MetadataStore {
    map: DashMap<PageId, PageMetadata>,
    debug_counters: DebugCounters,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
            debug_counters: DebugCounters::default(),
        }
    }

    /// Counters for invariant-breach and drop conditions the error handling
    /// design requires the engine to absorb rather than surface.
    pub fn debug_counters(&self) -> &DebugCounters {
        &self.debug_counters
    }

    /// Insert metadata for `id`, or replace it if already present. A
    /// replace carries the existing entry's `access_count` forward — every
    /// other field takes the incoming value. An `added` for a key already
    /// present is a host bug; counting the occurrence is left to the
    /// caller (the dispatcher), since only it knows this is the `added`
    /// path rather than a normal update.
    pub fn upsert(&self, id: PageId, mut metadata: PageMetadata) {
        if let Some(existing) = self.map.get(&id) {
            metadata.access_count = existing.access_count;
        }
        self.map.insert(id, metadata);
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.map.contains_key(&id)
    }

    pub fn get(&self, id: PageId) -> Option<PageMetadata> {
        self.map.get(&id).map(|entry| entry.clone())
    }

    /// Mutate metadata in place via `f`, returning `false` if `id` is not
    /// present (a miss the dispatcher treats as a silently dropped event).
    pub fn with_mut<R>(&self, id: PageId, f: impl FnOnce(&mut PageMetadata) -> R) -> Option<R> {
        self.map.get_mut(&id).map(|mut entry| f(&mut entry))
    }

    pub fn remove(&self, id: PageId) -> Option<PageMetadata> {
        self.map.remove(&id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of all tracked page ids, used only by the unified-list
    /// re-tagging pass at switch commit.
    pub fn page_ids(&self) -> Vec<PageId> {
        self.map.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get_round_trips() {
        let store = MetadataStore::new();
        let id = PageId::new(1, 0);
        store.upsert(id, PageMetadata::new(10, Policy::Mru, PolicyTag::Mru));
        let md = store.get(id).unwrap();
        assert_eq!(md.added_ts, 10);
        assert_eq!(md.assigned_policy, Policy::Mru);
    }

    #[test]
    fn upsert_over_existing_key_preserves_access_count() {
        let store = MetadataStore::new();
        let id = PageId::new(1, 0);
        store.upsert(id, PageMetadata::new(0, Policy::Mru, PolicyTag::Mru));
        store.with_mut(id, |md| md.access_count = 7);
        store.upsert(id, PageMetadata::new(50, Policy::Fifo, PolicyTag::Fifo));
        let md = store.get(id).unwrap();
        assert_eq!(md.access_count, 7);
        assert_eq!(md.added_ts, 50);
        assert_eq!(md.assigned_policy, Policy::Fifo);
    }

    #[test]
    fn remove_deletes_metadata() {
        let store = MetadataStore::new();
        let id = PageId::new(1, 0);
        store.upsert(id, PageMetadata::new(0, Policy::Mru, PolicyTag::Mru));
        assert!(store.remove(id).is_some());
        assert!(store.get(id).is_none());
    }

    #[test]
    fn freq_saturates_at_three() {
        let mut md = PageMetadata::new(0, Policy::S3Fifo, PolicyTag::S3Small);
        for _ in 0..10 {
            md.bump_freq();
        }
        assert_eq!(md.freq, 3);
    }

    #[test]
    fn freq_decay_does_not_underflow() {
        let mut md = PageMetadata::new(0, Policy::S3Fifo, PolicyTag::S3Main);
        md.decay_freq();
        assert_eq!(md.freq, 0);
    }
}
