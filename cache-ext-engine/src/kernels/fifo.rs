//! FIFO kernel: arrival order only, never reordered on access.

use cache_ext_core::{PageId, Policy};

use crate::config::EngineConfig;
use crate::list::{FromEnd, PolicyTag, Verdict};
use crate::metadata::{MetadataStore, PageMetadata};

use super::{IterateContext, ListSet, PolicyKernel};

#[derive(Debug, Default)]
pub struct FifoKernel;

impl PolicyKernel for FifoKernel {
    fn policy(&self) -> Policy {
        Policy::Fifo
    }

    fn home_tag(&self) -> PolicyTag {
        PolicyTag::Fifo
    }

    fn on_add(&self, lists: &mut ListSet, id: PageId) {
        lists.fifo.add_tail(id);
    }

    fn on_access(&self, _lists: &mut ListSet, _md: &mut PageMetadata, _id: PageId, _now: u64) {
        // No reordering: arrival order is the whole policy.
    }

    fn iterate(
        &self,
        lists: &mut ListSet,
        _md_store: &MetadataStore,
        _cfg: &EngineConfig,
        ctx: &IterateContext,
    ) -> Vec<PageId> {
        let mut evicted_count = 0usize;
        lists.fifo.iterate(FromEnd::Head, |_, id| {
            if evicted_count >= ctx.budget {
                return None;
            }
            if (ctx.flags_of)(id).is_valid_for_skip() {
                evicted_count += 1;
                Some(Verdict::Evict)
            } else {
                Some(Verdict::Continue)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_ext_core::PageFlags;

    fn pid(n: u64) -> PageId {
        PageId::new(1, n)
    }

    #[test]
    fn add_inserts_at_tail_preserving_arrival_order() {
        let mut lists = ListSet::new();
        let kernel = FifoKernel;
        for n in 0..3 {
            kernel.on_add(&mut lists, pid(n));
        }
        assert_eq!(lists.fifo.ids_head_to_tail(), vec![pid(0), pid(1), pid(2)]);
    }

    #[test]
    fn access_does_not_reorder() {
        let mut lists = ListSet::new();
        let kernel = FifoKernel;
        for n in 0..3 {
            kernel.on_add(&mut lists, pid(n));
        }
        let mut md = PageMetadata::new(0, Policy::Fifo, PolicyTag::Fifo);
        kernel.on_access(&mut lists, &mut md, pid(0), 5);
        assert_eq!(lists.fifo.ids_head_to_tail(), vec![pid(0), pid(1), pid(2)]);
    }

    #[test]
    fn evicts_from_head_skipping_invalid() {
        let mut lists = ListSet::new();
        let kernel = FifoKernel;
        for n in 0..3 {
            kernel.on_add(&mut lists, pid(n));
        }
        let store = MetadataStore::new();
        let cfg = EngineConfig::default();
        let ctx = IterateContext {
            budget: 10,
            flags_of: &|id| PageFlags::new(true, id.offset != 0, false),
        };
        let victims = kernel.iterate(&mut lists, &store, &cfg, &ctx);
        assert_eq!(victims, vec![pid(1), pid(2)]);
    }
}
