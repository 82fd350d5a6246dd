//! LRU kernel: same eviction rule as FIFO, but an access moves the node
//! to the tail (most-recently-used end).

use cache_ext_core::{PageId, Policy};

use crate::config::EngineConfig;
use crate::list::{FromEnd, PolicyTag, Verdict};
use crate::metadata::{MetadataStore, PageMetadata};

use super::{IterateContext, ListSet, PolicyKernel};

#[derive(Debug, Default)]
pub struct LruKernel;

impl PolicyKernel for LruKernel {
    fn policy(&self) -> Policy {
        Policy::Lru
    }

    fn home_tag(&self) -> PolicyTag {
        PolicyTag::Lru
    }

    fn on_add(&self, lists: &mut ListSet, id: PageId) {
        lists.lru.add_tail(id);
    }

    fn on_access(&self, lists: &mut ListSet, _md: &mut PageMetadata, id: PageId, _now: u64) {
        lists.lru.move_tail(id);
    }

    fn iterate(
        &self,
        lists: &mut ListSet,
        _md_store: &MetadataStore,
        _cfg: &EngineConfig,
        ctx: &IterateContext,
    ) -> Vec<PageId> {
        let mut evicted_count = 0usize;
        lists.lru.iterate(FromEnd::Head, |_, id| {
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
    fn access_moves_to_tail() {
        let mut lists = ListSet::new();
        let kernel = LruKernel;
        for n in 0..3 {
            kernel.on_add(&mut lists, pid(n));
        }
        let mut md = PageMetadata::new(0, Policy::Lru, PolicyTag::Lru);
        kernel.on_access(&mut lists, &mut md, pid(0), 5);
        assert_eq!(lists.lru.ids_head_to_tail(), vec![pid(1), pid(2), pid(0)]);
    }

    #[test]
    fn recently_touched_pages_survive_a_sweep() {
        let mut lists = ListSet::new();
        let kernel = LruKernel;
        for n in 0..3 {
            kernel.on_add(&mut lists, pid(n));
        }
        let mut md = PageMetadata::new(0, Policy::Lru, PolicyTag::Lru);
        kernel.on_access(&mut lists, &mut md, pid(0), 5);
        let store = MetadataStore::new();
        let cfg = EngineConfig::default();
        let ctx = IterateContext {
            budget: 10,
            flags_of: &|_| PageFlags::new(true, true, false),
        };
        let victims = kernel.iterate(&mut lists, &store, &cfg, &ctx);
        assert_eq!(victims, vec![pid(1), pid(2), pid(0)]);
    }
}
