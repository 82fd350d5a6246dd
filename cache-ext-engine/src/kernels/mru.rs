//! MRU kernel. Protects the most recently touched nodes from a single
//! eviction sweep by skipping the first `mru_protected_nodes` still-valid
//! nodes seen from the tail before nominating anything.

use cache_ext_core::{PageId, Policy};

use crate::config::EngineConfig;
use crate::list::{FromEnd, PolicyTag, Verdict};
use crate::metadata::{MetadataStore, PageMetadata};

use super::{IterateContext, ListSet, PolicyKernel};

#[derive(Debug, Default)]
pub struct MruKernel;

impl PolicyKernel for MruKernel {
    fn policy(&self) -> Policy {
        Policy::Mru
    }

    fn home_tag(&self) -> PolicyTag {
        PolicyTag::Mru
    }

    fn on_add(&self, lists: &mut ListSet, id: PageId) {
        lists.mru.add_head(id);
    }

    fn on_access(&self, lists: &mut ListSet, _md: &mut PageMetadata, id: PageId, _now: u64) {
        lists.mru.move_head(id);
    }

    fn iterate(
        &self,
        lists: &mut ListSet,
        _md_store: &MetadataStore,
        cfg: &EngineConfig,
        ctx: &IterateContext,
    ) -> Vec<PageId> {
        let mut valid_skipped = 0usize;
        let mut evicted_count = 0usize;
        lists.mru.iterate(FromEnd::Tail, |_, id| {
            if evicted_count >= ctx.budget {
                return None;
            }
            if !(ctx.flags_of)(id).is_valid_for_skip() {
                return Some(Verdict::Continue);
            }
            if valid_skipped < cfg.mru_protected_nodes {
                valid_skipped += 1;
                Some(Verdict::Continue)
            } else {
                evicted_count += 1;
                Some(Verdict::Evict)
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
    fn add_inserts_at_head() {
        let mut lists = ListSet::new();
        let kernel = MruKernel;
        kernel.on_add(&mut lists, pid(1));
        kernel.on_add(&mut lists, pid(2));
        assert_eq!(lists.mru.ids_head_to_tail(), vec![pid(2), pid(1)]);
    }

    #[test]
    fn protects_first_n_valid_nodes_from_tail() {
        let mut lists = ListSet::new();
        let kernel = MruKernel;
        for n in 0..5 {
            kernel.on_add(&mut lists, pid(n));
        }
        let store = MetadataStore::new();
        let cfg = EngineConfig {
            mru_protected_nodes: 3,
            ..EngineConfig::default()
        };
        let ctx = IterateContext {
            budget: 10,
            flags_of: &|_| PageFlags::new(true, true, false),
        };
        let victims = kernel.iterate(&mut lists, &store, &cfg, &ctx);
        // Tail-to-head order is pid(0), pid(1), ..., pid(4); the first 3
        // valid nodes from the tail (0, 1, 2) are protected.
        assert_eq!(victims, vec![pid(3), pid(4)]);
    }

    #[test]
    fn invalid_nodes_are_always_skipped() {
        let mut lists = ListSet::new();
        let kernel = MruKernel;
        for n in 0..3 {
            kernel.on_add(&mut lists, pid(n));
        }
        let store = MetadataStore::new();
        let cfg = EngineConfig {
            mru_protected_nodes: 0,
            ..EngineConfig::default()
        };
        let ctx = IterateContext {
            budget: 10,
            flags_of: &|_| PageFlags::new(false, false, false),
        };
        let victims = kernel.iterate(&mut lists, &store, &cfg, &ctx);
        assert!(victims.is_empty());
    }
}
