//! Hit-density kernel, simplified. Records `last_hit_age` on every access
//! but evicts in plain FIFO order rather than ranking by it (behavior
//! parity with the source this policy was distilled from; see DESIGN.md).

use cache_ext_core::{PageId, Policy};

use crate::config::EngineConfig;
use crate::list::{FromEnd, PolicyTag, Verdict};
use crate::metadata::{MetadataStore, PageMetadata};

use super::{IterateContext, ListSet, PolicyKernel};

#[derive(Debug, Default)]
pub struct LhdKernel;

impl PolicyKernel for LhdKernel {
    fn policy(&self) -> Policy {
        Policy::Lhd
    }

    fn home_tag(&self) -> PolicyTag {
        PolicyTag::Lhd
    }

    fn on_add(&self, lists: &mut ListSet, id: PageId) {
        lists.lhd.add_tail(id);
    }

    fn on_access(&self, _lists: &mut ListSet, md: &mut PageMetadata, _id: PageId, now: u64) {
        md.last_hit_age = now.saturating_sub(md.last_access_ts);
    }

    fn iterate(
        &self,
        lists: &mut ListSet,
        _md_store: &MetadataStore,
        _cfg: &EngineConfig,
        ctx: &IterateContext,
    ) -> Vec<PageId> {
        let mut evicted_count = 0usize;
        lists.lhd.iterate(FromEnd::Head, |_, _id| {
            if evicted_count >= ctx.budget {
                return None;
            }
            evicted_count += 1;
            Some(Verdict::Evict)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> PageId {
        PageId::new(1, n)
    }

    #[test]
    fn access_records_age_without_reordering() {
        let mut lists = ListSet::new();
        let kernel = LhdKernel;
        kernel.on_add(&mut lists, pid(0));
        kernel.on_add(&mut lists, pid(1));
        let mut md = PageMetadata::new(3, Policy::Lhd, PolicyTag::Lhd);
        kernel.on_access(&mut lists, &mut md, pid(0), 10);
        assert_eq!(md.last_hit_age, 7);
        assert_eq!(lists.lhd.ids_head_to_tail(), vec![pid(0), pid(1)]);
    }

    #[test]
    fn iterate_evicts_in_fifo_order() {
        let mut lists = ListSet::new();
        let kernel = LhdKernel;
        for n in 0..4 {
            kernel.on_add(&mut lists, pid(n));
        }
        let store = MetadataStore::new();
        let cfg = EngineConfig::default();
        let ctx = IterateContext {
            budget: 2,
            flags_of: &|_| Default::default(),
        };
        let victims = kernel.iterate(&mut lists, &store, &cfg, &ctx);
        assert_eq!(victims, vec![pid(0), pid(1)]);
    }
}
