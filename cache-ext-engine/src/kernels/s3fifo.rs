//! S3-FIFO kernel: a small admission queue and a main queue, linked by a
//! promotion step that is the one cross-list operation the core performs
//! outside of eviction/insertion.

use cache_ext_core::{PageId, Policy};

use crate::config::EngineConfig;
use crate::list::{FromEnd, PolicyTag, Verdict};
use crate::metadata::{MetadataStore, PageMetadata};

use super::{IterateContext, ListSet, PolicyKernel};

#[derive(Debug, Default)]
pub struct S3FifoKernel;

impl S3FifoKernel {
    fn iterate_small(
        &self,
        lists: &mut ListSet,
        md_store: &MetadataStore,
        ctx: &IterateContext,
    ) -> Vec<PageId> {
        let mut to_promote = Vec::new();
        let mut evicted_count = 0usize;
        let victims = lists.s3_small.iterate(FromEnd::Head, |_, id| {
            if evicted_count >= ctx.budget {
                return None;
            }
            let freq = md_store.get(id).map(|md| md.freq).unwrap_or(0);
            if freq > 1 {
                to_promote.push(id);
                Some(Verdict::Continue)
            } else {
                evicted_count += 1;
                Some(Verdict::Evict)
            }
        });
        for id in to_promote {
            lists.s3_small.remove(id);
            lists.s3_main.add_tail(id);
            md_store.with_mut(id, |md| {
                md.in_main = true;
                md.list_tag = PolicyTag::S3Main;
            });
        }
        victims
    }

    fn iterate_main(
        &self,
        lists: &mut ListSet,
        md_store: &MetadataStore,
        ctx: &IterateContext,
    ) -> Vec<PageId> {
        let mut to_decay = Vec::new();
        let mut evicted_count = 0usize;
        let victims = lists.s3_main.iterate(FromEnd::Head, |_, id| {
            if evicted_count >= ctx.budget {
                return None;
            }
            let freq = md_store.get(id).map(|md| md.freq).unwrap_or(0);
            if freq > 0 {
                to_decay.push(id);
                Some(Verdict::Continue)
            } else {
                evicted_count += 1;
                Some(Verdict::Evict)
            }
        });
        for id in to_decay {
            md_store.with_mut(id, |md| md.decay_freq());
        }
        victims
    }
}

impl PolicyKernel for S3FifoKernel {
    fn policy(&self) -> Policy {
        Policy::S3Fifo
    }

    fn home_tag(&self) -> PolicyTag {
        PolicyTag::S3Small
    }

    fn on_add(&self, lists: &mut ListSet, id: PageId) {
        lists.s3_small.add_tail(id);
    }

    fn on_access(&self, _lists: &mut ListSet, md: &mut PageMetadata, _id: PageId, _now: u64) {
        md.bump_freq();
    }

    fn iterate(
        &self,
        lists: &mut ListSet,
        md_store: &MetadataStore,
        cfg: &EngineConfig,
        ctx: &IterateContext,
    ) -> Vec<PageId> {
        let small_threshold = cfg.cache_size_estimate / 10;
        if lists.s3_small.len() as u64 > small_threshold {
            self.iterate_small(lists, md_store, ctx)
        } else {
            self.iterate_main(lists, md_store, ctx)
        }
    }
}
