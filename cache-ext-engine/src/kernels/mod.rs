//! Policy kernels (component D): on-add placement, on-access reordering,
//! and on-evict-iterate victim nomination, one implementation per policy.

mod fifo;
mod lhd;
mod lru;
mod mru;
mod s3fifo;

pub use fifo::FifoKernel;
pub use lhd::LhdKernel;
pub use lru::LruKernel;
pub use mru::MruKernel;
pub use s3fifo::S3FifoKernel;

use cache_ext_core::{PageFlags, PageId, Policy};

use crate::config::EngineConfig;
use crate::list::{PolicyList, PolicyTag};
use crate::metadata::{MetadataStore, PageMetadata};

/// The six list identities. Held here rather than inside each kernel since
/// the unified list arrangement (see `crate::controller`) must address all
/// of them when re-tagging pages at switch commit.
#[derive(Debug, Default)]
pub struct ListSet {
    pub mru: PolicyList,
    pub fifo: PolicyList,
    pub lru: PolicyList,
    pub s3_small: PolicyList,
    pub s3_main: PolicyList,
    pub lhd: PolicyList,
}

impl ListSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, tag: PolicyTag) -> &PolicyList {
        match tag {
            PolicyTag::Mru => &self.mru,
            PolicyTag::Fifo => &self.fifo,
            PolicyTag::Lru => &self.lru,
            PolicyTag::S3Small => &self.s3_small,
            PolicyTag::S3Main => &self.s3_main,
            PolicyTag::Lhd => &self.lhd,
        }
    }

    pub fn list_mut(&mut self, tag: PolicyTag) -> &mut PolicyList {
        match tag {
            PolicyTag::Mru => &mut self.mru,
            PolicyTag::Fifo => &mut self.fifo,
            PolicyTag::Lru => &mut self.lru,
            PolicyTag::S3Small => &mut self.s3_small,
            PolicyTag::S3Main => &mut self.s3_main,
            PolicyTag::Lhd => &mut self.lhd,
        }
    }

    /// Sum of all list sizes, cross-checked against the metadata store's
    /// entry count by Invariant 1/5.
    pub fn total_len(&self) -> usize {
        self.mru.len()
            + self.fifo.len()
            + self.lru.len()
            + self.s3_small.len()
            + self.s3_main.len()
            + self.lhd.len()
    }

    pub fn remove_from(&mut self, tag: PolicyTag, id: PageId) {
        self.list_mut(tag).remove(id);
    }
}

/// Nomination budget and host-supplied, non-persisted residency flags for
/// one iterate pass. `flags_of` mirrors the host hook surface's per-call
/// flags argument (the core never stores flags itself).
pub struct IterateContext<'a> {
    pub budget: usize,
    pub flags_of: &'a dyn Fn(PageId) -> PageFlags,
}

/// One policy's three rules: on-add placement, on-access reordering, and
/// on-evict-iterate victim nomination.
pub trait PolicyKernel: Send + Sync {
    fn policy(&self) -> Policy;

    /// List tag a freshly added page's node is created in.
    fn home_tag(&self) -> PolicyTag;

    fn on_add(&self, lists: &mut ListSet, id: PageId);

    /// `now` is the logical clock value at the access, supplied so a kernel
    /// (Hit-density) can compute an age from the metadata's *prior*
    /// `last_access_ts` before the dispatcher overwrites it.
    fn on_access(&self, lists: &mut ListSet, md: &mut PageMetadata, id: PageId, now: u64);

    /// Nominate up to `ctx.budget` victims. Nomination never removes the
    /// node from its list or deletes metadata: per Invariant 2, that
    /// happens only when the host later confirms reclaim via `on_evicted`.
    fn iterate(
        &self,
        lists: &mut ListSet,
        md_store: &MetadataStore,
        cfg: &EngineConfig,
        ctx: &IterateContext,
    ) -> Vec<PageId>;
}
