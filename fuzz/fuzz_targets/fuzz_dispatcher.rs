//! Fuzz target for the hook dispatcher: arbitrary sequences of lifecycle
//! events and eviction requests, checking that Invariant 1 (list entries
//! track metadata count) never breaks regardless of call order.

#![no_main]

use arbitrary::Arbitrary;
use cache_ext_core::{CompatibilityMode, InodeWatchlist, NullSink, PageFlags, PageId};
use cache_ext_engine::{Engine, EngineConfig, EvictionContext};
use libfuzzer_sys::fuzz_target;

const INODE_SPACE: u64 = 16;

#[derive(Debug, Arbitrary)]
enum Op {
    Added { inode: u8, offset: u8 },
    Accessed { inode: u8, offset: u8 },
    Evicted { inode: u8, offset: u8, dirty: bool },
    EvictRequest { budget: u8 },
}

struct FuzzCtx {
    budget: usize,
}

impl EvictionContext for FuzzCtx {
    fn flags(&self, _id: PageId) -> PageFlags {
        PageFlags::new(true, true, false)
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn submit(&mut self, _id: PageId) {}
}

fuzz_target!(|ops: Vec<Op>| {
    let watchlist = InodeWatchlist::from_inodes(0..INODE_SPACE);
    let mut engine = Engine::with_sink(
        EngineConfig::default(),
        watchlist,
        Box::new(NullSink),
        CompatibilityMode::Full,
    );

    for op in ops {
        match op {
            Op::Added { inode, offset } => {
                engine.on_added(PageId::new(inode as u64 % INODE_SPACE, offset as u64));
            }
            Op::Accessed { inode, offset } => {
                engine.on_accessed(PageId::new(inode as u64 % INODE_SPACE, offset as u64));
            }
            Op::Evicted { inode, offset, dirty } => {
                engine.on_evicted(
                    PageId::new(inode as u64 % INODE_SPACE, offset as u64),
                    PageFlags::new(true, true, dirty),
                );
            }
            Op::EvictRequest { budget } => {
                let mut ctx = FuzzCtx {
                    budget: budget as usize,
                };
                engine.on_evict_request(&mut ctx);
            }
        }
        assert_eq!(engine.tracked_pages(), engine.list_entries());
    }
});
