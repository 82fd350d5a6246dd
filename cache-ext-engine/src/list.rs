//! Policy lists (component B): one ordered sequence per policy identity,
//! with O(1) head/tail insert, move, remove, and bounded iteration with a
//! per-node verdict.

use std::collections::HashMap;

use cache_ext_core::{PageId, Policy};

/// Identifies one of the engine's ordered lists. S3-FIFO owns two (small
/// and main); every other policy owns exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyTag {
    Mru,
    Fifo,
    Lru,
    S3Small,
    S3Main,
    Lhd,
}

impl PolicyTag {
    /// The policy whose kernel owns this list. Used to detect a page whose
    /// `assigned_policy` no longer names the list its node actually lives
    /// in, independent of whatever policy the engine is currently on.
    pub fn owning_policy(self) -> Policy {
        match self {
            PolicyTag::Mru => Policy::Mru,
            PolicyTag::Fifo => Policy::Fifo,
            PolicyTag::Lru => Policy::Lru,
            PolicyTag::S3Small | PolicyTag::S3Main => Policy::S3Fifo,
            PolicyTag::Lhd => Policy::Lhd,
        }
    }
}

/// Verdict a kernel's iterate callback returns for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep this node, continue iterating.
    Continue,
    /// Evict this node now.
    Evict,
}

/// End of the list iteration starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromEnd {
    Head,
    Tail,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    id: PageId,
    prev: Option<usize>,
    next: Option<usize>,
}

/// One doubly linked ordered sequence of page nodes, backed by a slab so
/// every operation below is O(1) without unsafe pointer splicing.
#[derive(Debug, Default)]
pub struct PolicyList {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<PageId, usize>,
}

impl PolicyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.index.contains_key(&id)
    }

    fn alloc(&mut self, id: PageId) -> usize {
        let slot = Slot {
            id,
            prev: None,
            next: None,
        };
        if let Some(slot_idx) = self.free.pop() {
            self.slots[slot_idx] = Some(slot);
            slot_idx
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().expect("unlink of freed slot");
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn link_head(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[idx].as_mut().unwrap();
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn link_tail(&mut self, idx: usize) {
        let old_tail = self.tail;
        {
            let slot = self.slots[idx].as_mut().unwrap();
            slot.next = None;
            slot.prev = old_tail;
        }
        if let Some(t) = old_tail {
            self.slots[t].as_mut().unwrap().next = Some(idx);
        }
        self.tail = Some(idx);
        if self.head.is_none() {
            self.head = Some(idx);
        }
    }

    /// Insert `id` as the new head. No-op if already present.
    pub fn add_head(&mut self, id: PageId) {
        if self.index.contains_key(&id) {
            return;
        }
        let idx = self.alloc(id);
        self.link_head(idx);
        self.index.insert(id, idx);
    }

    /// Insert `id` as the new tail. No-op if already present.
    pub fn add_tail(&mut self, id: PageId) {
        if self.index.contains_key(&id) {
            return;
        }
        let idx = self.alloc(id);
        self.link_tail(idx);
        self.index.insert(id, idx);
    }

    /// Move `id` to the head. No-op if `id` is absent or already at head.
    pub fn move_head(&mut self, id: PageId) {
        let Some(&idx) = self.index.get(&id) else {
            return;
        };
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.link_head(idx);
    }

    /// Move `id` to the tail. No-op if `id` is absent or already at tail.
    pub fn move_tail(&mut self, id: PageId) {
        let Some(&idx) = self.index.get(&id) else {
            return;
        };
        if self.tail == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.link_tail(idx);
    }

    /// Remove `id` from this list. Fails silently if `id` is not present.
    pub fn remove(&mut self, id: PageId) {
        let Some(idx) = self.index.remove(&id) else {
            return;
        };
        self.unlink(idx);
        self.slots[idx] = None;
        self.free.push(idx);
    }

    /// Walk nodes from `from_end`, invoking `f(index, id)` for each and
    /// stopping as soon as `f` returns `false` (the caller's sentinel,
    /// e.g. an exhausted eviction budget).
    ///
    /// Returns the ids for which `f` returned [`Verdict::Evict`], in visit
    /// order. A node verdicted `Evict` is *nominated* to the host's
    /// eviction context, not removed here: per Invariant 2, the list node
    /// and metadata are destroyed only when the host later confirms
    /// reclaim via the `evicted` hook. A policy that needs to relocate a
    /// node to a different list as part of its own iteration (S3-FIFO
    /// promotion) does so itself via `remove`/`add_tail` rather than
    /// through this generic walk.
    pub fn iterate(
        &self,
        from_end: FromEnd,
        mut f: impl FnMut(usize, PageId) -> Option<Verdict>,
    ) -> Vec<PageId> {
        let mut evicted = Vec::new();
        let mut cursor = match from_end {
            FromEnd::Head => self.head,
            FromEnd::Tail => self.tail,
        };
        let mut index = 0usize;

        while let Some(idx) = cursor {
            let id = self.slots[idx].as_ref().unwrap().id;
            let next_cursor = match from_end {
                FromEnd::Head => self.slots[idx].as_ref().unwrap().next,
                FromEnd::Tail => self.slots[idx].as_ref().unwrap().prev,
            };

            match f(index, id) {
                Some(Verdict::Continue) => {}
                Some(Verdict::Evict) => {
                    evicted.push(id);
                }
                None => break,
            }

            cursor = next_cursor;
            index += 1;
        }

        evicted
    }

    /// Snapshot ids from head to tail, for tests and unified-list re-tagging.
    pub fn ids_head_to_tail(&self) -> Vec<PageId> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let slot = self.slots[idx].as_ref().unwrap();
            out.push(slot.id);
            cursor = slot.next;
        }
        out
    }
}
