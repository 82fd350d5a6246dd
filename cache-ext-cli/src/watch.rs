// SPDX-License-Identifier: MIT OR Apache-2.0
//! The "external initializer" and host hook driver.
//!
//! The core never assumes how hooks are delivered; this module is one
//! concrete way to drive them — a directory walk to seed the watchlist,
//! then an `inotify`-backed (`notify` crate) loop translating filesystem
//! activity into the engine's lifecycle hooks and periodically asking it
//! for eviction victims.

use std::collections::HashMap;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cache_ext_core::{CacheExtError, CacheExtResult, InodeWatchlist, PageFlags, PageId};
use cache_ext_engine::{Engine, EvictionContext};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::info;
use walkdir::WalkDir;

/// How many victims the synthetic eviction context asks for on each tick.
const EVICT_BUDGET: usize = 32;
/// Cadence at which `on_evict_request` is driven and the exit flag is
/// re-checked.
const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Walk `dir` once at startup and collect the inode of every regular file
/// found, seeding the engine's inode watchlist. Entries the walk cannot
/// stat (permission errors, races with concurrent deletes) are skipped,
/// not fatal — only the directory itself not existing is a startup error,
/// and that is checked by the caller before this runs.
pub fn scan_watchlist(dir: &Path) -> InodeWatchlist {
    let mut watchlist = InodeWatchlist::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            watchlist.insert(meta.ino());
        }
    }
    watchlist
}

#[derive(Debug)]
enum FileEvent {
    Touched(PathBuf),
    Removed(PathBuf),
}

fn spawn_watcher(dir: &Path) -> CacheExtResult<(RecommendedWatcher, UnboundedReceiver<FileEvent>)> {
    let (tx, rx) = unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else {
            return;
        };
        let variant: fn(PathBuf) -> FileEvent = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Access(_) => {
                FileEvent::Touched
            }
            EventKind::Remove(_) => FileEvent::Removed,
            _ => return,
        };
        for path in event.paths {
            let _ = tx.send(variant(path));
        }
    })
    .map_err(|e| CacheExtError::HookAttachFailed(e.to_string()))?;

    watcher
        .watch(dir, RecursiveMode::Recursive)
        .map_err(|e| CacheExtError::HookAttachFailed(e.to_string()))?;

    Ok((watcher, rx))
}

/// The synthetic per-request eviction context this observer hands the
/// engine. A real kernel attachment would supply live residency flags from
/// the page cache; lacking that callback surface, this context reports
/// every candidate as resident and clean.
struct FsEvictionContext {
    budget: usize,
    submitted: Vec<PageId>,
}

impl EvictionContext for FsEvictionContext {
    fn flags(&self, _id: PageId) -> PageFlags {
        PageFlags::new(true, true, false)
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn submit(&mut self, id: PageId) {
        self.submitted.push(id);
    }
}

fn handle_file_event(engine: &mut Engine, known: &mut HashMap<PathBuf, u64>, event: FileEvent) {
    match event {
        FileEvent::Touched(path) => {
            let Ok(meta) = std::fs::metadata(&path) else {
                return;
            };
            if !meta.is_file() {
                return;
            }
            let inode = meta.ino();
            let id = PageId::new(inode, 0);
            if known.insert(path, inode).is_none() {
                engine.on_added(id);
            } else {
                engine.on_accessed(id);
            }
        }
        FileEvent::Removed(path) => {
            if let Some(inode) = known.remove(&path) {
                engine.on_evicted(PageId::new(inode, 0), PageFlags::new(false, false, false));
            }
        }
    }
}

/// Drive `engine` from real filesystem activity under `watch_dir` until
/// `exit` is set. One logical page (offset 0) per watched file — this
/// observer has no page-level granularity, unlike a real kernel attachment.
pub async fn run(mut engine: Engine, watch_dir: PathBuf, exit: Arc<AtomicBool>) -> CacheExtResult<()> {
    let (_watcher, mut rx) = spawn_watcher(&watch_dir)?;
    let mut known = HashMap::new();
    let mut tick = tokio::time::interval(TICK_INTERVAL);

    loop {
        if exit.load(Ordering::Relaxed) {
            break;
        }
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => handle_file_event(&mut engine, &mut known, event),
                    None => break,
                }
            }
            _ = tick.tick() => {
                let mut ctx = FsEvictionContext {
                    budget: EVICT_BUDGET,
                    submitted: Vec::new(),
                };
                engine.on_evict_request(&mut ctx);
                for id in ctx.submitted {
                    known.retain(|_, inode| *inode != id.inode);
                    engine.on_evicted(id, PageFlags::new(true, false, false));
                }
            }
        }
    }

    info!(tracked = engine.tracked_pages(), "observer shutting down");
    Ok(())
}
