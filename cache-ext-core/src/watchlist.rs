//! The inode watchlist the hook dispatcher consults on every lifecycle hook.
//!
//! The watchlist itself is populated once at startup by an external
//! initializer (in this workspace, `cache-ext-cli`'s directory walk); the
//! core only needs to ask whether an inode is in scope.

use std::collections::HashSet;

use crate::error::{CacheExtError, CacheExtResult};
use crate::page::InodeId;

/// Maximum length, in bytes, of the canonicalized watch directory path.
pub const MAX_WATCH_DIR_PATH_BYTES: usize = 128;

/// The set of inode numbers the engine is scoped to.
#[derive(Debug, Default, Clone)]
pub struct InodeWatchlist {
    inodes: HashSet<InodeId>,
}

impl InodeWatchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_inodes(inodes: impl IntoIterator<Item = InodeId>) -> Self {
        Self {
            inodes: inodes.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, inode: InodeId) {
        self.inodes.insert(inode);
    }

    pub fn contains(&self, inode: InodeId) -> bool {
        self.inodes.contains(&inode)
    }

    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inodes.is_empty()
    }
}

/// Validate a watch directory path against the startup contract: it must
/// exist and its canonical form must not exceed
/// [`MAX_WATCH_DIR_PATH_BYTES`].
pub fn validate_watch_dir_path(canonical: &str) -> CacheExtResult<()> {
    if canonical.len() > MAX_WATCH_DIR_PATH_BYTES {
        return Err(CacheExtError::WatchDirPathTooLong {
            path: canonical.to_string(),
            len: canonical.len(),
            max: MAX_WATCH_DIR_PATH_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_only_inserted_inodes() {
        let list = InodeWatchlist::from_inodes([1, 2, 3]);
        assert!(list.contains(2));
        assert!(!list.contains(4));
    }

    #[test]
    fn rejects_overlong_path() {
        let long = "a".repeat(MAX_WATCH_DIR_PATH_BYTES + 1);
        assert!(validate_watch_dir_path(&long).is_err());
    }

    #[test]
    fn accepts_path_at_the_boundary() {
        let boundary = "a".repeat(MAX_WATCH_DIR_PATH_BYTES);
        assert!(validate_watch_dir_path(&boundary).is_ok());
    }
}
