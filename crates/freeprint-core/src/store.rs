// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Snapshot-based collection store with flat JSON persistence.
//
// Readers get an immutable `Arc<Vec<T>>`; every write builds a complete new
// collection and swaps it in, so a reader never observes a half-updated
// list.  Stores with a backing file rewrite the whole file after each write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::Result;

/// A collection that is only ever replaced wholesale.
pub struct SnapshotStore<T> {
    items: ArcSwap<Vec<T>>,
    /// JSON file the collection is mirrored to, if any.
    path: Option<PathBuf>,
}

impl<T> SnapshotStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// A store that lives only in memory (useful for tests).
    pub fn in_memory() -> Self {
        Self::from_items(Vec::new(), None)
    }

    /// Open the store backed by `path`.
    ///
    /// A missing file yields an empty store.  An unreadable or unparsable
    /// file is logged and also yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let items = Self::read_file(&path).unwrap_or_else(|e| {
            error!(path = %path.display(), error = %e, "failed to load collection, starting empty");
            Vec::new()
        });
        Self::from_items(items, Some(path))
    }

    /// Build a store from already-loaded items.  Nothing is written.
    pub fn from_items(items: Vec<T>, path: Option<PathBuf>) -> Self {
        Self {
            items: ArcSwap::from_pointee(items),
            path,
        }
    }

    /// Read a collection file without opening a store.
    ///
    /// Returns an empty collection if the file does not exist or is blank.
    pub fn read_file(path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            debug!(path = %path.display(), "no saved collection");
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    /// Immutable view of the current collection.
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.items.load_full()
    }

    pub fn len(&self) -> usize {
        self.items.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.load().is_empty()
    }

    /// Replace the whole collection and persist it.
    pub fn replace(&self, items: Vec<T>) {
        self.items.store(Arc::new(items));
        self.persist();
    }

    /// Derive a new collection from the current one and persist it.
    ///
    /// `f` may run more than once if another writer races us; it must be a
    /// pure function of its input.
    pub fn update<F>(&self, f: F) -> Arc<Vec<T>>
    where
        F: FnMut(&[T]) -> Vec<T>,
    {
        let updated = self.swap_in(f);
        self.persist();
        updated
    }

    /// Like [`update`](Self::update) but without touching the backing file.
    /// Used for state that must not be persisted.
    pub fn update_transient<F>(&self, f: F) -> Arc<Vec<T>>
    where
        F: FnMut(&[T]) -> Vec<T>,
    {
        self.swap_in(f)
    }

    fn swap_in<F>(&self, mut f: F) -> Arc<Vec<T>>
    where
        F: FnMut(&[T]) -> Vec<T>,
    {
        self.items.rcu(|current| Arc::new(f(current.as_slice())));
        self.items.load_full()
    }

    /// Write the current snapshot to the backing file.
    ///
    /// Failures are logged; the in-memory snapshot stays authoritative.
    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = self.write_file(path) {
            error!(path = %path.display(), error = %e, "failed to save collection");
        }
    }

    fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = self.items.load();
        let json = serde_json::to_string_pretty(snapshot.as_slice())?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), count = snapshot.len(), "collection saved");
        Ok(())
    }
}

impl<T> Default for SnapshotStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<T> std::fmt::Debug for SnapshotStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("len", &self.items.load().len())
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let store: SnapshotStore<String> = SnapshotStore::in_memory();
        store.replace(vec!["a".into()]);
        let before = store.snapshot();

        store.update(|items| {
            let mut next = items.to_vec();
            next.push("b".into());
            next
        });

        assert_eq!(before.as_slice(), ["a".to_string()]);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn persisted_collection_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("items.json");

        let store: SnapshotStore<u32> = SnapshotStore::open(&path);
        assert!(store.is_empty());
        store.replace(vec![1, 2, 3]);

        let reopened: SnapshotStore<u32> = SnapshotStore::open(&path);
        assert_eq!(reopened.snapshot().as_slice(), [1, 2, 3]);
    }

    #[test]
    fn transient_updates_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");

        let store: SnapshotStore<u32> = SnapshotStore::open(&path);
        store.replace(vec![1]);
        store.update_transient(|_| vec![9]);

        assert_eq!(store.snapshot().as_slice(), [9]);
        let reopened: SnapshotStore<u32> = SnapshotStore::open(&path);
        assert_eq!(reopened.snapshot().as_slice(), [1]);
    }

    #[test]
    fn corrupt_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store: SnapshotStore<u32> = SnapshotStore::open(&path);
        assert!(store.is_empty());
    }
}
