//! Recent-assessment history.
//!
//! Holds the last few results, most recent first, mirrored in memory and
//! written through to a [`KeyValueStore`] on every change.
//!
//! Key properties:
//! - At most [`MAX_HISTORY_ENTRIES`] entries; pushing past that evicts the oldest
//! - Entries are positional; identical results pushed twice are two entries
//! - Storage is best-effort: unreadable data loads as empty, failed writes
//!   are logged and the in-memory list still updates
//! - `push` replaces the list under a write lock, so readers never see a
//!   partially updated list
//! - A poisoned lock surfaces as [`HistoryError::LockPoisoned`]

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec;
use crate::config;
use crate::models::HistoryEntry;
use crate::store::KeyValueStore;

/// Maximum number of retained history entries.
pub const MAX_HISTORY_ENTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("History index {index} out of range (history has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Internal lock error")]
    LockPoisoned,
}

pub struct HistoryCache<S> {
    store: S,
    key: String,
    entries: RwLock<Vec<HistoryEntry>>,
}

impl<S: KeyValueStore> HistoryCache<S> {
    /// Open the cache on the default history key and load what is stored.
    pub fn open(store: S) -> Self {
        Self::open_with_key(store, config::HISTORY_KEY)
    }

    pub fn open_with_key(store: S, key: &str) -> Self {
        let loaded = read_stored(&store, key);
        tracing::info!(len = loaded.len(), "History loaded");
        Self {
            store,
            key: key.to_string(),
            entries: RwLock::new(loaded),
        }
    }

    /// Re-read the stored list, replacing the in-memory mirror.
    ///
    /// Missing or corrupt data yields an empty list; an over-long stored
    /// list is cut to the newest [`MAX_HISTORY_ENTRIES`].
    pub fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let loaded = read_stored(&self.store, &self.key);
        let mut entries = self.write_entries()?;
        *entries = loaded;
        tracing::info!(len = entries.len(), "History reloaded");
        Ok(entries.clone())
    }

    /// Prepend `entry`, evict beyond the limit, persist, and return the new list.
    ///
    /// The write lock is held across the store write so two pushes cannot
    /// persist out of order. The write is one small file; callers on an
    /// async runtime accept that brief block.
    pub fn push(&self, entry: HistoryEntry) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries = self.write_entries()?;

        let mut updated = Vec::with_capacity(MAX_HISTORY_ENTRIES);
        updated.push(entry);
        updated.extend(entries.iter().take(MAX_HISTORY_ENTRIES - 1).cloned());

        self.persist(&updated);
        *entries = updated;
        Ok(entries.clone())
    }

    /// Entry at `index` (0 = most recent). Does not modify the cache.
    pub fn select(&self, index: usize) -> Result<HistoryEntry, HistoryError> {
        let entries = self.read_entries()?;
        entries
            .get(index)
            .cloned()
            .ok_or(HistoryError::IndexOutOfRange {
                index,
                len: entries.len(),
            })
    }

    /// Snapshot of the current list, most recent first.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.read_entries()?.clone())
    }

    // ── Internal ────────────────────────────────────────────

    fn persist(&self, entries: &[HistoryEntry]) {
        let written = codec::encode_history(entries)
            .map_err(|e| e.to_string())
            .and_then(|text| self.store.set(&self.key, &text).map_err(|e| e.to_string()));
        match written {
            Ok(()) => tracing::debug!(len = entries.len(), "History persisted"),
            Err(error) => tracing::warn!(%error, "Failed to persist history, keeping in memory only"),
        }
    }

    fn read_entries(&self) -> Result<RwLockReadGuard<'_, Vec<HistoryEntry>>, HistoryError> {
        self.entries.read().map_err(|_| HistoryError::LockPoisoned)
    }

    fn write_entries(&self) -> Result<RwLockWriteGuard<'_, Vec<HistoryEntry>>, HistoryError> {
        self.entries.write().map_err(|_| HistoryError::LockPoisoned)
    }
}

fn read_stored<S: KeyValueStore>(store: &S, key: &str) -> Vec<HistoryEntry> {
    let mut loaded = match store.get(key) {
        Ok(Some(text)) => codec::decode_history(&text).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Stored history unreadable, starting empty");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            tracing::warn!(key, error = %e, "History store unavailable, starting empty");
            Vec::new()
        }
    };

    if loaded.len() > MAX_HISTORY_ENTRIES {
        tracing::warn!(len = loaded.len(), "Stored history too long, truncating");
        loaded.truncate(MAX_HISTORY_ENTRIES);
    }
    loaded
}
