//! Local view of every tracked torrent, keyed by handle.

use std::collections::HashMap;

use tormon_torrent_core::{TorrentHandle, TorrentStatus};

/// Latest status per torrent, iterated in insertion order.
///
/// Entries are only ever replaced wholesale; the registry never talks to the engine.
#[derive(Debug, Default)]
pub struct TorrentRegistry {
    order: Vec<TorrentHandle>,
    entries: HashMap<TorrentHandle, TorrentStatus>,
}

impl TorrentRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `status.handle`.
    pub fn upsert(&mut self, status: TorrentStatus) {
        let handle = status.handle;
        if self.entries.insert(handle, status).is_none() {
            self.order.push(handle);
        }
    }

    /// Drop the entry for `handle`, returning it if present.
    pub fn remove(&mut self, handle: TorrentHandle) -> Option<TorrentStatus> {
        let removed = self.entries.remove(&handle)?;
        self.order.retain(|known| *known != handle);
        Some(removed)
    }

    /// Latest status for `handle`.
    #[must_use]
    pub fn get(&self, handle: TorrentHandle) -> Option<&TorrentStatus> {
        self.entries.get(&handle)
    }

    /// Whether `handle` is tracked.
    #[must_use]
    pub fn contains(&self, handle: TorrentHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Number of tracked torrents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tracked handles in insertion order.
    #[must_use]
    pub fn handles(&self) -> Vec<TorrentHandle> {
        self.order.clone()
    }

    /// Tracked statuses in insertion order.
    pub fn snapshot(&self) -> impl Iterator<Item = &TorrentStatus> {
        self.order.iter().filter_map(|handle| self.entries.get(handle))
    }
}
