//! Alert draining: keeps the registry in step with the engine's alert feed.

use std::collections::{HashSet, VecDeque};

use tormon_torrent_core::{Alert, TorrentEngine, TorrentHandle, TorrentStatus};
use tracing::{debug, info, warn};

use crate::registry::TorrentRegistry;
use crate::resume::FastResumeStore;

/// Messages kept in the alerts log.
pub const ALERTS_LOG_CAPACITY: usize = 20;

/// Bounded ring of recent alert messages.
#[derive(Debug, Default)]
pub struct AlertsLog {
    entries: VecDeque<String>,
}

impl AlertsLog {
    /// Append a message, evicting the oldest once full.
    pub fn push(&mut self, message: String) {
        if self.entries.len() == ALERTS_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(message);
    }

    /// Messages from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handles whose resume data was requested and not yet confirmed.
#[derive(Debug, Default)]
pub struct PendingShutdownSet {
    handles: HashSet<TorrentHandle>,
}

impl PendingShutdownSet {
    /// Record an outstanding request.
    pub fn insert(&mut self, handle: TorrentHandle) -> bool {
        self.handles.insert(handle)
    }

    /// Clear an outstanding request; `false` if it was not pending.
    pub fn remove(&mut self, handle: TorrentHandle) -> bool {
        self.handles.remove(&handle)
    }

    /// Whether `handle` is awaiting confirmation.
    #[must_use]
    pub fn contains(&self, handle: TorrentHandle) -> bool {
        self.handles.contains(&handle)
    }

    /// Outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether every request has been answered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Outstanding handles in ascending order.
    #[must_use]
    pub fn handles(&self) -> Vec<TorrentHandle> {
        let mut handles: Vec<_> = self.handles.iter().copied().collect();
        handles.sort_unstable();
        handles
    }

    fn clear(&mut self) -> Vec<TorrentHandle> {
        let handles = self.handles();
        self.handles.clear();
        handles
    }
}

/// Per-class counts from one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Add confirmations.
    pub added: usize,
    /// Status batches received.
    pub batches: usize,
    /// Statuses applied from update batches.
    pub updated: usize,
    /// Statuses ignored because their handle was never added.
    pub stale: usize,
    /// Resume payloads written to disk.
    pub saved: usize,
    /// Resume requests that failed, in the engine or on disk.
    pub failed: usize,
    /// Resume alerts for handles that were not pending.
    pub unsolicited: usize,
    /// Informational alerts.
    pub other: usize,
}

impl DrainReport {
    /// Alerts handled in this drain.
    #[must_use]
    pub const fn alerts(&self) -> usize {
        self.added + self.saved + self.failed + self.unsolicited + self.other + self.batches
    }
}

/// Classifies alerts and applies them to the registry.
#[derive(Debug)]
pub struct AlertProcessor {
    log: AlertsLog,
    pending: PendingShutdownSet,
    store: FastResumeStore,
    max_connections: i32,
}

impl AlertProcessor {
    /// Processor persisting resume data through `store` and capping each
    /// admitted torrent at `max_connections` peers.
    #[must_use]
    pub fn new(store: FastResumeStore, max_connections: i32) -> Self {
        Self {
            log: AlertsLog::default(),
            pending: PendingShutdownSet::default(),
            store,
            max_connections,
        }
    }

    /// Recent alert messages.
    #[must_use]
    pub const fn log(&self) -> &AlertsLog {
        &self.log
    }

    /// Outstanding resume requests.
    #[must_use]
    pub const fn pending(&self) -> &PendingShutdownSet {
        &self.pending
    }

    /// Resume file store.
    #[must_use]
    pub const fn store(&self) -> &FastResumeStore {
        &self.store
    }

    /// Track a resume request issued for `handle`.
    pub fn mark_pending(&mut self, handle: TorrentHandle) {
        self.pending.insert(handle);
    }

    /// Stop tracking every outstanding request, dropping their registry entries.
    pub fn abandon_pending(&mut self, registry: &mut TorrentRegistry) -> Vec<TorrentHandle> {
        let abandoned = self.pending.clear();
        for handle in &abandoned {
            registry.remove(*handle);
        }
        abandoned
    }

    /// Drain every queued alert and apply it.
    pub async fn process(
        &mut self,
        engine: &dyn TorrentEngine,
        registry: &mut TorrentRegistry,
    ) -> DrainReport {
        let mut report = DrainReport::default();
        for alert in engine.pop_alerts().await {
            self.log.push(alert.message());
            match alert {
                Alert::TorrentAdded { handle, status } => {
                    self.on_added(engine, registry, handle, *status).await;
                    report.added += 1;
                }
                Alert::StateUpdate { statuses } => {
                    report.batches += 1;
                    for status in statuses {
                        if registry.contains(status.handle) {
                            registry.upsert(status);
                            report.updated += 1;
                        } else {
                            debug!(handle = %status.handle, "status for unknown torrent ignored");
                            report.stale += 1;
                        }
                    }
                }
                Alert::ResumeDataSaved { handle, payload } => {
                    if !self.pending.contains(handle) {
                        debug!(%handle, "resume data for torrent not shutting down");
                        report.unsolicited += 1;
                        continue;
                    }
                    let name = torrent_name(registry, handle);
                    match self.store.save(&name, &payload) {
                        Ok(path) => {
                            info!(%handle, torrent = %name, path = %path.display(), "resume data saved");
                            report.saved += 1;
                        }
                        Err(err) => {
                            warn!(%handle, torrent = %name, error = %err, "failed to persist resume data");
                            report.failed += 1;
                        }
                    }
                    self.release(registry, handle);
                }
                Alert::ResumeDataSaveFailed { handle, message } => {
                    if !self.pending.contains(handle) {
                        debug!(%handle, message = %message, "resume failure for torrent not shutting down");
                        report.unsolicited += 1;
                        continue;
                    }
                    warn!(%handle, message = %message, "engine could not produce resume data");
                    report.failed += 1;
                    self.release(registry, handle);
                }
                Alert::Other { message } => {
                    debug!(message = %message, "engine alert");
                    report.other += 1;
                }
            }
        }
        report
    }

    async fn on_added(
        &mut self,
        engine: &dyn TorrentEngine,
        registry: &mut TorrentRegistry,
        handle: TorrentHandle,
        status: TorrentStatus,
    ) {
        if let Err(err) = engine.set_max_connections(handle, self.max_connections).await {
            warn!(%handle, error = %err, "failed to cap peer connections");
        }
        if let Err(err) = engine.set_max_uploads(handle, -1).await {
            warn!(%handle, error = %err, "failed to lift upload slot cap");
        }
        // The admission snapshot may predate updates already dropped as stale.
        let status = match engine.status(handle).await {
            Ok(current) => current,
            Err(err) => {
                debug!(%handle, error = %err, "keeping admission snapshot");
                status
            }
        };
        info!(%handle, torrent = %status.name, "torrent added");
        registry.upsert(TorrentStatus { handle, ..status });
    }

    fn release(&mut self, registry: &mut TorrentRegistry, handle: TorrentHandle) {
        self.pending.remove(handle);
        registry.remove(handle);
    }
}

fn torrent_name(registry: &TorrentRegistry, handle: TorrentHandle) -> String {
    registry
        .get(handle)
        .map_or_else(|| format!("torrent-{}", handle.raw()), |status| status.name.clone())
}
