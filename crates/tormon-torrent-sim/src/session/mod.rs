//! In-process torrent session that follows the engine's alert contract.

mod resume;
mod torrent;

use std::mem;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tormon_torrent_core::{
    AddTorrent, Alert, FileProgress, PartialPiece, PeerInfo, TorrentEngine, TorrentError,
    TorrentHandle, TorrentResult, TorrentStatus,
};
use tracing::{debug, info};

use self::torrent::SimTorrent;
use crate::types::{SessionSettings, SimulationProfile};

/// Simulated engine: torrents progress deterministically each time a status
/// refresh is requested, and every outcome is reported through alerts.
pub struct SimulatedEngine {
    settings: SessionSettings,
    profile: SimulationProfile,
    inner: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    torrents: Vec<SimTorrent>,
    pending_alerts: Vec<Alert>,
    next_handle: u64,
    paused: bool,
}

impl SessionState {
    fn torrent(&self, handle: TorrentHandle) -> TorrentResult<&SimTorrent> {
        self.torrents
            .iter()
            .find(|torrent| torrent.handle == handle)
            .ok_or(TorrentError::InvalidHandle { handle })
    }

    fn torrent_mut(&mut self, handle: TorrentHandle) -> TorrentResult<&mut SimTorrent> {
        self.torrents
            .iter_mut()
            .find(|torrent| torrent.handle == handle)
            .ok_or(TorrentError::InvalidHandle { handle })
    }

    fn note(&mut self, message: String) {
        self.pending_alerts.push(Alert::other(message));
    }
}

impl SimulatedEngine {
    /// Start a session with the given settings and swarm behaviour.
    #[must_use]
    pub fn new(settings: SessionSettings, profile: SimulationProfile) -> Self {
        info!(
            listen = %settings.listen_interfaces,
            outgoing = %settings.outgoing_interfaces,
            user_agent = %settings.user_agent,
            download_limit = settings.download_rate_limit,
            upload_limit = settings.upload_rate_limit,
            proxy = ?settings.proxy.as_ref().map(|proxy| format!("{}:{}", proxy.host, proxy.port)),
            "simulated session started"
        );
        Self {
            settings,
            profile,
            inner: Mutex::new(SessionState {
                next_handle: 1,
                ..SessionState::default()
            }),
        }
    }

    /// Settings the session was started with.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Queue an arbitrary alert, as if the session had raised it.
    pub async fn push_alert(&self, alert: Alert) {
        self.inner.lock().await.pending_alerts.push(alert);
    }

    /// Make every future resume-data request for `handle` fail.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidHandle`] if the handle is unknown.
    pub async fn fail_resume_for(&self, handle: TorrentHandle) -> TorrentResult<()> {
        self.inner.lock().await.torrent_mut(handle)?.fail_resume = true;
        Ok(())
    }

    /// Drop a torrent from the session so its handle becomes invalid.
    pub async fn drop_torrent(&self, handle: TorrentHandle) -> bool {
        let mut state = self.inner.lock().await;
        let before = state.torrents.len();
        state.torrents.retain(|torrent| torrent.handle != handle);
        before != state.torrents.len()
    }

    /// Current connection and unchoke caps for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`TorrentError::InvalidHandle`] if the handle is unknown.
    pub async fn limits(&self, handle: TorrentHandle) -> TorrentResult<(i32, i32)> {
        let state = self.inner.lock().await;
        let torrent = state.torrent(handle)?;
        Ok((torrent.max_connections, torrent.max_uploads))
    }

    /// Whether the whole session has been paused.
    pub async fn is_session_paused(&self) -> bool {
        self.inner.lock().await.paused
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new(SessionSettings::default(), SimulationProfile::default())
    }
}

#[async_trait]
impl TorrentEngine for SimulatedEngine {
    async fn add_torrent(&self, request: AddTorrent) -> TorrentResult<()> {
        let mut state = self.inner.lock().await;
        let info_hash = request.source.info_hash();
        if request.flags.duplicate_is_error
            && state
                .torrents
                .iter()
                .any(|torrent| torrent.info_hash == info_hash)
        {
            return Err(TorrentError::Duplicate {
                info_hash: info_hash.to_string(),
            });
        }

        let handle = TorrentHandle::new(state.next_handle);
        state.next_handle += 1;
        let (mut torrent, rejected) = SimTorrent::from_add(handle, &request, &self.profile);
        if state.paused {
            torrent.set_paused(true);
        }
        debug!(
            %handle,
            name = torrent.name(),
            save_path = %request.save_path.display(),
            auto_managed = request.flags.auto_managed,
            sparse = request.flags.sparse_storage,
            "torrent admitted"
        );
        let status = torrent.status();
        state.torrents.push(torrent);
        state.pending_alerts.push(Alert::TorrentAdded {
            handle,
            status: Box::new(status),
        });
        if let Some(reason) = rejected {
            state.note(format!("{handle}: {reason}"));
        }
        Ok(())
    }

    async fn pop_alerts(&self) -> Vec<Alert> {
        mem::take(&mut self.inner.lock().await.pending_alerts)
    }

    async fn post_torrent_updates(&self) {
        let mut state = self.inner.lock().await;
        let mut statuses = Vec::with_capacity(state.torrents.len());
        let mut notes = Vec::new();
        for torrent in &mut state.torrents {
            notes.extend(torrent.step(&self.profile, &self.settings));
            statuses.push(torrent.status());
        }
        for note in notes {
            state.note(note);
        }
        if !statuses.is_empty() {
            state.pending_alerts.push(Alert::StateUpdate { statuses });
        }
    }

    async fn pause_session(&self) {
        let mut state = self.inner.lock().await;
        state.paused = true;
        for torrent in &mut state.torrents {
            torrent.set_paused(true);
        }
        state.note("session paused".to_string());
    }

    async fn is_valid(&self, handle: TorrentHandle) -> bool {
        self.inner.lock().await.torrent(handle).is_ok()
    }

    async fn status(&self, handle: TorrentHandle) -> TorrentResult<TorrentStatus> {
        Ok(self.inner.lock().await.torrent(handle)?.status())
    }

    async fn pause(&self, handle: TorrentHandle) -> TorrentResult<()> {
        let mut state = self.inner.lock().await;
        let torrent = state.torrent_mut(handle)?;
        torrent.set_paused(true);
        let message = format!("{}: torrent paused", torrent.name());
        state.note(message);
        Ok(())
    }

    async fn resume(&self, handle: TorrentHandle) -> TorrentResult<()> {
        let mut state = self.inner.lock().await;
        let torrent = state.torrent_mut(handle)?;
        torrent.set_paused(false);
        let message = format!("{}: torrent resumed", torrent.name());
        state.note(message);
        Ok(())
    }

    async fn force_reannounce(&self, handle: TorrentHandle) -> TorrentResult<()> {
        let mut state = self.inner.lock().await;
        let torrent = state.torrent_mut(handle)?;
        torrent.request_announce();
        let message = match torrent.current_tracker() {
            "" => format!("{}: no tracker to announce to", torrent.name()),
            tracker => format!("{}: re-announce requested to {tracker}", torrent.name()),
        };
        state.note(message);
        Ok(())
    }

    async fn set_max_connections(&self, handle: TorrentHandle, limit: i32) -> TorrentResult<()> {
        self.inner.lock().await.torrent_mut(handle)?.max_connections = limit;
        Ok(())
    }

    async fn set_max_uploads(&self, handle: TorrentHandle, limit: i32) -> TorrentResult<()> {
        self.inner.lock().await.torrent_mut(handle)?.max_uploads = limit;
        Ok(())
    }

    async fn save_resume_data(&self, handle: TorrentHandle) -> TorrentResult<()> {
        let mut state = self.inner.lock().await;
        let torrent = state.torrent(handle)?;
        let alert = if torrent.fail_resume {
            Alert::ResumeDataSaveFailed {
                handle,
                message: format!("{}: resume data could not be generated", torrent.name()),
            }
        } else if !torrent.has_metadata() {
            Alert::ResumeDataSaveFailed {
                handle,
                message: format!("{}: torrent has no metadata", torrent.name()),
            }
        } else {
            Alert::ResumeDataSaved {
                handle,
                payload: torrent.resume_payload().encode(),
            }
        };
        state.pending_alerts.push(alert);
        Ok(())
    }

    async fn peer_info(&self, handle: TorrentHandle) -> TorrentResult<Vec<PeerInfo>> {
        Ok(self.inner.lock().await.torrent(handle)?.peers(&self.profile))
    }

    async fn download_queue(&self, handle: TorrentHandle) -> TorrentResult<Vec<PartialPiece>> {
        Ok(self.inner.lock().await.torrent(handle)?.download_queue())
    }

    async fn file_progress(&self, handle: TorrentHandle) -> TorrentResult<Vec<FileProgress>> {
        self.inner
            .lock()
            .await
            .torrent(handle)?
            .file_progress()
            .ok_or(TorrentError::MetadataUnavailable { handle })
    }
}
