//! Engine capability implemented by adapters.

use async_trait::async_trait;

use crate::alert::Alert;
use crate::error::TorrentResult;
use crate::model::{
    AddTorrent, FileProgress, PartialPiece, PeerInfo, TorrentHandle, TorrentStatus,
};

/// Primary engine trait implemented by adapters.
///
/// Every command is fire-and-forget: it returns once the engine has accepted
/// it, and the outcome arrives later through [`TorrentEngine::pop_alerts`].
/// None of the calls may block for an unbounded time.
#[async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Queue a torrent for admission; a [`Alert::TorrentAdded`] follows.
    async fn add_torrent(&self, request: AddTorrent) -> TorrentResult<()>;

    /// Take every alert queued since the previous call.
    async fn pop_alerts(&self) -> Vec<Alert>;

    /// Ask for a [`Alert::StateUpdate`] batch on a future drain.
    async fn post_torrent_updates(&self);

    /// Pause the whole session.
    async fn pause_session(&self);

    /// Whether the handle still refers to a loaded torrent.
    async fn is_valid(&self, handle: TorrentHandle) -> bool;

    /// Current status of one torrent.
    async fn status(&self, handle: TorrentHandle) -> TorrentResult<TorrentStatus>;

    /// Pause one torrent.
    async fn pause(&self, handle: TorrentHandle) -> TorrentResult<()>;

    /// Resume one torrent.
    async fn resume(&self, handle: TorrentHandle) -> TorrentResult<()>;

    /// Announce to trackers now.
    async fn force_reannounce(&self, handle: TorrentHandle) -> TorrentResult<()>;

    /// Cap peer connections for one torrent.
    async fn set_max_connections(&self, handle: TorrentHandle, limit: i32) -> TorrentResult<()>;

    /// Cap unchoked peers for one torrent; `-1` means unlimited.
    async fn set_max_uploads(&self, handle: TorrentHandle, limit: i32) -> TorrentResult<()>;

    /// Request resume data; answered by [`Alert::ResumeDataSaved`] or
    /// [`Alert::ResumeDataSaveFailed`].
    async fn save_resume_data(&self, handle: TorrentHandle) -> TorrentResult<()>;

    /// Connected peers.
    async fn peer_info(&self, handle: TorrentHandle) -> TorrentResult<Vec<PeerInfo>>;

    /// Pieces currently being downloaded.
    async fn download_queue(&self, handle: TorrentHandle) -> TorrentResult<Vec<PartialPiece>>;

    /// Per-file progress; fails until metadata is available.
    async fn file_progress(&self, handle: TorrentHandle) -> TorrentResult<Vec<FileProgress>>;
}
