//! Core torrent domain types shared across the workspace.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TorrentError, TorrentResult};
use crate::metainfo::{MagnetLink, TorrentMetainfo};

/// Opaque identity assigned by the engine to a loaded torrent.
///
/// Only used as a map key; it never performs engine calls on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorrentHandle(u64);

impl TorrentHandle {
    /// Wrap a raw engine identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw engine identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TorrentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Waiting for an active slot.
    Queued,
    /// Verifying pieces already on disk.
    Checking,
    /// Fetching the info dictionary from peers.
    DownloadingMetadata,
    /// Transferring payload.
    Downloading,
    /// All selected pieces downloaded.
    Finished,
    /// Complete and uploading to peers.
    Seeding,
    /// Validating previously saved resume data.
    CheckingResume,
    /// Engine reported a state this build does not know.
    #[default]
    Unknown,
}

impl TorrentState {
    /// Label shown in the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Checking => "checking",
            Self::DownloadingMetadata => "downloading metadata",
            Self::Downloading => "downloading",
            Self::Finished => "finished",
            Self::Seeding => "seeding",
            Self::CheckingResume => "checking fastresume",
            Self::Unknown => "unknown",
        }
    }
}

/// Full status snapshot for a single torrent.
///
/// Snapshots are replaced wholesale; consumers never patch individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentStatus {
    /// Handle the snapshot belongs to.
    pub handle: TorrentHandle,
    /// Display name.
    pub name: String,
    /// Current lifecycle state.
    pub state: TorrentState,
    /// Whether the torrent is paused.
    pub paused: bool,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    /// Verified payload bytes on disk.
    pub total_done: u64,
    /// Bytes downloaded this session, protocol overhead included.
    pub total_download: u64,
    /// Bytes uploaded this session.
    pub total_upload: u64,
    /// Current download rate in bytes per second.
    pub download_rate: i64,
    /// Current upload rate in bytes per second.
    pub upload_rate: i64,
    /// Connected peers.
    pub num_peers: u32,
    /// Connected seeds.
    pub num_seeds: u32,
    /// Completed pieces.
    pub num_pieces: u32,
    /// Pieces in the torrent; zero until metadata arrives.
    pub total_pieces: u32,
    /// Time until the next tracker announce.
    pub next_announce: Duration,
    /// Tracker currently in use, possibly empty.
    pub current_tracker: String,
    /// Lowercase hex info-hash.
    pub info_hash: String,
    /// Whether the info dictionary is known.
    pub has_metadata: bool,
}

impl TorrentStatus {
    /// Blank snapshot for a freshly admitted torrent.
    #[must_use]
    pub fn new(handle: TorrentHandle, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
            state: TorrentState::Queued,
            paused: false,
            progress: 0.0,
            total_done: 0,
            total_download: 0,
            total_upload: 0,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            num_seeds: 0,
            num_pieces: 0,
            total_pieces: 0,
            next_announce: Duration::ZERO,
            current_tracker: String::new(),
            info_hash: String::new(),
            has_metadata: false,
        }
    }

    /// Whether every piece has been downloaded.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.has_metadata && self.total_pieces > 0 && self.num_pieces >= self.total_pieces
    }

    /// Whether the dashboard should use the condensed seeding layout.
    #[must_use]
    pub fn is_seeding(&self) -> bool {
        self.state == TorrentState::Seeding
    }
}

/// Connection phase and role bits for a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeerFlags {
    /// Outgoing TCP connection still being established.
    pub connecting: bool,
    /// Connected but the protocol handshake is incomplete.
    pub handshake: bool,
    /// Peer has every piece.
    pub seed: bool,
}

/// Per-peer detail returned on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Connection flags.
    pub flags: PeerFlags,
    /// Download rate from this peer in bytes per second.
    pub down_speed: i64,
    /// Upload rate to this peer in bytes per second.
    pub up_speed: i64,
    /// Piece currently being downloaded from the peer.
    pub downloading_piece_index: Option<u32>,
    /// Bytes of that piece received so far.
    pub downloading_progress: u64,
    /// Size of that piece in bytes.
    pub downloading_total: u64,
    /// Client identification string.
    pub client: String,
}

impl PeerInfo {
    /// Whether the peer is still connecting or handshaking.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.flags.connecting || self.flags.handshake
    }
}

/// State of one block within an in-flight piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Not requested from any peer.
    #[default]
    None,
    /// Requested but no data yet.
    Requested,
    /// Data received and being written.
    Writing,
    /// Written to disk.
    Finished,
}

/// Piece currently in the download queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialPiece {
    /// Piece index.
    pub piece_index: u32,
    /// Per-block state, in block order.
    pub blocks: Vec<BlockState>,
}

/// Download progress of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProgress {
    /// Path of the file inside the torrent.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Bytes downloaded.
    pub done: u64,
}

impl FileProgress {
    /// Completion fraction clamped to `[0, 1]`; empty files count as complete.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.size == 0 {
            1.0
        } else {
            (self.done as f64 / self.size as f64).min(1.0)
        }
    }
}

/// Source describing how a torrent should be added to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    /// Magnet URI; metadata is fetched from peers.
    Magnet(MagnetLink),
    /// Parsed `.torrent` file.
    Metainfo {
        /// File the metainfo was read from.
        path: PathBuf,
        /// Parsed metainfo.
        metainfo: TorrentMetainfo,
    },
}

impl TorrentSource {
    /// Interpret a command-line descriptor: a `magnet:` URI or a path to a `.torrent` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the magnet URI is malformed, the file cannot be read,
    /// or the file is not valid metainfo.
    pub fn from_descriptor(descriptor: &str) -> TorrentResult<Self> {
        if descriptor.starts_with("magnet:") {
            return MagnetLink::parse(descriptor).map(Self::Magnet);
        }
        let path = PathBuf::from(descriptor);
        let bytes = std::fs::read(&path).map_err(|source| TorrentError::Io {
            path: path.clone(),
            source,
        })?;
        let metainfo = TorrentMetainfo::from_bytes(&bytes)?;
        Ok(Self::Metainfo { path, metainfo })
    }

    /// Name known before the engine reports one.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Magnet(link) => link.display_name(),
            Self::Metainfo { metainfo, .. } => metainfo.name.clone(),
        }
    }

    /// Lowercase hex info-hash.
    #[must_use]
    pub fn info_hash(&self) -> &str {
        match self {
            Self::Magnet(link) => &link.info_hash,
            Self::Metainfo { metainfo, .. } => &metainfo.info_hash,
        }
    }
}

/// Admission flags forwarded to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddTorrentFlags {
    /// Let the engine queue and start the torrent.
    pub auto_managed: bool,
    /// Reject a torrent whose info-hash is already loaded.
    pub duplicate_is_error: bool,
    /// Allocate files sparsely.
    pub sparse_storage: bool,
}

impl Default for AddTorrentFlags {
    fn default() -> Self {
        Self {
            auto_managed: true,
            duplicate_is_error: true,
            sparse_storage: true,
        }
    }
}

/// Request payload for admitting a torrent into the engine.
#[derive(Debug, Clone)]
pub struct AddTorrent {
    /// Where the torrent comes from.
    pub source: TorrentSource,
    /// Directory receiving the payload.
    pub save_path: PathBuf,
    /// Resume data saved by a previous session, passed through verbatim.
    pub resume_data: Option<Vec<u8>>,
    /// Admission flags.
    pub flags: AddTorrentFlags,
}

impl AddTorrent {
    /// Admission request with default flags and no resume data.
    #[must_use]
    pub fn new(source: TorrentSource, save_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            save_path: save_path.into(),
            resume_data: None,
            flags: AddTorrentFlags::default(),
        }
    }
}
