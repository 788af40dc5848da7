use std::time::Duration;

use tormon_torrent_core::{
    AddTorrent, BlockState, FileProgress, MetainfoFile, PartialPiece, PeerFlags, PeerInfo,
    TorrentHandle, TorrentSource, TorrentState, TorrentStatus,
};

use super::resume::ResumePayload;
use crate::types::{SessionSettings, SimulationProfile, effective_rate};

const BLOCK_SIZE: u64 = 16 * 1024;
const QUEUE_DEPTH: u32 = 3;
const CLIENTS: [&str; 6] = [
    "qBittorrent/4.6.2",
    "Transmission 4.0.5",
    "libtorrent/2.0.9",
    "Deluge 2.1.1",
    "rTorrent 0.9.8",
    "BitComet 2.04",
];

/// Piece and file layout, known once metadata is available.
#[derive(Debug, Clone)]
struct Layout {
    piece_length: u64,
    num_pieces: u32,
    files: Vec<MetainfoFile>,
}

impl Layout {
    fn total_length(&self) -> u64 {
        self.files.iter().map(|file| file.length).sum()
    }

    fn synthesized(name: &str, length: u64, piece_length: u64) -> Self {
        let piece_length = piece_length.max(BLOCK_SIZE);
        let num_pieces = u32::try_from(length.div_ceil(piece_length).max(1)).unwrap_or(u32::MAX);
        Self {
            piece_length,
            num_pieces,
            files: vec![MetainfoFile {
                path: name.to_string(),
                length,
            }],
        }
    }
}

/// Mutable per-torrent state tracked by the simulated session.
#[derive(Debug, Clone)]
pub(super) struct SimTorrent {
    pub(super) handle: TorrentHandle,
    pub(super) info_hash: String,
    pub(super) fail_resume: bool,
    pub(super) max_connections: i32,
    pub(super) max_uploads: i32,
    sparse: bool,
    name: String,
    trackers: Vec<String>,
    layout: Option<Layout>,
    magnet_length: Option<u64>,
    metadata_countdown: u32,
    done_bytes: u64,
    total_download: u64,
    total_upload: u64,
    download_rate: u64,
    upload_rate: u64,
    num_peers: u32,
    num_seeds: u32,
    paused: bool,
    state: TorrentState,
    next_announce: Duration,
    refreshes: u64,
}

impl SimTorrent {
    /// Build the torrent for an admission request. The second value carries
    /// the reason resume data was discarded, if it was.
    pub(super) fn from_add(
        handle: TorrentHandle,
        request: &AddTorrent,
        profile: &SimulationProfile,
    ) -> (Self, Option<String>) {
        let (layout, magnet_length, trackers) = match &request.source {
            TorrentSource::Metainfo { metainfo, .. } => (
                Some(Layout {
                    piece_length: metainfo.piece_length,
                    num_pieces: metainfo.num_pieces,
                    files: metainfo.files.clone(),
                }),
                None,
                metainfo.trackers.clone(),
            ),
            TorrentSource::Magnet(link) => (None, link.length, link.trackers.clone()),
        };
        let state = if layout.is_some() {
            TorrentState::Queued
        } else {
            TorrentState::DownloadingMetadata
        };

        let mut torrent = Self {
            handle,
            info_hash: request.source.info_hash().to_string(),
            fail_resume: false,
            max_connections: -1,
            max_uploads: -1,
            sparse: request.flags.sparse_storage,
            name: request.source.display_name(),
            trackers,
            layout,
            magnet_length,
            metadata_countdown: profile.metadata_delay,
            done_bytes: 0,
            total_download: 0,
            total_upload: 0,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            num_seeds: 0,
            paused: false,
            state,
            next_announce: Duration::ZERO,
            refreshes: 0,
        };

        let rejected = request.resume_data.as_deref().and_then(|bytes| {
            match ResumePayload::decode(bytes, &torrent.info_hash) {
                Ok(payload) => {
                    torrent.restore(&payload, profile);
                    None
                }
                Err(reason) => Some(reason),
            }
        });
        (torrent, rejected)
    }

    fn restore(&mut self, payload: &ResumePayload, profile: &SimulationProfile) {
        if self.layout.is_none() {
            let length = self.magnet_length.unwrap_or(profile.magnet_length);
            self.layout = Some(Layout::synthesized(
                &payload.name,
                length,
                profile.magnet_piece_length,
            ));
        }
        self.name.clone_from(&payload.name);
        self.done_bytes = payload.done_bytes.min(self.total_length());
        self.total_upload = payload.total_upload;
        self.paused = payload.paused;
        self.state = TorrentState::CheckingResume;
    }

    fn total_length(&self) -> u64 {
        self.layout.as_ref().map_or(0, Layout::total_length)
    }

    fn pieces_done(&self) -> u32 {
        let Some(layout) = &self.layout else {
            return 0;
        };
        if self.done_bytes >= layout.total_length() {
            return layout.num_pieces;
        }
        u32::try_from(self.done_bytes / layout.piece_length)
            .unwrap_or(u32::MAX)
            .min(layout.num_pieces.saturating_sub(1))
    }

    fn is_complete(&self) -> bool {
        self.layout.is_some() && self.done_bytes >= self.total_length()
    }

    pub(super) const fn has_metadata(&self) -> bool {
        self.layout.is_some()
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn current_tracker(&self) -> &str {
        self.trackers.first().map_or("", String::as_str)
    }

    pub(super) const fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub(super) const fn request_announce(&mut self) {
        self.next_announce = Duration::ZERO;
    }

    fn connection_budget(&self, profile: &SimulationProfile) -> u32 {
        match u32::try_from(self.max_connections) {
            Ok(limit) if limit > 0 => profile.peers.min(limit),
            _ => profile.peers,
        }
    }

    /// Advance the simulation by one refresh interval; returns log messages
    /// for anything noteworthy that happened.
    pub(super) fn step(
        &mut self,
        profile: &SimulationProfile,
        settings: &SessionSettings,
    ) -> Vec<String> {
        let mut notes = Vec::new();
        self.refreshes += 1;
        let dt = profile.refresh_interval;

        if self.paused {
            self.download_rate = 0;
            self.upload_rate = 0;
            self.num_peers = 0;
            self.num_seeds = 0;
            return notes;
        }

        let peers = self.connection_budget(profile);
        self.num_peers = peers;

        if self.layout.is_none() {
            self.state = TorrentState::DownloadingMetadata;
            self.num_seeds = 0;
            self.metadata_countdown = self.metadata_countdown.saturating_sub(1);
            if self.metadata_countdown == 0 {
                let length = self.magnet_length.unwrap_or(profile.magnet_length);
                self.layout = Some(Layout::synthesized(
                    &self.name,
                    length,
                    profile.magnet_piece_length,
                ));
                notes.push(format!("{}: metadata received", self.name));
            }
            return notes;
        }

        let upload_rate = effective_rate(profile.upload_bps, settings.upload_rate_limit);
        self.upload_rate = upload_rate;
        self.total_upload = self.total_upload.saturating_add(bytes_over(upload_rate, dt));

        if self.is_complete() {
            self.download_rate = 0;
            self.num_seeds = 0;
            self.state = TorrentState::Seeding;
        } else {
            let download_rate = effective_rate(profile.download_bps, settings.download_rate_limit);
            let received = bytes_over(download_rate, dt);
            let remaining = self.total_length() - self.done_bytes;
            self.download_rate = download_rate;
            self.done_bytes += received.min(remaining);
            self.total_download = self.total_download.saturating_add(received);
            self.num_seeds = peers / 3;
            self.state = TorrentState::Downloading;
            if self.is_complete() {
                self.state = TorrentState::Seeding;
                notes.push(format!("{}: torrent finished", self.name));
            }
        }

        if self.next_announce <= dt {
            self.next_announce = profile.announce_interval;
            if let Some(tracker) = self.trackers.first() {
                notes.push(format!("{}: announced to {tracker}", self.name));
            }
        } else {
            self.next_announce -= dt;
        }
        notes
    }

    pub(super) fn status(&self) -> TorrentStatus {
        let total = self.total_length();
        #[allow(clippy::cast_precision_loss)]
        let progress = if total == 0 {
            0.0
        } else {
            self.done_bytes as f64 / total as f64
        };
        TorrentStatus {
            handle: self.handle,
            name: self.name.clone(),
            state: self.state,
            paused: self.paused,
            progress,
            total_done: self.done_bytes,
            total_download: self.total_download,
            total_upload: self.total_upload,
            download_rate: i64::try_from(self.download_rate).unwrap_or(i64::MAX),
            upload_rate: i64::try_from(self.upload_rate).unwrap_or(i64::MAX),
            num_peers: self.num_peers,
            num_seeds: self.num_seeds,
            num_pieces: self.pieces_done(),
            total_pieces: self.layout.as_ref().map_or(0, |layout| layout.num_pieces),
            next_announce: self.next_announce,
            current_tracker: self.current_tracker().to_string(),
            info_hash: self.info_hash.clone(),
            has_metadata: self.layout.is_some(),
        }
    }

    pub(super) fn resume_payload(&self) -> ResumePayload {
        ResumePayload {
            info_hash: self.info_hash.clone(),
            name: self.name.clone(),
            done_bytes: self.done_bytes,
            total_upload: self.total_upload,
            paused: self.paused,
            sparse: self.sparse,
        }
    }

    /// Synthetic peer list; the last peers cycle through connecting and handshake phases.
    pub(super) fn peers(&self, profile: &SimulationProfile) -> Vec<PeerInfo> {
        if self.paused || self.num_peers == 0 {
            return Vec::new();
        }
        let count = self.connection_budget(profile);
        let phase = self.refreshes % 4;
        let pending = |index: u32| -> PeerFlags {
            PeerFlags {
                connecting: count >= 1 && index == count - 1 && phase == 0,
                handshake: count >= 2 && index == count - 2 && phase == 1,
                seed: !self.is_complete() && index < count / 3,
            }
        };
        let active = (0..count)
            .filter(|index| {
                let flags = pending(*index);
                !(flags.connecting || flags.handshake)
            })
            .count()
            .max(1);
        let active = i64::try_from(active).unwrap_or(1);
        let downloading = !self.is_complete() && self.layout.is_some();
        let pieces_done = self.pieces_done();

        (0..count)
            .map(|index| {
                let flags = pending(index);
                let connected = !(flags.connecting || flags.handshake);
                let (piece, progress, total) = match &self.layout {
                    Some(layout) if downloading && connected => {
                        let piece = (pieces_done + index).min(layout.num_pieces.saturating_sub(1));
                        let blocks = layout.piece_length.div_ceil(BLOCK_SIZE).max(1);
                        let filled = (self.refreshes + u64::from(index) * 5) % blocks;
                        (
                            Some(piece),
                            (filled * BLOCK_SIZE).min(layout.piece_length),
                            layout.piece_length,
                        )
                    }
                    _ => (None, 0, 0),
                };
                let share = |rate: u64| {
                    if connected {
                        i64::try_from(rate).unwrap_or(i64::MAX) / active
                    } else {
                        0
                    }
                };
                let unchoked = u32::try_from(self.max_uploads).map_or(true, |cap| index < cap);
                PeerInfo {
                    flags,
                    down_speed: share(self.download_rate),
                    up_speed: if unchoked { share(self.upload_rate) } else { 0 },
                    downloading_piece_index: piece,
                    downloading_progress: progress,
                    downloading_total: total,
                    client: CLIENTS[index as usize % CLIENTS.len()].to_string(),
                }
            })
            .collect()
    }

    /// Pieces in flight: the head piece fills block by block, the rest are requested.
    pub(super) fn download_queue(&self) -> Vec<PartialPiece> {
        let Some(layout) = &self.layout else {
            return Vec::new();
        };
        if self.paused || self.is_complete() {
            return Vec::new();
        }
        let pieces_done = self.pieces_done();
        let in_flight = (layout.num_pieces - pieces_done).min(QUEUE_DEPTH);
        let blocks = usize::try_from(layout.piece_length.div_ceil(BLOCK_SIZE).max(1))
            .unwrap_or(usize::MAX);
        let head_finished = usize::try_from((self.done_bytes % layout.piece_length) / BLOCK_SIZE)
            .unwrap_or(usize::MAX);

        (0..in_flight)
            .map(|offset| {
                let blocks = (0..blocks)
                    .map(|block| {
                        if offset == 0 {
                            match block {
                                b if b < head_finished => BlockState::Finished,
                                b if b == head_finished => BlockState::Writing,
                                b if b < head_finished + 4 => BlockState::Requested,
                                _ => BlockState::None,
                            }
                        } else if block < 2 {
                            BlockState::Requested
                        } else {
                            BlockState::None
                        }
                    })
                    .collect();
                PartialPiece {
                    piece_index: pieces_done + offset,
                    blocks,
                }
            })
            .collect()
    }

    /// Per-file progress assuming pieces complete in payload order.
    pub(super) fn file_progress(&self) -> Option<Vec<FileProgress>> {
        let layout = self.layout.as_ref()?;
        let mut remaining = self.done_bytes;
        Some(
            layout
                .files
                .iter()
                .map(|file| {
                    let done = remaining.min(file.length);
                    remaining -= done;
                    FileProgress {
                        path: file.path.clone(),
                        size: file.length,
                        done,
                    }
                })
                .collect(),
        )
    }
}

fn bytes_over(rate: u64, dt: Duration) -> u64 {
    u64::try_from(u128::from(rate) * dt.as_millis() / 1000).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tormon_torrent_core::{MagnetLink, TorrentMetainfo};

    fn metainfo_request(length: u64, piece_length: u64) -> AddTorrent {
        let num_pieces = u32::try_from(length.div_ceil(piece_length)).expect("fits");
        let metainfo = TorrentMetainfo {
            name: "payload".into(),
            info_hash: "11".repeat(20),
            piece_length,
            num_pieces,
            files: vec![
                MetainfoFile {
                    path: "payload/a.bin".into(),
                    length: length / 2,
                },
                MetainfoFile {
                    path: "payload/b.bin".into(),
                    length: length - length / 2,
                },
            ],
            trackers: vec!["http://tracker.example/announce".into()],
        };
        AddTorrent::new(
            TorrentSource::Metainfo {
                path: PathBuf::from("payload.torrent"),
                metainfo,
            },
            "./output/",
        )
    }

    fn fast_profile() -> SimulationProfile {
        SimulationProfile {
            download_bps: 512 * 1024,
            upload_bps: 1024,
            metadata_delay: 2,
            ..SimulationProfile::default()
        }
    }

    #[test]
    fn metainfo_torrent_downloads_to_seeding() {
        let profile = fast_profile();
        let settings = SessionSettings::default();
        let (mut torrent, rejected) =
            SimTorrent::from_add(TorrentHandle::new(1), &metainfo_request(1024 * 1024, 256 * 1024), &profile);
        assert!(rejected.is_none());
        assert_eq!(torrent.status().state, TorrentState::Queued);

        let mut finished = false;
        for _ in 0..8 {
            let notes = torrent.step(&profile, &settings);
            finished |= notes.iter().any(|note| note.contains("finished"));
        }
        let status = torrent.status();
        assert!(finished);
        assert!(status.is_complete());
        assert!(status.is_seeding());
        assert_eq!(status.download_rate, 0);
        assert!((status.progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn magnet_gains_metadata_after_delay() {
        let profile = fast_profile();
        let settings = SessionSettings::default();
        let link = MagnetLink::parse(&format!(
            "magnet:?xt=urn:btih:{}&dn=linked&xl=65536",
            "22".repeat(20)
        ))
        .expect("magnet parses");
        let request = AddTorrent::new(TorrentSource::Magnet(link), "./output/");
        let (mut torrent, _) = SimTorrent::from_add(TorrentHandle::new(2), &request, &profile);

        assert!(torrent.file_progress().is_none());
        torrent.step(&profile, &settings);
        assert!(!torrent.has_metadata());
        let notes = torrent.step(&profile, &settings);
        assert!(torrent.has_metadata());
        assert!(notes.iter().any(|note| note.contains("metadata received")));
        assert_eq!(torrent.status().total_pieces, 1);
    }

    #[test]
    fn paused_torrent_makes_no_progress() {
        let profile = fast_profile();
        let settings = SessionSettings::default();
        let (mut torrent, _) =
            SimTorrent::from_add(TorrentHandle::new(3), &metainfo_request(1024 * 1024, 256 * 1024), &profile);
        torrent.set_paused(true);
        torrent.step(&profile, &settings);
        let status = torrent.status();
        assert_eq!(status.total_done, 0);
        assert!(status.paused);
        assert!(torrent.peers(&profile).is_empty());
        assert!(torrent.download_queue().is_empty());
    }

    #[test]
    fn resume_payload_round_trips_progress() {
        let profile = fast_profile();
        let settings = SessionSettings::default();
        let request = metainfo_request(4 * 1024 * 1024, 256 * 1024);
        let (mut torrent, _) = SimTorrent::from_add(TorrentHandle::new(4), &request, &profile);
        torrent.step(&profile, &settings);
        let saved = torrent.resume_payload();

        let mut resumed = request.clone();
        resumed.resume_data = Some(saved.encode());
        let (restored, rejected) = SimTorrent::from_add(TorrentHandle::new(5), &resumed, &profile);
        assert!(rejected.is_none());
        assert_eq!(restored.status().total_done, saved.done_bytes);
        assert_eq!(restored.status().state, TorrentState::CheckingResume);
    }

    #[test]
    fn resume_payload_records_allocation_mode() {
        let profile = fast_profile();
        let sparse = metainfo_request(1024 * 1024, 256 * 1024);
        let (torrent, _) = SimTorrent::from_add(TorrentHandle::new(10), &sparse, &profile);
        assert!(torrent.resume_payload().sparse);

        let mut allocated = sparse;
        allocated.flags.sparse_storage = false;
        let (torrent, _) = SimTorrent::from_add(TorrentHandle::new(11), &allocated, &profile);
        assert!(!torrent.resume_payload().sparse);
    }

    #[test]
    fn foreign_resume_data_is_discarded() {
        let profile = fast_profile();
        let mut request = metainfo_request(1024 * 1024, 256 * 1024);
        request.resume_data = Some(b"{\"nope\":true}".to_vec());
        let (torrent, rejected) = SimTorrent::from_add(TorrentHandle::new(6), &request, &profile);
        assert!(rejected.is_some());
        assert_eq!(torrent.status().total_done, 0);
    }

    #[test]
    fn download_queue_marks_head_piece_blocks() {
        let profile = fast_profile();
        let settings = SessionSettings::default();
        let (mut torrent, _) =
            SimTorrent::from_add(TorrentHandle::new(7), &metainfo_request(8 * 1024 * 1024, 1024 * 1024), &profile);
        torrent.step(&profile, &settings);

        let queue = torrent.download_queue();
        assert_eq!(queue.len(), 3);
        let head = &queue[0];
        assert_eq!(head.piece_index, 0);
        assert_eq!(head.blocks.len(), 64);
        assert_eq!(head.blocks[0], BlockState::Finished);
        assert!(head.blocks.contains(&BlockState::Writing));
        assert_eq!(queue[1].blocks[0], BlockState::Requested);
    }

    #[test]
    fn file_progress_fills_in_payload_order() {
        let profile = fast_profile();
        let settings = SessionSettings::default();
        let (mut torrent, _) =
            SimTorrent::from_add(TorrentHandle::new(8), &metainfo_request(1024 * 1024, 256 * 1024), &profile);
        torrent.step(&profile, &settings);
        let files = torrent.file_progress().expect("metadata present");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].done, 256 * 1024);
        assert_eq!(files[1].done, 0);
    }

    #[test]
    fn connection_cap_limits_peer_list() {
        let profile = fast_profile();
        let settings = SessionSettings::default();
        let (mut torrent, _) =
            SimTorrent::from_add(TorrentHandle::new(9), &metainfo_request(1024 * 1024, 256 * 1024), &profile);
        torrent.max_connections = 2;
        torrent.step(&profile, &settings);
        assert_eq!(torrent.peers(&profile).len(), 2);
    }
}
