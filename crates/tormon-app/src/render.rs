//! Dashboard text for one tick.

use std::fmt::Write as _;
use std::time::Duration;

use tormon_torrent_core::{BlockState, PeerInfo, TorrentEngine, TorrentStatus};
use tracing::debug;

use crate::alerts::AlertsLog;
use crate::format::{format_hms, humanize_bytes, progress_bar};
use crate::registry::TorrentRegistry;

/// Width of the horizontal rules around the command hint.
pub const RULE_WIDTH: usize = 76;
/// Command hint printed between the footer rules.
pub const COMMAND_HINT: &str = "(r) reannounce  (p) pause  (u) resume  (q) quit";

const NAME_WIDTH: usize = 40;
const STATE_BAR_WIDTH: usize = 49;
const PEER_BAR_WIDTH: usize = 15;
const FILE_BAR_WIDTH: usize = 20;
const CLIENT_WIDTH: usize = 10;

/// Optional dashboard sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// List peers still connecting or handshaking.
    pub show_connecting_peers: bool,
    /// Print the alerts log under the elapsed time.
    pub show_alerts: bool,
}

/// Per-tick values printed below the torrent blocks.
#[derive(Debug, Clone, Copy)]
pub struct Footer<'a> {
    /// Time since the monitor started.
    pub elapsed: Duration,
    /// Last error raised while handling a command.
    pub diagnostic: Option<&'a str>,
    /// Recent alert messages.
    pub alerts: &'a AlertsLog,
}

/// Build the full frame: every registry entry in order, then the footer.
///
/// Peer, file and queue queries that fail leave their section out.
pub async fn render_dashboard(
    engine: &dyn TorrentEngine,
    registry: &TorrentRegistry,
    options: RenderOptions,
    footer: &Footer<'_>,
) -> String {
    let mut out = String::new();
    for status in registry.snapshot() {
        render_torrent(engine, status, options, &mut out).await;
    }
    render_footer(options, footer, &mut out);
    out
}

async fn render_torrent(
    engine: &dyn TorrentEngine,
    status: &TorrentStatus,
    options: RenderOptions,
    out: &mut String,
) {
    let name: String = status.name.chars().take(NAME_WIDTH).collect();
    let _ = writeln!(out, "\ntorrent name: {name:<NAME_WIDTH$}\n");

    let seeding = status.is_seeding();
    if !seeding {
        let paused = if status.paused { " (paused)" } else { "" };
        let _ = writeln!(
            out,
            "{}{paused} |{}|  {:5.4}%",
            status.state.label(),
            bar(status.progress, STATE_BAR_WIDTH),
            status.progress * 100.0
        );
        let _ = writeln!(
            out,
            "total downloaded: {}",
            humanize_bytes(saturating_i64(status.total_done)).trim_start()
        );
        let _ = writeln!(
            out,
            "\npeers: {} \tseeds: {}\t\tpieces: {} / {}\n",
            status.num_peers, status.num_seeds, status.num_pieces, status.total_pieces
        );
    }

    let _ = writeln!(
        out,
        "download: {}/s ({}) \t\tupload: {}/s ({}) ",
        humanize_bytes(status.download_rate),
        humanize_bytes(saturating_i64(status.total_download)),
        humanize_bytes(status.upload_rate),
        humanize_bytes(saturating_i64(status.total_upload)),
    );

    if !seeding {
        let _ = writeln!(out, "\ninfo-hash: {}", status.info_hash);
        let _ = writeln!(out, "next announce: {}", format_hms(status.next_announce));
        let _ = writeln!(out, "\ntracker: {}", status.current_tracker);
    }

    match engine.peer_info(status.handle).await {
        Ok(peers) => render_peers(&peers, options, out),
        Err(err) => debug!(handle = %status.handle, error = %err, "peer list unavailable"),
    }

    if !seeding && status.has_metadata {
        match engine.file_progress(status.handle).await {
            Ok(files) => {
                out.push('\n');
                for file in files {
                    let _ = writeln!(out, "{} {}", bar(file.fraction(), FILE_BAR_WIDTH), file.path);
                }
            }
            Err(err) => debug!(handle = %status.handle, error = %err, "file progress unavailable"),
        }
    }

    out.push('\n');
    match engine.download_queue(status.handle).await {
        Ok(queue) => {
            for piece in queue {
                let _ = write!(out, "{:4}: [", piece.piece_index);
                out.extend(piece.blocks.iter().map(|block| block_char(*block)));
                out.push_str("]\n");
            }
        }
        Err(err) => debug!(handle = %status.handle, error = %err, "download queue unavailable"),
    }
}

fn render_peers(peers: &[PeerInfo], options: RenderOptions, out: &mut String) {
    let _ = writeln!(
        out,
        "{:<10}{:<10}{:<19}{}",
        "download", "upload", "progress", "client"
    );
    for peer in peers {
        if peer.is_pending() && !options.show_connecting_peers {
            continue;
        }
        let fraction = match peer.downloading_piece_index {
            Some(_) if !peer.is_pending() && peer.downloading_total > 0 => {
                ratio(peer.downloading_progress, peer.downloading_total)
            }
            _ => 0.0,
        };
        let client = if peer.flags.handshake {
            "waiting for handshake".to_string()
        } else if peer.flags.connecting {
            "connecting to peer".to_string()
        } else {
            peer.client.chars().take(CLIENT_WIDTH).collect()
        };
        let _ = writeln!(
            out,
            "{:<10}{:<10}{:<19}{client}",
            format!("{}/s", humanize_bytes(peer.down_speed).trim_start()),
            format!("{}/s", humanize_bytes(peer.up_speed).trim_start()),
            format!("|{}|", bar(fraction, PEER_BAR_WIDTH)),
        );
    }
}

fn render_footer(options: RenderOptions, footer: &Footer<'_>, out: &mut String) {
    let _ = writeln!(out, "elapsed time: {}", format_hms(footer.elapsed));
    if let Some(diagnostic) = footer.diagnostic {
        let _ = writeln!(out, "error: {diagnostic}");
    }
    if options.show_alerts && !footer.alerts.is_empty() {
        out.push_str("alerts:\n");
        for message in footer.alerts.iter() {
            let _ = writeln!(out, "  {message}");
        }
    }
    let rule = "-".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}\n{COMMAND_HINT}\n{rule}");
}

/// Bar for a value the engine reports; out-of-range input is clamped.
fn bar(fraction: f64, width: usize) -> String {
    let clamped = if fraction.is_nan() { 0.0 } else { fraction.min(1.0) };
    progress_bar(clamped, width).unwrap_or_else(|_| "-".repeat(width))
}

const fn block_char(state: BlockState) -> char {
    match state {
        BlockState::Finished => '#',
        BlockState::Writing => '=',
        BlockState::Requested => '-',
        BlockState::None => ' ',
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(done: u64, total: u64) -> f64 {
    (done as f64 / total as f64).min(1.0)
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tormon_torrent_core::{PeerFlags, TorrentHandle, TorrentState};
    use tormon_torrent_sim::SimulatedEngine;

    fn peer(flags: PeerFlags, client: &str) -> PeerInfo {
        PeerInfo {
            flags,
            down_speed: 2_048,
            up_speed: 512,
            downloading_piece_index: Some(3),
            downloading_progress: 8,
            downloading_total: 16,
            client: client.to_string(),
        }
    }

    fn footer(log: &AlertsLog) -> Footer<'_> {
        Footer {
            elapsed: Duration::from_secs(3_725),
            diagnostic: None,
            alerts: log,
        }
    }

    #[test]
    fn peer_table_hides_pending_peers_by_default() {
        let peers = [
            peer(PeerFlags::default(), "qBittorrent 4.6"),
            peer(
                PeerFlags {
                    connecting: true,
                    ..PeerFlags::default()
                },
                "ghost",
            ),
        ];
        let mut hidden = String::new();
        render_peers(&peers, RenderOptions::default(), &mut hidden);
        assert!(hidden.contains("qBittorren"));
        assert!(!hidden.contains("qBittorrent"));
        assert!(!hidden.contains("connecting to peer"));
        assert!(hidden.contains(&format!("|{}|", "#".repeat(8) + &"-".repeat(7))));

        let mut shown = String::new();
        let options = RenderOptions {
            show_connecting_peers: true,
            ..RenderOptions::default()
        };
        render_peers(&peers, options, &mut shown);
        assert!(shown.contains("connecting to peer"));
        assert!(shown.contains(&format!("|{}|", "-".repeat(PEER_BAR_WIDTH))));
    }

    #[test]
    fn footer_shows_clock_diagnostic_and_rules() {
        let mut log = AlertsLog::default();
        log.push("tracker reply".to_string());
        let mut out = String::new();
        let options = RenderOptions {
            show_alerts: true,
            ..RenderOptions::default()
        };
        let footer = Footer {
            diagnostic: Some("pause failed"),
            ..footer(&log)
        };
        render_footer(options, &footer, &mut out);
        assert!(out.starts_with("elapsed time: 01:02:05\n"));
        assert!(out.contains("error: pause failed"));
        assert!(out.contains("  tracker reply"));
        assert_eq!(out.matches(&"-".repeat(RULE_WIDTH)).count(), 2);
        assert!(out.contains(COMMAND_HINT));
    }

    #[test]
    fn out_of_range_fractions_are_clamped() {
        assert_eq!(bar(1.5, 4), "####");
        assert_eq!(bar(f64::NAN, 4), "----");
        assert_eq!(bar(-0.2, 4), "----");
    }

    #[tokio::test]
    async fn seeding_torrent_keeps_only_rate_lines() {
        let engine = SimulatedEngine::default();
        let mut registry = TorrentRegistry::new();
        let mut status = TorrentStatus::new(TorrentHandle::new(9), "debian.iso");
        status.state = TorrentState::Seeding;
        status.has_metadata = true;
        status.upload_rate = 1_500;
        registry.upsert(status);

        let log = AlertsLog::default();
        let frame =
            render_dashboard(&engine, &registry, RenderOptions::default(), &footer(&log)).await;
        assert!(frame.contains("torrent name: debian.iso"));
        assert!(frame.contains("upload:  1.5kB/s"));
        assert!(!frame.contains("peers:"));
        assert!(!frame.contains("info-hash"));
        assert!(!frame.contains("total downloaded"));
    }

    #[tokio::test]
    async fn downloading_torrent_shows_progress_block() {
        let engine = SimulatedEngine::default();
        let mut registry = TorrentRegistry::new();
        let mut status = TorrentStatus::new(TorrentHandle::new(1), "x".repeat(60));
        status.state = TorrentState::Downloading;
        status.paused = true;
        status.progress = 0.5;
        status.num_pieces = 2;
        status.total_pieces = 4;
        registry.upsert(status);

        let log = AlertsLog::default();
        let frame =
            render_dashboard(&engine, &registry, RenderOptions::default(), &footer(&log)).await;
        assert!(frame.contains(&format!("torrent name: {}\n", "x".repeat(NAME_WIDTH))));
        assert!(frame.contains("downloading (paused) |"));
        assert!(frame.contains("50.0000%"));
        assert!(frame.contains("pieces: 2 / 4"));
        assert!(frame.contains("next announce: 00:00:00"));
    }
}
