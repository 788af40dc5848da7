#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Engine-agnostic torrent interfaces and DTOs.
//!
//! Layout: `model` (handles, status snapshots, peer/queue/file detail),
//! `alert` (closed alert enum produced by engine adapters), `service`
//! (`TorrentEngine` capability), `metainfo` (`.torrent` and magnet parsing),
//! `error` (`TorrentError`).

pub mod alert;
pub mod error;
pub mod metainfo;
pub mod model;
pub mod service;

pub use alert::Alert;
pub use error::{TorrentError, TorrentResult};
pub use metainfo::{MagnetLink, MetainfoFile, TorrentMetainfo};
pub use model::{
    AddTorrent, AddTorrentFlags, BlockState, FileProgress, PartialPiece, PeerFlags, PeerInfo,
    TorrentHandle, TorrentSource, TorrentState, TorrentStatus,
};
pub use service::TorrentEngine;
