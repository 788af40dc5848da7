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

//! Simulated torrent session implementing the [`TorrentEngine`] contract.
//!
//! Torrents advance by one refresh interval whenever a status update is
//! requested, which keeps the session deterministic and usable from tests.
//!
//! [`TorrentEngine`]: tormon_torrent_core::TorrentEngine

pub mod session;
pub mod types;

pub use session::SimulatedEngine;
pub use types::{ProxyRuntime, SessionSettings, SimulationProfile};
