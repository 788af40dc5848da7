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

//! Terminal monitor for torrent downloads.
//!
//! Layout:
//! - `console.rs`: terminal ownership and bounded key waits
//! - `format.rs`: byte sizes, progress bars, clocks
//! - `registry.rs`: local status view keyed by handle
//! - `alerts.rs`: alert draining, alerts log, pending resume set
//! - `render.rs`: dashboard frame
//! - `monitor.rs`: Running/Draining/Terminated loop
//! - `resume.rs`: `.fastresume` files
//! - `engine_config.rs`: engine settings to session runtime mapping
//! - `cli.rs`, `bootstrap.rs`: argument parsing and startup wiring

pub mod alerts;
pub mod bootstrap;
pub mod cli;
pub mod console;
pub mod engine_config;
pub mod error;
pub mod format;
pub mod monitor;
pub mod registry;
pub mod render;
pub mod resume;

use clap::Parser;

pub use bootstrap::{add_sources, build_monitor, run_app};
pub use cli::Cli;
pub use error::{AppError, AppResult};
pub use monitor::{MonitorLoop, MonitorOptions, Phase, ShutdownReport};

/// Parse arguments, run the monitor, and report fatal errors. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match run_app(cli).await {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            1
        }
    }
}
