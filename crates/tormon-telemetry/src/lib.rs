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

//! Logging setup for the monitor.
//!
//! The dashboard owns stdout, so log records are written to a file (or to
//! stderr when explicitly requested) through a non-blocking writer.

pub mod error;
pub mod init;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogDestination, LogFormat, LoggingConfig, init_logging};
pub use tracing_appender::non_blocking::WorkerGuard;
