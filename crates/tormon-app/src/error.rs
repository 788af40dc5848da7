//! # Design
//!
//! - Centralize application-level errors for bootstrap and the monitor loop.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Fatal errors that stop the monitor before its loop starts.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration was rejected.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: tormon_config::ConfigError,
    },
    /// Telemetry could not be installed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: tormon_telemetry::TelemetryError,
    },
    /// A torrent source was unusable or the engine refused it.
    #[error("torrent operation failed")]
    Torrent {
        /// Operation identifier.
        operation: &'static str,
        /// Source descriptor given on the command line.
        descriptor: String,
        /// Source torrent error.
        source: tormon_torrent_core::TorrentError,
    },
    /// Terminal setup failed.
    #[error("terminal operation failed")]
    Terminal {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: tormon_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: tormon_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) fn torrent(
        operation: &'static str,
        descriptor: impl Into<String>,
        source: tormon_torrent_core::TorrentError,
    ) -> Self {
        Self::Torrent {
            operation,
            descriptor: descriptor.into(),
            source,
        }
    }

    pub(crate) const fn terminal(operation: &'static str, source: io::Error) -> Self {
        Self::Terminal { operation, source }
    }

    /// One-line explanation for stderr, including the innermost cause.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Config { source, .. } => format!("{self}: {}", source.detail()),
            Self::Torrent {
                descriptor, source, ..
            } => format!("{self}: {descriptor}: {}", torrent_detail(source)),
            Self::Telemetry { source, .. } => format!("{self}: {source}"),
            Self::Terminal { source, .. } => format!("{self}: {source}"),
        }
    }
}

fn torrent_detail(error: &tormon_torrent_core::TorrentError) -> String {
    use tormon_torrent_core::TorrentError;
    match error {
        TorrentError::InvalidSource { reason, .. } => format!("{error} ({reason})"),
        TorrentError::Duplicate { info_hash } => format!("{error} ({info_hash})"),
        TorrentError::Io { path, source } => format!("{error}: {}: {source}", path.display()),
        TorrentError::Metainfo { source } => format!("{error}: {source}"),
        TorrentError::OperationFailed { source, .. } => format!("{error}: {source}"),
        TorrentError::InvalidHandle { .. } | TorrentError::MetadataUnavailable { .. } => {
            error.to_string()
        }
    }
}

/// Failures reading or writing fast-resume files.
#[derive(Debug, Error)]
pub enum ResumeError {
    /// Resume directory could not be created.
    #[error("failed to create resume directory")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Resume file could not be read.
    #[error("failed to read resume file")]
    Read {
        /// File path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Resume file could not be written.
    #[error("failed to write resume file")]
    Write {
        /// File path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}
