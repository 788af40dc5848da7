//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// The log file path does not name a file.
    LogPath {
        /// Offending path.
        path: PathBuf,
    },
    /// Creating the log directory failed.
    LogDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Opening the log file failed.
    Appender {
        /// Log file path.
        path: PathBuf,
        /// Underlying appender error.
        source: tracing_appender::rolling::InitError,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::LogPath { .. } => formatter.write_str("log path does not name a file"),
            Self::LogDirectory { .. } => formatter.write_str("failed to create log directory"),
            Self::Appender { .. } => formatter.write_str("failed to open log file"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::LogPath { .. } => None,
            Self::LogDirectory { source, .. } => Some(source),
            Self::Appender { source, .. } => Some(source),
        }
    }
}
