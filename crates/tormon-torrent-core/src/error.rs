//! Error types for torrent core services.

use std::error::Error;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::TorrentHandle;

/// Primary error type for torrent operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// The handle no longer refers to a torrent known by the engine.
    #[error("invalid torrent handle")]
    InvalidHandle {
        /// Handle supplied by the caller.
        handle: TorrentHandle,
    },
    /// Metadata has not been received yet, so file and piece detail is unavailable.
    #[error("torrent metadata unavailable")]
    MetadataUnavailable {
        /// Handle whose metadata is missing.
        handle: TorrentHandle,
    },
    /// A torrent with the same info-hash is already loaded.
    #[error("duplicate torrent")]
    Duplicate {
        /// Hex info-hash of the duplicate.
        info_hash: String,
    },
    /// The torrent source could not be interpreted.
    #[error("invalid torrent source")]
    InvalidSource {
        /// Source descriptor as supplied by the caller.
        source_descriptor: String,
        /// Static reason describing the failure.
        reason: &'static str,
    },
    /// Bencoded metainfo could not be decoded.
    #[error("invalid torrent metainfo")]
    Metainfo {
        /// Underlying bencode failure.
        #[source]
        source: serde_bencode::Error,
    },
    /// Reading a torrent file from disk failed.
    #[error("failed to read torrent file")]
    Io {
        /// File involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Operation failed in the underlying engine.
    #[error("torrent operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Torrent handle when available.
        handle: Option<TorrentHandle>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TorrentError {
    /// Build an [`TorrentError::OperationFailed`] from any error source.
    pub fn operation(
        operation: &'static str,
        handle: Option<TorrentHandle>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::OperationFailed {
            operation,
            handle,
            source: source.into(),
        }
    }
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_helper_preserves_context() {
        let err = TorrentError::operation("pause", Some(TorrentHandle::new(7)), "engine stopped");
        match err {
            TorrentError::OperationFailed {
                operation,
                handle,
                source,
            } => {
                assert_eq!(operation, "pause");
                assert_eq!(handle, Some(TorrentHandle::new(7)));
                assert_eq!(source.to_string(), "engine stopped");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn messages_stay_constant() {
        let err = TorrentError::MetadataUnavailable {
            handle: TorrentHandle::new(1),
        };
        assert_eq!(err.to_string(), "torrent metadata unavailable");
        assert!(err.source().is_none());
    }
}
