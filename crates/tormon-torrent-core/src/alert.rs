//! Alerts an engine adapter hands to the monitor.
//!
//! Engines report asynchronously: commands return immediately and their
//! outcome shows up later as one of these variants in [`crate::TorrentEngine::pop_alerts`].

use crate::model::{TorrentHandle, TorrentStatus};

/// Closed set of engine notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A torrent was admitted.
    TorrentAdded {
        /// Handle assigned by the engine.
        handle: TorrentHandle,
        /// Status at admission time.
        status: Box<TorrentStatus>,
    },
    /// Full status refresh for every torrent that changed since the last request.
    StateUpdate {
        /// Snapshots in engine order.
        statuses: Vec<TorrentStatus>,
    },
    /// Resume data was serialized.
    ResumeDataSaved {
        /// Torrent the payload belongs to.
        handle: TorrentHandle,
        /// Opaque payload to persist verbatim.
        payload: Vec<u8>,
    },
    /// Resume data could not be produced.
    ResumeDataSaveFailed {
        /// Torrent whose save failed.
        handle: TorrentHandle,
        /// Engine failure description.
        message: String,
    },
    /// Anything the monitor does not act upon.
    Other {
        /// Engine-provided message.
        message: String,
    },
}

impl Alert {
    /// Convenience constructor for [`Alert::Other`].
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// One-line description for the alerts log.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::TorrentAdded { status, .. } => format!("{} added", status.name),
            Self::StateUpdate { statuses } => format!("state update: {} torrent(s)", statuses.len()),
            Self::ResumeDataSaved { handle, payload } => {
                format!("torrent {handle}: resume data generated ({} bytes)", payload.len())
            }
            Self::ResumeDataSaveFailed { handle, message } => {
                format!("torrent {handle}: failed to save resume data: {message}")
            }
            Self::Other { message } => message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_describe_each_variant() {
        let handle = TorrentHandle::new(3);
        let added = Alert::TorrentAdded {
            handle,
            status: Box::new(TorrentStatus::new(handle, "ubuntu.iso")),
        };
        assert_eq!(added.message(), "ubuntu.iso added");

        let failed = Alert::ResumeDataSaveFailed {
            handle,
            message: "no metadata".into(),
        };
        assert!(failed.message().contains("#3"));
        assert!(failed.message().contains("no metadata"));

        assert_eq!(Alert::other("tracker reply").message(), "tracker reply");
    }
}
