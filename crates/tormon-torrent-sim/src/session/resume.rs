use serde::{Deserialize, Serialize};

/// Opaque-to-callers fast-resume payload produced by the simulated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct ResumePayload {
    pub(super) info_hash: String,
    pub(super) name: String,
    pub(super) done_bytes: u64,
    pub(super) total_upload: u64,
    #[serde(default)]
    pub(super) paused: bool,
    #[serde(default = "sparse_by_default")]
    pub(super) sparse: bool,
}

const fn sparse_by_default() -> bool {
    true
}

impl ResumePayload {
    pub(super) fn encode(&self) -> Vec<u8> {
        // A struct of plain strings and integers always serializes.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a payload and check it belongs to `info_hash`.
    pub(super) fn decode(bytes: &[u8], info_hash: &str) -> Result<Self, String> {
        let payload: Self =
            serde_json::from_slice(bytes).map_err(|err| format!("resume data unreadable: {err}"))?;
        if payload.info_hash != info_hash {
            return Err(format!(
                "resume data belongs to {} not {info_hash}",
                payload.info_hash
            ));
        }
        Ok(payload)
    }
}
