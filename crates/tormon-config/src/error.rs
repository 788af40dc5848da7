//! Error types for configuration validation.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }

    /// Human-readable detail suitable for a startup error message.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidField {
                section,
                field,
                value: Some(value),
                reason,
            } => format!("{section}.{field} = {value:?}: {reason}"),
            Self::InvalidField {
                section,
                field,
                value: None,
                reason,
            } => format!("{section}.{field}: {reason}"),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_includes_value_when_present() {
        let err = ConfigError::invalid(
            "network",
            "proxy",
            Some("nope".to_string()),
            "expected host:port",
        );
        assert_eq!(err.to_string(), "invalid configuration field");
        assert_eq!(err.detail(), "network.proxy = \"nope\": expected host:port");

        let bare = ConfigError::invalid("torrents", "sources", None, "required");
        assert_eq!(bare.detail(), "torrents.sources: required");
    }
}
