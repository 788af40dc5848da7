//! Validation helpers and normalization rules for [`MonitorConfig`].

use std::time::Duration;

use tracing::warn;

use crate::defaults::{DEFAULT_PORT, UNLIMITED};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{MonitorConfig, ProxyKind, ProxySettings, ValidatedConfig};

/// Map a requested port onto `1..=65535`, falling back to the default.
#[must_use]
pub fn normalize_port(port: i64) -> u16 {
    match u16::try_from(port) {
        Ok(port) if port > 0 => port,
        _ => {
            warn!(requested = port, fallback = DEFAULT_PORT, "listening port out of range");
            DEFAULT_PORT
        }
    }
}

/// Convert a kB/s cap into bytes per second; zero or negative is unlimited.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-finite or overflowing values.
pub fn rate_limit_from_kbps(kbps: f64, field: &'static str) -> ConfigResult<i64> {
    if !kbps.is_finite() {
        return Err(ConfigError::invalid(
            "limits",
            field,
            Some(kbps.to_string()),
            "must be a finite number",
        ));
    }
    let bytes = kbps * 1000.0;
    if bytes <= 0.0 {
        return Ok(UNLIMITED);
    }
    #[allow(clippy::cast_precision_loss)]
    let ceiling = i64::MAX as f64;
    if bytes >= ceiling {
        return Err(ConfigError::invalid(
            "limits",
            field,
            Some(kbps.to_string()),
            "rate is too large",
        ));
    }
    #[allow(clippy::cast_possible_truncation)]
    let bytes = bytes as i64;
    Ok(bytes.max(1))
}

/// Parse `host:port` into HTTP proxy settings; an empty string means no proxy.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the host or port is missing or malformed.
pub fn parse_proxy(value: &str) -> ConfigResult<Option<ProxySettings>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let invalid = |reason| ConfigError::invalid("network", "proxy", Some(value.to_string()), reason);
    let (host, port) = value.rsplit_once(':').ok_or_else(|| invalid("expected host:port"))?;
    if host.is_empty() {
        return Err(invalid("proxy host is empty"));
    }
    let port = port
        .parse::<u16>()
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| invalid("proxy port must be between 1 and 65535"))?;
    Ok(Some(ProxySettings {
        kind: ProxyKind::Http,
        host: host.to_string(),
        port,
    }))
}

fn require_interface(value: &str, field: &'static str) -> ConfigResult<()> {
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid(
            "network",
            field,
            Some(value.to_string()),
            "must not contain whitespace",
        ));
    }
    Ok(())
}

impl MonitorConfig {
    /// Normalize and validate the document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] describing the first offending field.
    pub fn validate(&self) -> ConfigResult<ValidatedConfig> {
        let network = &self.network;
        if network.listen_interface.trim().is_empty() {
            return Err(ConfigError::invalid(
                "network",
                "listen_interface",
                None,
                "must not be empty",
            ));
        }
        require_interface(&network.listen_interface, "listen_interface")?;
        require_interface(&network.outgoing_interface, "outgoing_interface")?;

        let limits = &self.limits;
        let max_connections = limits.max_connections;
        if max_connections == 0 || max_connections < -1 {
            return Err(ConfigError::invalid(
                "limits",
                "max_connections",
                Some(max_connections.to_string()),
                "must be positive or -1 for unlimited",
            ));
        }

        if self.save_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid(
                "storage",
                "save_path",
                None,
                "must not be empty",
            ));
        }

        let shutdown_timeout = match self.ui.shutdown_timeout_secs {
            Some(0) => {
                return Err(ConfigError::invalid(
                    "ui",
                    "shutdown_timeout_secs",
                    Some("0".to_string()),
                    "must be positive",
                ));
            }
            other => other.map(Duration::from_secs),
        };
        if self.ui.tick_ms == 0 {
            return Err(ConfigError::invalid(
                "ui",
                "tick_ms",
                Some("0".to_string()),
                "must be positive",
            ));
        }

        if self.torrents.is_empty() {
            return Err(ConfigError::invalid(
                "torrents",
                "sources",
                None,
                "at least one torrent source is required",
            ));
        }

        Ok(ValidatedConfig {
            port: normalize_port(network.port),
            listen_interface: network.listen_interface.trim().to_string(),
            outgoing_interface: network.outgoing_interface.clone(),
            download_rate_limit: rate_limit_from_kbps(
                limits.max_download_rate_kbps,
                "max_download_rate_kbps",
            )?,
            upload_rate_limit: rate_limit_from_kbps(
                limits.max_upload_rate_kbps,
                "max_upload_rate_kbps",
            )?,
            proxy: parse_proxy(&network.proxy)?,
            max_connections,
            save_path: self.save_path.clone(),
            exit_on_completion: self.ui.exit_on_completion,
            show_alerts: self.ui.show_alerts,
            show_connecting_peers: self.ui.show_connecting_peers,
            shutdown_timeout,
            tick: Duration::from_millis(self.ui.tick_ms),
            torrents: self.torrents.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_source() -> MonitorConfig {
        MonitorConfig {
            torrents: vec!["demo.torrent".into()],
            ..MonitorConfig::default()
        }
    }

    #[test]
    fn out_of_range_ports_fall_back() {
        assert_eq!(normalize_port(51413), 51413);
        assert_eq!(normalize_port(65535), 65535);
        assert_eq!(normalize_port(0), DEFAULT_PORT);
        assert_eq!(normalize_port(-3), DEFAULT_PORT);
        assert_eq!(normalize_port(70000), DEFAULT_PORT);
    }

    #[test]
    fn rates_convert_to_bytes_with_unlimited_sentinel() {
        assert_eq!(rate_limit_from_kbps(0.0, "d").unwrap(), -1);
        assert_eq!(rate_limit_from_kbps(-5.0, "d").unwrap(), -1);
        assert_eq!(rate_limit_from_kbps(150.0, "d").unwrap(), 150_000);
        assert_eq!(rate_limit_from_kbps(0.5, "d").unwrap(), 500);
        assert!(rate_limit_from_kbps(f64::NAN, "d").is_err());
        assert!(rate_limit_from_kbps(f64::MAX, "d").is_err());
    }

    #[test]
    fn proxy_requires_host_and_port() {
        assert_eq!(parse_proxy("").unwrap(), None);
        let proxy = parse_proxy("proxy.local:3128").unwrap().expect("proxy set");
        assert_eq!(proxy.host, "proxy.local");
        assert_eq!(proxy.port, 3128);
        assert_eq!(proxy.kind, ProxyKind::Http);

        assert!(parse_proxy("proxy.local").is_err());
        assert!(parse_proxy(":3128").is_err());
        assert!(parse_proxy("proxy.local:http").is_err());
        assert!(parse_proxy("proxy.local:0").is_err());
    }

    #[test]
    fn defaults_validate_once_a_source_is_present() {
        assert!(matches!(
            MonitorConfig::default().validate(),
            Err(ConfigError::InvalidField {
                section: "torrents",
                ..
            })
        ));

        let validated = with_source().validate().expect("valid");
        assert_eq!(validated.port, DEFAULT_PORT);
        assert_eq!(validated.download_rate_limit, -1);
        assert_eq!(validated.max_connections, 60);
        assert_eq!(validated.tick, Duration::from_millis(500));
        assert!(validated.exit_on_completion);
        assert!(validated.shutdown_timeout.is_none());
    }

    #[test]
    fn engine_settings_combine_interface_and_port() {
        let mut config = with_source();
        config.network.listen_interface = "127.0.0.1".into();
        config.network.port = 7000;
        config.network.proxy = "10.0.0.1:8080".into();
        config.limits.max_upload_rate_kbps = 20.0;

        let settings = config.validate().expect("valid").engine_settings();
        assert_eq!(settings.listen_interfaces, "127.0.0.1:7000");
        assert_eq!(settings.upload_rate_limit, 20_000);
        assert_eq!(settings.download_rate_limit, -1);
        assert!(settings.user_agent.starts_with("tormon/"));
        assert_eq!(settings.proxy.map(|proxy| proxy.port), Some(8080));
    }

    #[test]
    fn rejects_bad_fields() {
        let mut config = with_source();
        config.limits.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = with_source();
        config.ui.shutdown_timeout_secs = Some(0);
        assert!(config.validate().is_err());

        let mut config = with_source();
        config.network.listen_interface = "  ".into();
        assert!(config.validate().is_err());

        let mut config = with_source();
        config.network.outgoing_interface = "eth0 eth1".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_document_deserializes_with_defaults() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{"network":{"port":9000},"ui":{"show_alerts":true},"torrents":["a.torrent"]}"#,
        )
        .expect("document parses");
        let validated = config.validate().expect("valid");
        assert_eq!(validated.port, 9000);
        assert_eq!(validated.listen_interface, "0.0.0.0");
        assert!(validated.show_alerts);
    }
}
