//! Typed configuration models.
//!
//! # Design
//! - `MonitorConfig` is the raw, user-facing document (CLI or file).
//! - `ValidatedConfig` is what the rest of the workspace consumes; it only
//!   exists after [`MonitorConfig::validate`] succeeded.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_LISTEN_INTERFACE, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT, DEFAULT_SAVE_PATH,
    DEFAULT_TICK_MS,
};

/// Network options as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Listening port; values outside `1..=65535` fall back to the default.
    pub port: i64,
    /// Interface for incoming connections.
    pub listen_interface: String,
    /// Interface for outgoing connections; empty means any.
    pub outgoing_interface: String,
    /// HTTP proxy as `host:port`; empty disables it.
    pub proxy: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: i64::from(DEFAULT_PORT),
            listen_interface: DEFAULT_LISTEN_INTERFACE.to_string(),
            outgoing_interface: String::new(),
            proxy: String::new(),
        }
    }
}

/// Transfer limits as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Download cap in kB/s; zero or negative means unlimited.
    pub max_download_rate_kbps: f64,
    /// Upload cap in kB/s; zero or negative means unlimited.
    pub max_upload_rate_kbps: f64,
    /// Peer connection cap applied to each torrent.
    pub max_connections: i32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_download_rate_kbps: 0.0,
            max_upload_rate_kbps: 0.0,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Dashboard and lifecycle options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Stop once every torrent is complete.
    pub exit_on_completion: bool,
    /// Render the tail of the alerts log under the dashboard.
    pub show_alerts: bool,
    /// Render peers that are still connecting or handshaking.
    pub show_connecting_peers: bool,
    /// Give up waiting for resume data after this many seconds.
    pub shutdown_timeout_secs: Option<u64>,
    /// Refresh interval in milliseconds.
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            exit_on_completion: true,
            show_alerts: false,
            show_connecting_peers: false,
            shutdown_timeout_secs: None,
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

/// Raw monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Network options.
    pub network: NetworkConfig,
    /// Transfer limits.
    pub limits: LimitsConfig,
    /// Directory receiving payload and `.fastresume` files.
    pub save_path: PathBuf,
    /// Dashboard options.
    pub ui: UiConfig,
    /// Magnet URIs or `.torrent` paths to add at startup.
    pub torrents: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            limits: LimitsConfig::default(),
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            ui: UiConfig::default(),
            torrents: Vec::new(),
        }
    }
}

/// Proxy protocol understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    /// Plain HTTP proxy.
    Http,
}

/// Parsed proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Proxy protocol.
    pub kind: ProxyKind,
    /// Hostname or address.
    pub host: String,
    /// Port.
    pub port: u16,
}

/// Settings handed to the engine when the session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// User agent announced to trackers.
    pub user_agent: String,
    /// `interface:port` the session listens on.
    pub listen_interfaces: String,
    /// Interfaces for outgoing connections; empty means any.
    pub outgoing_interfaces: String,
    /// Download cap in bytes per second, `-1` for unlimited.
    pub download_rate_limit: i64,
    /// Upload cap in bytes per second, `-1` for unlimited.
    pub upload_rate_limit: i64,
    /// Optional proxy.
    pub proxy: Option<ProxySettings>,
}

/// Configuration after normalization and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    /// Listening port.
    pub port: u16,
    /// Interface for incoming connections.
    pub listen_interface: String,
    /// Interface for outgoing connections; empty means any.
    pub outgoing_interface: String,
    /// Download cap in bytes per second, `-1` for unlimited.
    pub download_rate_limit: i64,
    /// Upload cap in bytes per second, `-1` for unlimited.
    pub upload_rate_limit: i64,
    /// Optional proxy.
    pub proxy: Option<ProxySettings>,
    /// Peer connection cap per torrent.
    pub max_connections: i32,
    /// Directory receiving payload and resume files.
    pub save_path: PathBuf,
    /// Stop once every torrent is complete.
    pub exit_on_completion: bool,
    /// Render the alerts log tail.
    pub show_alerts: bool,
    /// Render connecting and handshaking peers.
    pub show_connecting_peers: bool,
    /// Upper bound on the shutdown drain.
    pub shutdown_timeout: Option<Duration>,
    /// Refresh interval.
    pub tick: Duration,
    /// Torrent sources, in command-line order.
    pub torrents: Vec<String>,
}

impl ValidatedConfig {
    /// Derive the engine session settings.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            user_agent: concat!("tormon/", env!("CARGO_PKG_VERSION")).to_string(),
            listen_interfaces: format!("{}:{}", self.listen_interface, self.port),
            outgoing_interfaces: self.outgoing_interface.clone(),
            download_rate_limit: self.download_rate_limit,
            upload_rate_limit: self.upload_rate_limit,
            proxy: self.proxy.clone(),
        }
    }
}
