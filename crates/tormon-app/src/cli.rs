//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tormon_config::defaults::{
    DEFAULT_LISTEN_INTERFACE, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT, DEFAULT_SAVE_PATH,
    DEFAULT_TICK_MS,
};
use tormon_config::{LimitsConfig, MonitorConfig, NetworkConfig, UiConfig};
use tormon_telemetry::{DEFAULT_LOG_LEVEL, LogDestination, LogFormat, LoggingConfig};

const DEFAULT_LOG_FILE: &str = "tormon.log";
const STDERR_LOG_TARGET: &str = "-";

/// Interactive terminal monitor for a set of torrent downloads.
#[derive(Debug, Parser)]
#[command(
    name = "tormon",
    version,
    about = "Terminal dashboard for torrent downloads",
    after_help = "Keys: (r) re-announce, (p) pause, (u) resume, (q) save resume data and quit"
)]
pub struct Cli {
    /// Listening port; values outside 1..=65535 fall back to 6881.
    #[arg(short = 'p', long, default_value_t = i64::from(DEFAULT_PORT), allow_hyphen_values = true)]
    pub port: i64,
    /// Interface for incoming connections.
    #[arg(short = 'i', long, default_value = DEFAULT_LISTEN_INTERFACE)]
    pub listen_interface: String,
    /// Interface for outgoing connections.
    #[arg(short = 'o', long, default_value = "")]
    pub outgoing_interface: String,
    /// Maximum download rate in kB/s; 0 means unlimited.
    #[arg(short = 'd', long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub max_download_rate: f64,
    /// Maximum upload rate in kB/s; 0 means unlimited.
    #[arg(short = 'u', long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub max_upload_rate: f64,
    /// Directory for downloaded files and `.fastresume` data.
    #[arg(short = 's', long, env = "TORMON_SAVE_PATH", default_value = DEFAULT_SAVE_PATH)]
    pub save_path: PathBuf,
    /// HTTP proxy as host:port.
    #[arg(short = 'r', long = "proxy-host", default_value = "")]
    pub proxy_host: String,
    /// Peer connection cap per torrent.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: i32,
    /// Keep running after every torrent completes.
    #[arg(long)]
    pub keep_seeding: bool,
    /// Show the most recent engine alerts under the dashboard.
    #[arg(long)]
    pub show_alerts: bool,
    /// List peers that are still connecting or handshaking.
    #[arg(long)]
    pub show_connecting_peers: bool,
    /// Give up waiting for resume data after this many seconds.
    #[arg(long)]
    pub shutdown_timeout_secs: Option<u64>,
    /// Dashboard refresh interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_TICK_MS, hide = true)]
    pub tick_ms: u64,
    /// Log file; `-` writes to stderr.
    #[arg(long, env = "TORMON_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: String,
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, env = "TORMON_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Log record format.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,
    /// Magnet URIs or `.torrent` files.
    #[arg(value_name = "TORRENT")]
    pub torrents: Vec<String>,
}

/// Log format names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// One JSON object per record.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}

impl Cli {
    /// Monitor configuration described by the arguments.
    #[must_use]
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            network: NetworkConfig {
                port: self.port,
                listen_interface: self.listen_interface.clone(),
                outgoing_interface: self.outgoing_interface.clone(),
                proxy: self.proxy_host.clone(),
            },
            limits: LimitsConfig {
                max_download_rate_kbps: self.max_download_rate,
                max_upload_rate_kbps: self.max_upload_rate,
                max_connections: self.max_connections,
            },
            save_path: self.save_path.clone(),
            ui: UiConfig {
                exit_on_completion: !self.keep_seeding,
                show_alerts: self.show_alerts,
                show_connecting_peers: self.show_connecting_peers,
                shutdown_timeout_secs: self.shutdown_timeout_secs,
                tick_ms: self.tick_ms,
            },
            torrents: self.torrents.clone(),
        }
    }

    /// Logging setup described by the arguments.
    #[must_use]
    pub fn logging_config(&self) -> LoggingConfig<'_> {
        let destination = if self.log_file == STDERR_LOG_TARGET {
            LogDestination::Stderr
        } else {
            LogDestination::File(PathBuf::from(&self.log_file))
        };
        LoggingConfig {
            level: &self.log_level,
            format: self.log_format.map_or_else(LogFormat::infer, LogFormat::from),
            destination,
        }
    }
}
