//! Strongly typed inputs accepted by the simulated session.

use std::time::Duration;

/// HTTP proxy the session would route tracker and peer traffic through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRuntime {
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

/// Runtime parameters applied to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// User agent announced to trackers.
    pub user_agent: String,
    /// `interface:port` pairs the session listens on.
    pub listen_interfaces: String,
    /// Interfaces used for outgoing connections; empty means any.
    pub outgoing_interfaces: String,
    /// Global download cap in bytes per second; `-1` is unlimited.
    pub download_rate_limit: i64,
    /// Global upload cap in bytes per second; `-1` is unlimited.
    pub upload_rate_limit: i64,
    /// Optional HTTP proxy.
    pub proxy: Option<ProxyRuntime>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("tormon/", env!("CARGO_PKG_VERSION")).to_string(),
            listen_interfaces: "0.0.0.0:6881".to_string(),
            outgoing_interfaces: String::new(),
            download_rate_limit: -1,
            upload_rate_limit: -1,
            proxy: None,
        }
    }
}

/// Knobs controlling how the simulated swarm behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationProfile {
    /// Swarm download capacity per torrent in bytes per second.
    pub download_bps: u64,
    /// Swarm upload demand per torrent in bytes per second.
    pub upload_bps: u64,
    /// Peers connected to an active torrent.
    pub peers: u32,
    /// Status refreshes a magnet link needs before metadata arrives.
    pub metadata_delay: u32,
    /// Simulated time covered by one status refresh.
    pub refresh_interval: Duration,
    /// Payload size assumed for magnet links without `xl`.
    pub magnet_length: u64,
    /// Piece size used for synthesized magnet metadata.
    pub magnet_piece_length: u64,
    /// Tracker re-announce interval.
    pub announce_interval: Duration,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            download_bps: 2 * 1024 * 1024,
            upload_bps: 256 * 1024,
            peers: 6,
            metadata_delay: 4,
            refresh_interval: Duration::from_millis(500),
            magnet_length: 64 * 1024 * 1024,
            magnet_piece_length: 256 * 1024,
            announce_interval: Duration::from_secs(1800),
        }
    }
}

/// Apply a `-1`-means-unlimited session cap to a swarm rate.
#[must_use]
pub fn effective_rate(swarm_bps: u64, limit: i64) -> u64 {
    match u64::try_from(limit) {
        Ok(cap) if cap > 0 => swarm_bps.min(cap),
        _ => swarm_bps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_or_zero_limits_mean_unlimited() {
        assert_eq!(effective_rate(1000, -1), 1000);
        assert_eq!(effective_rate(1000, 0), 1000);
        assert_eq!(effective_rate(1000, 250), 250);
        assert_eq!(effective_rate(100, 250), 100);
    }
}
