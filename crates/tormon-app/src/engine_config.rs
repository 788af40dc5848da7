//! Engine settings to session runtime mapping.
//!
//! # Design
//! - Converts the validated, engine-agnostic settings into the session's own types.
//! - Keeps proxy mapping in one place so config and runtime cannot drift.

use tormon_config::{EngineSettings, ProxyKind, ProxySettings};
use tormon_torrent_sim::{ProxyRuntime, SessionSettings};

/// Session settings derived from the validated configuration.
#[must_use]
pub fn session_settings(settings: &EngineSettings) -> SessionSettings {
    SessionSettings {
        user_agent: settings.user_agent.clone(),
        listen_interfaces: settings.listen_interfaces.clone(),
        outgoing_interfaces: settings.outgoing_interfaces.clone(),
        download_rate_limit: settings.download_rate_limit,
        upload_rate_limit: settings.upload_rate_limit,
        proxy: settings.proxy.as_ref().map(map_proxy),
    }
}

fn map_proxy(proxy: &ProxySettings) -> ProxyRuntime {
    match proxy.kind {
        ProxyKind::Http => ProxyRuntime {
            host: proxy.host.clone(),
            port: proxy.port,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tormon_config::MonitorConfig;

    #[test]
    fn settings_carry_limits_and_proxy() {
        let mut config = MonitorConfig::default();
        config.network.port = 7000;
        config.network.proxy = "proxy.lan:3128".into();
        config.limits.max_download_rate_kbps = 50.0;
        config.torrents.push("magnet:?xt=urn:btih:abc".into());
        let validated = config.validate().expect("valid config");

        let session = session_settings(&validated.engine_settings());
        assert_eq!(session.listen_interfaces, "0.0.0.0:7000");
        assert_eq!(session.download_rate_limit, 50_000);
        assert_eq!(session.upload_rate_limit, -1);
        assert_eq!(
            session.proxy,
            Some(ProxyRuntime {
                host: "proxy.lan".into(),
                port: 3128,
            })
        );
        assert!(session.user_agent.starts_with("tormon/"));
    }
}
