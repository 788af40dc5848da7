//! Startup sequence: logging, configuration, engine, sources, terminal, loop.

use std::sync::Arc;

use tormon_config::ValidatedConfig;
use tormon_torrent_core::{AddTorrent, TorrentEngine, TorrentSource};
use tormon_torrent_sim::{SimulatedEngine, SimulationProfile};
use tracing::{debug, info, warn};

use crate::alerts::AlertProcessor;
use crate::cli::Cli;
use crate::console::{Console, TerminalConsole};
use crate::engine_config::session_settings;
use crate::error::{AppError, AppResult};
use crate::monitor::{MonitorLoop, MonitorOptions, ShutdownReport};
use crate::resume::FastResumeStore;

/// Run the monitor described by `cli` until it terminates.
///
/// # Errors
///
/// Returns an error when logging, configuration, a torrent source or the
/// terminal cannot be set up. Nothing after the loop starts is fatal.
pub async fn run_app(cli: Cli) -> AppResult<ShutdownReport> {
    let _log_guard = tormon_telemetry::init_logging(&cli.logging_config())
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let config = cli
        .monitor_config()
        .validate()
        .map_err(|err| AppError::config("config.validate", err))?;
    info!(
        save_path = %config.save_path.display(),
        port = config.port,
        sources = config.torrents.len(),
        "tormon starting"
    );

    let engine: Arc<dyn TorrentEngine> = Arc::new(SimulatedEngine::new(
        session_settings(&config.engine_settings()),
        SimulationProfile::default(),
    ));
    let store = FastResumeStore::new(&config.save_path);
    add_sources(engine.as_ref(), &store, &config).await?;

    let console =
        TerminalConsole::new().map_err(|err| AppError::terminal("terminal.acquire", err))?;
    let mut monitor = build_monitor(engine, console, store, &config);
    Ok(monitor.run().await)
}

/// Hand every configured source to the engine, with saved resume data when present.
///
/// # Errors
///
/// Returns [`AppError::Torrent`] for the first source that cannot be parsed
/// or that the engine refuses.
pub async fn add_sources(
    engine: &dyn TorrentEngine,
    store: &FastResumeStore,
    config: &ValidatedConfig,
) -> AppResult<usize> {
    for descriptor in &config.torrents {
        let source = TorrentSource::from_descriptor(descriptor)
            .map_err(|err| AppError::torrent("source.parse", descriptor.as_str(), err))?;
        let name = source.display_name();
        let mut request = AddTorrent::new(source, &config.save_path);
        match store.load(&name) {
            Ok(Some(bytes)) => {
                info!(torrent = %name, bytes = bytes.len(), "resume data found");
                request.resume_data = Some(bytes);
            }
            Ok(None) => debug!(torrent = %name, "no resume data"),
            Err(err) => {
                warn!(torrent = %name, error = %err, "failed to open resume file; starting fresh");
            }
        }
        engine
            .add_torrent(request)
            .await
            .map_err(|err| AppError::torrent("engine.add_torrent", descriptor.as_str(), err))?;
    }
    Ok(config.torrents.len())
}

/// Monitor loop over `engine` and `console` configured from `config`.
#[must_use]
pub fn build_monitor<C: Console>(
    engine: Arc<dyn TorrentEngine>,
    console: C,
    store: FastResumeStore,
    config: &ValidatedConfig,
) -> MonitorLoop<C> {
    let processor = AlertProcessor::new(store, config.max_connections);
    MonitorLoop::new(
        engine,
        console,
        processor,
        MonitorOptions::from_config(config),
    )
}
