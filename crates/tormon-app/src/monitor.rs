//! # Design
//!
//! - One task drives tick, drain, render, input wait and dispatch in that order.
//! - Phases only move forward: Running, then Draining, then Terminated.
//! - Per-tick failures are logged and kept as the frame's diagnostic line; none escape `run`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tormon_config::ValidatedConfig;
use tormon_torrent_core::{TorrentEngine, TorrentHandle};
use tracing::{debug, info, warn};

use crate::alerts::{AlertProcessor, DrainReport};
use crate::console::{Console, QUIT_KEY};
use crate::registry::TorrentRegistry;
use crate::render::{Footer, RenderOptions, render_dashboard};

/// Interval between drain steps while resume data is outstanding.
pub const DRAIN_INTERVAL: Duration = Duration::from_millis(500);
/// Line written when every torrent finished downloading.
pub const COMPLETION_MESSAGE: &str = "Files downloaded successfully.";

/// Lifecycle of the monitor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Refreshing the dashboard and accepting commands.
    Running,
    /// Waiting for resume data confirmations.
    Draining,
    /// Finished; `run` returns.
    Terminated,
}

/// Interactive single-key commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `r`: re-announce every torrent.
    Reannounce,
    /// `p`: pause every torrent.
    Pause,
    /// `u`: resume every torrent.
    Resume,
    /// `q`: begin the orderly shutdown.
    Quit,
}

impl Command {
    /// Command bound to `key`, if any.
    #[must_use]
    pub const fn from_key(key: char) -> Option<Self> {
        match key {
            'r' => Some(Self::Reannounce),
            'p' => Some(Self::Pause),
            'u' => Some(Self::Resume),
            QUIT_KEY => Some(Self::Quit),
            _ => None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Reannounce => "re-announce",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Quit => "quit",
        }
    }
}

/// Loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Longest wait for a keypress per tick.
    pub tick: Duration,
    /// Wait between drain steps.
    pub drain_interval: Duration,
    /// Stop once every torrent is complete.
    pub exit_on_completion: bool,
    /// Give up on outstanding resume data after this long.
    pub shutdown_timeout: Option<Duration>,
    /// Optional dashboard sections.
    pub render: RenderOptions,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(500),
            drain_interval: DRAIN_INTERVAL,
            exit_on_completion: true,
            shutdown_timeout: None,
            render: RenderOptions::default(),
        }
    }
}

impl MonitorOptions {
    /// Options taken from a validated configuration.
    #[must_use]
    pub const fn from_config(config: &ValidatedConfig) -> Self {
        Self {
            tick: config.tick,
            drain_interval: DRAIN_INTERVAL,
            exit_on_completion: config.exit_on_completion,
            shutdown_timeout: config.shutdown_timeout,
            render: RenderOptions {
                show_connecting_peers: config.show_connecting_peers,
                show_alerts: config.show_alerts,
            },
        }
    }
}

/// Summary returned once the loop terminates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Running ticks executed.
    pub ticks: u64,
    /// Drain steps executed.
    pub drain_iterations: u64,
    /// Resume files written.
    pub saved: usize,
    /// Resume requests that failed.
    pub failed: usize,
    /// Handles given up on when the drain deadline passed or a second quit arrived.
    pub abandoned: usize,
    /// Whether completion, not a quit command, ended the run.
    pub completed: bool,
}

/// Alert-driven dashboard loop over an engine and a console.
pub struct MonitorLoop<C> {
    engine: Arc<dyn TorrentEngine>,
    console: C,
    registry: TorrentRegistry,
    processor: AlertProcessor,
    options: MonitorOptions,
    phase: Phase,
    started: Instant,
    drain_started: Option<Instant>,
    diagnostic: Option<String>,
    report: ShutdownReport,
}

impl<C: Console> MonitorLoop<C> {
    /// Loop in the `Running` phase with an empty registry.
    #[must_use]
    pub fn new(
        engine: Arc<dyn TorrentEngine>,
        console: C,
        processor: AlertProcessor,
        options: MonitorOptions,
    ) -> Self {
        Self {
            engine,
            console,
            registry: TorrentRegistry::new(),
            processor,
            options,
            phase: Phase::Running,
            started: Instant::now(),
            drain_started: None,
            diagnostic: None,
            report: ShutdownReport::default(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Local view of the tracked torrents.
    #[must_use]
    pub const fn registry(&self) -> &TorrentRegistry {
        &self.registry
    }

    /// Alert processor, including the alerts log and pending set.
    #[must_use]
    pub const fn processor(&self) -> &AlertProcessor {
        &self.processor
    }

    /// Console the frames are written to.
    #[must_use]
    pub const fn console(&self) -> &C {
        &self.console
    }

    /// Diagnostic line shown in the next frame.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn report(&self) -> ShutdownReport {
        self.report
    }

    /// Drive the loop until it terminates.
    pub async fn run(&mut self) -> ShutdownReport {
        info!(tick = ?self.options.tick, "monitor started");
        loop {
            match self.phase {
                Phase::Running => self.tick().await,
                Phase::Draining => self.drain_step().await,
                Phase::Terminated => break,
            }
        }
        info!(
            ticks = self.report.ticks,
            drain_iterations = self.report.drain_iterations,
            saved = self.report.saved,
            failed = self.report.failed,
            abandoned = self.report.abandoned,
            completed = self.report.completed,
            "monitor stopped"
        );
        self.report
    }

    /// One `Running` tick: drain, completion check, render, wait, refresh, dispatch.
    pub async fn tick(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.console.clear();
        self.drain_alerts().await;

        if self.options.exit_on_completion && self.all_complete() && !self.registry.is_empty() {
            info!(torrents = self.registry.len(), "every torrent complete");
            self.console.write(COMPLETION_MESSAGE);
            self.console.write("\n");
            self.report.completed = true;
            self.phase = Phase::Terminated;
            return;
        }

        let footer = Footer {
            elapsed: self.started.elapsed(),
            diagnostic: self.diagnostic.as_deref(),
            alerts: self.processor.log(),
        };
        let frame = render_dashboard(
            self.engine.as_ref(),
            &self.registry,
            self.options.render,
            &footer,
        )
        .await;
        self.console.write(&frame);
        self.diagnostic = None;

        let key = self.console.sleep_and_read_key(self.options.tick).await;
        self.engine.post_torrent_updates().await;
        self.report.ticks += 1;

        match key.and_then(Command::from_key) {
            Some(command) => self.dispatch(command).await,
            None => {
                if let Some(key) = key {
                    debug!(%key, "unbound key ignored");
                }
            }
        }
    }

    /// Apply `command` to every tracked torrent.
    pub async fn dispatch(&mut self, command: Command) {
        debug!(command = command.label(), "command received");
        if command == Command::Quit {
            self.begin_shutdown().await;
            return;
        }
        for handle in self.registry.handles() {
            let result = match command {
                Command::Reannounce => self.engine.force_reannounce(handle).await,
                Command::Pause => self.engine.pause(handle).await,
                Command::Resume => self.engine.resume(handle).await,
                Command::Quit => Ok(()),
            };
            if let Err(err) = result {
                warn!(%handle, command = command.label(), error = %err, "command failed");
                self.diagnostic = Some(format!(
                    "{} failed for torrent {handle}: {err}",
                    command.label()
                ));
            }
        }
    }

    /// Pause the session and request resume data for every torrent that has some.
    pub async fn begin_shutdown(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.engine.pause_session().await;
        if self.all_complete() {
            info!(torrents = self.registry.len(), "nothing to persist");
            self.phase = Phase::Terminated;
            return;
        }

        for handle in self.registry.handles() {
            let has_metadata = self
                .registry
                .get(handle)
                .is_some_and(|status| status.has_metadata);
            if !has_metadata || !self.engine.is_valid(handle).await {
                debug!(%handle, has_metadata, "released without resume data");
                self.registry.remove(handle);
                continue;
            }
            match self.engine.save_resume_data(handle).await {
                Ok(()) => self.processor.mark_pending(handle),
                Err(err) => {
                    warn!(%handle, error = %err, "resume data request failed");
                    self.registry.remove(handle);
                    self.report.failed += 1;
                }
            }
        }

        let pending = self.processor.pending().len();
        if pending == 0 {
            self.phase = Phase::Terminated;
        } else {
            info!(pending, "waiting for resume data");
            self.drain_started = Some(Instant::now());
            self.phase = Phase::Draining;
        }
    }

    /// One `Draining` step: drain alerts, report progress, check the deadline.
    pub async fn drain_step(&mut self) {
        if self.phase != Phase::Draining {
            return;
        }
        self.report.drain_iterations += 1;
        self.drain_alerts().await;

        let pending = self.processor.pending().len();
        if pending == 0 {
            info!("all resume data handled");
            self.phase = Phase::Terminated;
            return;
        }
        self.console
            .write(&format!("saving resume data: {pending} torrent(s) pending\n"));

        let expired = match (self.options.shutdown_timeout, self.drain_started) {
            (Some(timeout), Some(started)) => started.elapsed() >= timeout,
            _ => false,
        };
        if expired {
            self.abandon_pending("drain deadline passed");
            return;
        }

        match self.console.sleep_and_read_key(self.options.drain_interval).await {
            Some(QUIT_KEY) => self.abandon_pending("quit requested while draining"),
            Some(key) => debug!(%key, "key ignored while saving resume data"),
            None => {}
        }
    }

    fn abandon_pending(&mut self, reason: &'static str) {
        let abandoned = self.processor.abandon_pending(&mut self.registry);
        warn!(
            reason,
            abandoned = abandoned.len(),
            handles = ?abandoned.iter().map(|handle| handle.raw()).collect::<Vec<_>>(),
            "gave up waiting for resume data"
        );
        self.report.abandoned += abandoned.len();
        self.phase = Phase::Terminated;
    }

    async fn drain_alerts(&mut self) -> DrainReport {
        let drained = self
            .processor
            .process(self.engine.as_ref(), &mut self.registry)
            .await;
        self.report.saved += drained.saved;
        self.report.failed += drained.failed;
        if drained.alerts() > 0 {
            debug!(
                added = drained.added,
                updated = drained.updated,
                stale = drained.stale,
                saved = drained.saved,
                failed = drained.failed,
                other = drained.other,
                "alerts drained"
            );
        }
        drained
    }

    fn all_complete(&self) -> bool {
        self.registry.snapshot().all(|status| status.is_complete())
    }

    /// Handles awaiting resume data.
    #[must_use]
    pub fn pending_handles(&self) -> Vec<TorrentHandle> {
        self.processor.pending().handles()
    }
}
