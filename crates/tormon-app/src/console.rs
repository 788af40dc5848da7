//! Terminal abstraction: clear, write, and a bounded wait for one keypress.

use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, Stdout, Write};
use std::sync::Once;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode};
use tokio::task::JoinHandle;
use tracing::debug;

/// Key reported when the process is asked to stop.
pub const QUIT_KEY: char = 'q';

/// Output sink plus a single-key input primitive.
#[async_trait]
pub trait Console: Send {
    /// Clear the screen; failures are logged and otherwise ignored.
    fn clear(&mut self);

    /// Append text to the current frame, in call order.
    fn write(&mut self, text: &str);

    /// Wait at most `budget` for a keypress.
    async fn sleep_and_read_key(&mut self, budget: Duration) -> Option<char>;
}

/// Raw-mode ownership; restores cooked mode when dropped.
pub struct TerminalGuard {
    _private: (),
}

static PANIC_HOOK: Once = Once::new();

impl TerminalGuard {
    /// Put the terminal into raw mode.
    ///
    /// # Errors
    ///
    /// Returns the IO error reported by the terminal when raw mode is unavailable.
    pub fn acquire() -> io::Result<Self> {
        PANIC_HOOK.call_once(|| {
            let original_hook = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |panic_info| {
                restore_terminal();
                original_hook(panic_info);
            }));
        });
        enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

fn restore_terminal() {
    if let Err(err) = disable_raw_mode() {
        debug!(error = %err, "failed to leave raw mode");
    }
}

/// Console backed by the process terminal.
///
/// `Ctrl-C` arrives as a key in raw mode; it and `SIGTERM`/`SIGHUP` are
/// reported as [`QUIT_KEY`].
pub struct TerminalConsole {
    stdout: Stdout,
    signals: ShutdownSignals,
    keys: KeyPoller,
    _guard: TerminalGuard,
}

impl TerminalConsole {
    /// Acquire the terminal. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or the signal handlers cannot be installed.
    pub fn new() -> io::Result<Self> {
        let signals = ShutdownSignals::install()?;
        let guard = TerminalGuard::acquire()?;
        Ok(Self {
            stdout: io::stdout(),
            signals,
            keys: KeyPoller::default(),
            _guard: guard,
        })
    }
}

#[async_trait]
impl Console for TerminalConsole {
    fn clear(&mut self) {
        if let Err(err) = execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0)) {
            debug!(error = %err, "failed to clear terminal");
        }
    }

    fn write(&mut self, text: &str) {
        let translated = text.replace('\n', "\r\n");
        let written = self
            .stdout
            .write_all(translated.as_bytes())
            .and_then(|()| self.stdout.flush());
        if let Err(err) = written {
            debug!(error = %err, "failed to write to terminal");
        }
    }

    async fn sleep_and_read_key(&mut self, budget: Duration) -> Option<char> {
        self.keys
            .next_key(move || read_key_blocking(budget), self.signals.recv())
            .await
    }
}

/// Keeps at most one blocking keyboard poll alive. A poll cut short by a
/// signal stays in flight and answers the next wait.
#[derive(Debug, Default)]
struct KeyPoller {
    in_flight: Option<JoinHandle<Option<char>>>,
}

impl KeyPoller {
    async fn next_key<P, S>(&mut self, poll: P, interrupt: S) -> Option<char>
    where
        P: FnOnce() -> Option<char> + Send + 'static,
        S: Future<Output = ()> + Send,
    {
        let mut task = self
            .in_flight
            .take()
            .unwrap_or_else(|| tokio::task::spawn_blocking(poll));
        let finished = tokio::select! {
            joined = &mut task => Some(joined),
            () = interrupt => None,
        };
        match finished {
            Some(joined) => joined.unwrap_or_else(|err| {
                debug!(error = %err, "keyboard poll task failed");
                None
            }),
            None => {
                self.in_flight = Some(task);
                Some(QUIT_KEY)
            }
        }
    }
}

fn read_key_blocking(budget: Duration) -> Option<char> {
    let deadline = Instant::now() + budget;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return None;
        }
        match event::poll(remaining) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                debug!(error = %err, "keyboard poll failed");
                return None;
            }
        }
        match event::read() {
            Ok(Event::Key(key)) => {
                if let Some(c) = key_to_char(key) {
                    return Some(c);
                }
            }
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "keyboard read failed");
                return None;
            }
        }
    }
}

fn key_to_char(key: KeyEvent) -> Option<char> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(QUIT_KEY),
        KeyCode::Char(c) => Some(c),
        _ => None,
    }
}

#[cfg(unix)]
struct ShutdownSignals {
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.terminate.recv() => {}
            _ = self.hangup.recv() => {}
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    #[allow(clippy::unnecessary_wraps)]
    const fn install() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}

/// In-memory console that records frames and replays scripted keys.
///
/// Each call to [`Console::sleep_and_read_key`] consumes one scripted entry;
/// once the script is exhausted every wait returns `None`.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    keys: VecDeque<Option<char>>,
    frames: Vec<String>,
    waits: Vec<Duration>,
}

impl ScriptedConsole {
    /// Console that answers successive waits with `keys`.
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = Option<char>>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            frames: Vec::new(),
            waits: Vec::new(),
        }
    }

    /// Every frame written so far; a frame starts at each `clear`.
    #[must_use]
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Most recent frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    /// Budgets passed to each wait, in order.
    #[must_use]
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Scripted entries not yet consumed.
    #[must_use]
    pub fn remaining_keys(&self) -> usize {
        self.keys.len()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    fn clear(&mut self) {
        self.frames.push(String::new());
    }

    fn write(&mut self, text: &str) {
        match self.frames.last_mut() {
            Some(frame) => frame.push_str(text),
            None => self.frames.push(text.to_string()),
        }
    }

    async fn sleep_and_read_key(&mut self, budget: Duration) -> Option<char> {
        self.waits.push(budget);
        self.keys.pop_front().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[tokio::test]
    async fn key_read_after_a_signal_is_delivered_by_the_next_wait() {
        let spawned = Arc::new(AtomicUsize::new(0));
        let (release, gate) = mpsc::channel::<()>();
        let mut poller = KeyPoller::default();

        let counter = Arc::clone(&spawned);
        let interrupted = poller
            .next_key(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    gate.recv().ok()?;
                    Some('p')
                },
                std::future::ready(()),
            )
            .await;
        assert_eq!(interrupted, Some(QUIT_KEY));
        release.send(()).expect("poll still waiting");

        let counter = Arc::clone(&spawned);
        let next = poller
            .next_key(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    None
                },
                std::future::pending::<()>(),
            )
            .await;
        assert_eq!(next, Some('p'));
        assert_eq!(spawned.load(Ordering::SeqCst), 1);
        assert!(poller.in_flight.is_none());
    }

    #[tokio::test]
    async fn scripted_console_replays_keys_then_times_out() {
        let mut console = ScriptedConsole::new([Some('r'), None, Some('q')]);
        let budget = Duration::from_millis(500);
        assert_eq!(console.sleep_and_read_key(budget).await, Some('r'));
        assert_eq!(console.sleep_and_read_key(budget).await, None);
        assert_eq!(console.sleep_and_read_key(budget).await, Some('q'));
        assert_eq!(console.sleep_and_read_key(budget).await, None);
        assert_eq!(console.waits().len(), 4);
        assert_eq!(console.remaining_keys(), 0);
    }

    #[test]
    fn writes_accumulate_per_frame() {
        let mut console = ScriptedConsole::default();
        console.write("before any clear");
        console.clear();
        console.write("a");
        console.write("b");
        console.clear();
        console.write("c");
        assert_eq!(console.frames(), ["before any clear", "ab", "c"]);
        assert_eq!(console.last_frame(), Some("c"));
    }

    #[test]
    fn control_c_maps_to_quit() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_char(ctrl_c), Some(QUIT_KEY));
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(key_to_char(esc), None);
        let plain = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::NONE);
        assert_eq!(key_to_char(plain), Some('p'));
        let arrow = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(key_to_char(arrow), None);
    }
}
