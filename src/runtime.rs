use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum ArcadeEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// One runner step: the event plus wall time since the previous step.
#[derive(Clone, Debug)]
pub struct Step {
    pub event: ArcadeEvent,
    pub elapsed: Duration,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<ArcadeEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<ArcadeEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let sent = match event::read() {
                // Windows reports releases too; games only react to presses.
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(ArcadeEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(ArcadeEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if sent.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ArcadeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<ArcadeEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<ArcadeEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ArcadeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    last_step: Instant,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
            last_step: Instant::now(),
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout,
    /// together with the time that passed since the last step.
    pub fn step(&mut self) -> Step {
        let event = match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                ArcadeEvent::Tick
            }
        };
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_step);
        self.last_step = now;
        Step { event, elapsed }
    }
}
