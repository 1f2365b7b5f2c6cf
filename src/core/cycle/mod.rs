//! # Cycle Module
//!
//! Continuous wallpaper rotation: select, apply, wait, repeat.
//!
//! Setting the wallpaper itself is platform work done by a
//! [`WallpaperSink`]. Cycles that find nothing to show are skipped and
//! retried after the next wait; they never fall back to a default image.

use crate::config::TargetMode;
use crate::core::selection::{SelectionEngine, SelectionResult};
use crate::error::WallpaperError;
use crate::events::{null_sender, CycleEvent, Event, EventSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Longest uninterrupted sleep between cancellation checks
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Receives each selection and puts it on screen
pub trait WallpaperSink {
    fn apply(&mut self, result: &SelectionResult) -> Result<(), WallpaperError>;
}

/// Token for cancelling a running cycler
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep up to `duration`, waking early on cancellation.
    /// Returns `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(POLL_INTERVAL));
        }
    }
}

/// Totals reported when a cycler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub cycles: u64,
    pub applied: u64,
    pub skipped: u64,
}

/// Runs selection cycles on a fixed interval
pub struct Cycler {
    engine: Arc<SelectionEngine>,
    mode: TargetMode,
    wait: Duration,
    max_cycles: Option<u64>,
    events: EventSender,
}

impl Cycler {
    pub fn new(engine: Arc<SelectionEngine>, mode: TargetMode, wait: Duration) -> Self {
        Self {
            engine,
            mode,
            wait,
            max_cycles: None,
            events: null_sender(),
        }
    }

    /// Stop after this many cycles instead of running until cancelled
    pub fn max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Cycle until cancelled (or `max_cycles` is reached).
    pub fn run<S: WallpaperSink + ?Sized>(
        &self,
        sink: &mut S,
        token: &CancellationToken,
    ) -> CycleSummary {
        let mut summary = CycleSummary::default();
        info!(mode = ?self.mode, wait_seconds = self.wait.as_secs(), "Cycling started");
        self.events.send(Event::Cycle(CycleEvent::Started {
            wait_seconds: self.wait.as_secs(),
        }));

        while !token.is_cancelled() {
            summary.cycles += 1;
            let cycle = summary.cycles;

            match self.run_once(sink) {
                Ok(result) => {
                    summary.applied += 1;
                    self.events.send(Event::Cycle(CycleEvent::Applied {
                        cycle,
                        paths: result.paths(),
                    }));
                }
                Err(e) => {
                    warn!(cycle, error = %e, "Cycle skipped");
                    summary.skipped += 1;
                    self.events.send(Event::Cycle(CycleEvent::Skipped {
                        cycle,
                        reason: e.to_string(),
                    }));
                }
            }

            if self.max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }
            if !token.sleep(self.wait) {
                break;
            }
        }

        info!(cycles = summary.cycles, applied = summary.applied, "Cycling stopped");
        self.events.send(Event::Cycle(CycleEvent::Stopped {
            cycles: summary.cycles,
        }));
        summary
    }

    /// One select-and-apply step
    pub fn run_once<S: WallpaperSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<SelectionResult, WallpaperError> {
        let result = self.engine.select(self.mode)?;
        sink.apply(&result)?;
        Ok(result)
    }
}
