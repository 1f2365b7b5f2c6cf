//! Selection engine: one enumeration pass, then a fair pick.

use super::picker::{pick_distinct_pair, pick_one};
use super::{SelectionResult, SourcePool, TargetMode};
use crate::core::fingerprint::FingerprintCache;
use crate::core::source::{ImageCandidate, SourceAdapter};
use crate::error::{SelectionError, SourceError};
use crate::events::{null_sender, Event, EventSender, SelectionEvent, SourceEvent};
use crossbeam_channel::{bounded, RecvTimeoutError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A source plus a flag that is set while its `enumerate()` runs
struct TrackedSource {
    adapter: Arc<dyn SourceAdapter>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when enumeration ends, including by panic
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Picks wallpapers from a fixed set of enabled sources.
///
/// At most one cycle runs at a time; a second caller gets
/// [`SelectionError::Busy`] instead of queueing. Cycles block on source
/// I/O and belong on a worker thread.
///
/// Each source is enumerated by at most one thread at a time, even across
/// cycles: a source whose enumeration outlived an earlier cycle's timeout
/// is reported unavailable until that call returns.
pub struct SelectionEngine {
    sources: Vec<TrackedSource>,
    fingerprints: Arc<FingerprintCache>,
    rng: Mutex<StdRng>,
    cycle: Mutex<()>,
    timeout: Option<Duration>,
}

impl SelectionEngine {
    /// Engine seeded from OS entropy
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>, fingerprints: Arc<FingerprintCache>) -> Self {
        let sources = sources
            .into_iter()
            .map(|adapter| TrackedSource {
                adapter,
                in_flight: Arc::new(AtomicBool::new(false)),
            })
            .collect();

        Self {
            sources,
            fingerprints,
            rng: Mutex::new(StdRng::from_os_rng()),
            cycle: Mutex::new(()),
            timeout: None,
        }
    }

    /// Replace the random source, e.g. with a seeded one for tests
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    /// Give up on any source that has not finished enumerating in time
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one selection cycle without events
    pub fn select(&self, mode: TargetMode) -> Result<SelectionResult, SelectionError> {
        self.select_with_events(mode, &null_sender())
    }

    /// Run one selection cycle with event reporting
    pub fn select_with_events(
        &self,
        mode: TargetMode,
        events: &EventSender,
    ) -> Result<SelectionResult, SelectionError> {
        let _cycle = match self.cycle.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!("Selection requested while a cycle is running");
                return Err(SelectionError::Busy);
            }
        };

        let start = Instant::now();
        events.send(Event::Selection(SelectionEvent::Started {
            sources: self.sources.len(),
            targets: mode.target_count(),
        }));

        let result = self.run_cycle(mode, events);

        match &result {
            Ok(selection) => {
                info!(
                    paths = ?selection.paths(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Selection completed"
                );
                events.send(Event::Selection(SelectionEvent::Completed {
                    paths: selection.paths(),
                }));
            }
            Err(e) => {
                warn!(error = %e, "Selection failed");
                events.send(Event::Selection(SelectionEvent::Failed {
                    message: e.to_string(),
                }));
            }
        }

        result
    }

    fn run_cycle(
        &self,
        mode: TargetMode,
        events: &EventSender,
    ) -> Result<SelectionResult, SelectionError> {
        let mut pools = self.collect_pools(events);
        self.fingerprints.prune_missing();
        if pools.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        match mode.target_count() {
            1 => {
                let (pool, item) =
                    pick_one(&pools, &mut *rng).ok_or(SelectionError::NoCandidates)?;
                let candidate = pools[pool].candidates.swap_remove(item);
                Ok(SelectionResult::single(candidate))
            }
            _ => {
                let fingerprints = &self.fingerprints;
                let (first, second) =
                    pick_distinct_pair(pools, &mut *rng, |path| fingerprints.fingerprint(path))?;
                Ok(SelectionResult::pair(first, second))
            }
        }
    }

    /// Enumerate every source once, in parallel. Unavailable, timed-out and
    /// empty sources are left out.
    pub fn collect_pools(&self, events: &EventSender) -> Vec<SourcePool> {
        self.sources
            .par_iter()
            .filter_map(|source| {
                let source_id = source.adapter.identity().to_string();
                events.send(Event::Source(SourceEvent::Started {
                    source_id: source_id.clone(),
                }));

                match self.enumerate(source) {
                    Ok(candidates) => {
                        debug!(
                            source = %source_id,
                            count = candidates.len(),
                            "Source enumerated"
                        );
                        events.send(Event::Source(SourceEvent::Enumerated {
                            source_id: source_id.clone(),
                            count: candidates.len(),
                        }));
                        (!candidates.is_empty()).then(|| SourcePool::new(source_id, candidates))
                    }
                    Err(e) => {
                        warn!(source = %source_id, error = %e, "Source skipped this cycle");
                        events.send(Event::Source(SourceEvent::Unavailable {
                            source_id,
                            message: e.to_string(),
                        }));
                        None
                    }
                }
            })
            .collect()
    }

    fn enumerate(&self, source: &TrackedSource) -> Result<Vec<ImageCandidate>, SourceError> {
        let source_id = source.adapter.identity().to_string();
        if source.in_flight.swap(true, Ordering::AcqRel) {
            return Err(SourceError::Unavailable {
                source_id,
                reason: "previous enumeration still running".to_string(),
            });
        }
        let guard = InFlight(Arc::clone(&source.in_flight));

        let Some(timeout) = self.timeout else {
            let result = source.adapter.enumerate().map(|candidates| candidates.collect());
            drop(guard);
            return result;
        };

        // On timeout the worker is detached and keeps the guard until its
        // enumerate() returns
        let (sender, receiver) = bounded(1);
        let worker = Arc::clone(&source.adapter);
        thread::Builder::new()
            .name(format!("enumerate-{}", source_id))
            .spawn(move || {
                let _guard = guard;
                let result = worker.enumerate().map(|candidates| candidates.collect::<Vec<_>>());
                let _ = sender.send(result);
            })
            .map_err(|e| SourceError::Unavailable {
                source_id: source_id.clone(),
                reason: format!("could not start enumeration: {}", e),
            })?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SourceError::TimedOut { source_id, timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Unavailable {
                source_id,
                reason: "enumeration ended without a result".to_string(),
            }),
        }
    }
}
