//! Integration tests for the selection engine.
//!
//! These tests verify end-to-end selection behavior including:
//! - Fairness between sources of very different sizes
//! - Dual-target distinctness and insufficiency
//! - Sources that are offline, slow or banned
//! - Rejection of overlapping cycles

use clockwork_orange::config::{SourceConfig, TargetMode};
use clockwork_orange::core::exclusion::ExclusionStore;
use clockwork_orange::core::fingerprint::{fingerprint, FingerprintCache};
use clockwork_orange::core::selection::SelectionEngine;
use clockwork_orange::core::source::{CandidateIter, ImageCandidate, SourceAdapter, SourceRegistry};
use clockwork_orange::error::{SelectionError, SourceError};
use clockwork_orange::events::{Event, EventChannel, SourceEvent};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Source backed by a fixed list of paths, no disk access
struct ListSource {
    id: String,
    count: usize,
}

impl SourceAdapter for ListSource {
    fn identity(&self) -> &str {
        &self.id
    }

    fn enumerate(&self) -> Result<CandidateIter<'_>, SourceError> {
        Ok(Box::new((0..self.count).map(move |i| {
            ImageCandidate::new(format!("/{}/{}.jpg", self.id, i), self.id.clone())
        })))
    }
}

/// Source that sleeps before answering
struct SlowSource {
    delay: Duration,
}

impl SourceAdapter for SlowSource {
    fn identity(&self) -> &str {
        "slow"
    }

    fn enumerate(&self) -> Result<CandidateIter<'_>, SourceError> {
        thread::sleep(self.delay);
        Ok(Box::new(std::iter::once(ImageCandidate::new("/slow/late.jpg", "slow"))))
    }
}

/// Slow source that records how many enumerations overlap
struct CountingSource {
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingSource {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl SourceAdapter for CountingSource {
    fn identity(&self) -> &str {
        "counting"
    }

    fn enumerate(&self) -> Result<CandidateIter<'_>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(Box::new(std::iter::once(ImageCandidate::new(
            "/counting/a.jpg",
            "counting",
        ))))
    }
}

/// Source that holds the cycle open until released
struct GateSource {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl SourceAdapter for GateSource {
    fn identity(&self) -> &str {
        "gate"
    }

    fn enumerate(&self) -> Result<CandidateIter<'_>, SourceError> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        Ok(Box::new(std::iter::once(ImageCandidate::new("/gate/a.jpg", "gate"))))
    }
}

struct Library {
    dir: TempDir,
    store: Arc<ExclusionStore>,
    fingerprints: Arc<FingerprintCache>,
}

impl Library {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ExclusionStore::open(&dir.path().join("blacklist.json")).unwrap());
        Self {
            dir,
            store,
            fingerprints: Arc::new(FingerprintCache::new()),
        }
    }

    fn folder(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    fn image(&self, folder: &str, name: &str, content: &str) -> PathBuf {
        let path = self.folder(folder).join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn engine(&self, folders: &[&str]) -> SelectionEngine {
        let configs: Vec<SourceConfig> = folders
            .iter()
            .map(|folder| SourceConfig::local(*folder, self.dir.path().join(folder)))
            .collect();
        let registry =
            SourceRegistry::from_config(&configs, self.store.clone(), self.fingerprints.clone())
                .unwrap();
        SelectionEngine::new(registry.adapters().to_vec(), self.fingerprints.clone())
            .with_seed(2024)
    }
}

fn list_source(id: &str, count: usize) -> Arc<dyn SourceAdapter> {
    Arc::new(ListSource {
        id: id.to_string(),
        count,
    })
}

#[test]
fn one_image_source_is_as_likely_as_thousand_image_source() {
    let engine = SelectionEngine::new(
        vec![list_source("tiny", 1), list_source("huge", 1000)],
        Arc::new(FingerprintCache::new()),
    )
    .with_seed(99);

    let runs = 10_000;
    let tiny = (0..runs)
        .filter(|_| engine.select(TargetMode::Desktop).unwrap().primary.source_id == "tiny")
        .count();

    let share = tiny as f64 / runs as f64;
    assert!(
        (0.47..0.53).contains(&share),
        "tiny source chosen {:.3} of the time",
        share
    );
}

#[test]
fn fairness_holds_for_folders_on_disk() {
    let library = Library::new();
    library.image("one", "only.jpg", "only");
    for i in 0..40 {
        library.image("many", &format!("{}.jpg", i), &format!("many-{}", i));
    }
    let engine = library.engine(&["one", "many"]);

    let runs = 2_000;
    let one = (0..runs)
        .filter(|_| engine.select(TargetMode::Desktop).unwrap().primary.source_id == "one")
        .count();

    let share = one as f64 / runs as f64;
    assert!((0.43..0.57).contains(&share), "share was {:.3}", share);
}

#[test]
fn dual_results_never_share_content() {
    let library = Library::new();
    library.image("a", "sunset.jpg", "sunset");
    library.image("b", "sunset-copy.jpg", "sunset");
    library.image("b", "forest.jpg", "forest");
    let engine = library.engine(&["a", "b"]);

    for _ in 0..200 {
        let result = engine.select(TargetMode::Dual).unwrap();
        let secondary = result.secondary.unwrap();
        assert_ne!(
            fingerprint(&result.primary.path).unwrap(),
            fingerprint(&secondary.path).unwrap()
        );
    }
}

#[test]
fn dual_with_single_image_is_insufficient() {
    let library = Library::new();
    library.image("a", "only.jpg", "only");
    let engine = library.engine(&["a"]);

    assert!(matches!(
        engine.select(TargetMode::Dual),
        Err(SelectionError::InsufficientCandidates { available: 1 })
    ));
    // Single-target still works with the same library
    assert!(engine.select(TargetMode::Desktop).is_ok());
}

#[test]
fn dual_with_two_copies_of_one_image_is_insufficient() {
    let library = Library::new();
    library.image("a", "one.jpg", "same bytes");
    library.image("b", "two.jpg", "same bytes");
    let engine = library.engine(&["a", "b"]);

    assert!(matches!(
        engine.select(TargetMode::Dual),
        Err(SelectionError::InsufficientCandidates { .. })
    ));
}

#[test]
fn empty_and_missing_folders_give_no_candidates() {
    let library = Library::new();
    library.folder("empty");
    let engine = library.engine(&["empty", "missing"]);

    assert!(matches!(
        engine.select(TargetMode::Desktop),
        Err(SelectionError::NoCandidates)
    ));
}

#[test]
fn missing_folder_does_not_block_other_sources() {
    let library = Library::new();
    library.image("present", "a.jpg", "a");
    let engine = library.engine(&["missing", "present"]);

    for _ in 0..20 {
        let result = engine.select(TargetMode::Desktop).unwrap();
        assert_eq!(result.primary.source_id, "present");
    }
}

#[test]
fn banned_images_are_never_selected() {
    let library = Library::new();
    let banned = library.image("a", "banned.jpg", "banned");
    library.image("a", "kept.jpg", "kept");
    library
        .store
        .ban_file(&banned, "a", &library.fingerprints)
        .unwrap();
    let engine = library.engine(&["a"]);

    for _ in 0..50 {
        let result = engine.select(TargetMode::Desktop).unwrap();
        assert_eq!(result.primary.file_name(), "kept.jpg");
    }
}

#[test]
fn slow_source_times_out_and_is_skipped() {
    let slow: Arc<dyn SourceAdapter> = Arc::new(SlowSource {
        delay: Duration::from_secs(3),
    });
    let engine = SelectionEngine::new(
        vec![slow, list_source("fast", 3)],
        Arc::new(FingerprintCache::new()),
    )
    .with_timeout(Some(Duration::from_millis(200)));

    let started = Instant::now();
    let result = engine.select(TargetMode::Desktop).unwrap();

    assert_eq!(result.primary.source_id, "fast");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn overlapping_cycle_is_rejected_as_busy() {
    let (entered_tx, entered_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let gate: Arc<dyn SourceAdapter> = Arc::new(GateSource {
        entered: entered_tx,
        release: release_rx,
    });
    let engine = Arc::new(SelectionEngine::new(
        vec![gate],
        Arc::new(FingerprintCache::new()),
    ));

    let background = {
        let engine = engine.clone();
        thread::spawn(move || engine.select(TargetMode::Desktop))
    };
    entered_rx.recv().unwrap();

    assert!(matches!(
        engine.select(TargetMode::Desktop),
        Err(SelectionError::Busy)
    ));

    release_tx.send(()).unwrap();
    assert!(background.join().unwrap().is_ok());

    // The engine accepts new cycles once the first one is done
    release_tx.send(()).unwrap();
    assert!(engine.select(TargetMode::Desktop).is_ok());
}

#[test]
fn timed_out_source_is_not_enumerated_again_while_still_running() {
    let counting = Arc::new(CountingSource::new(Duration::from_millis(500)));
    let adapter: Arc<dyn SourceAdapter> = counting.clone();
    let engine = SelectionEngine::new(
        vec![adapter, list_source("fast", 2)],
        Arc::new(FingerprintCache::new()),
    )
    .with_timeout(Some(Duration::from_millis(100)));

    let (sender, receiver) = EventChannel::new();
    let first = engine.select_with_events(TargetMode::Desktop, &sender).unwrap();
    receiver.drain();
    let second = engine.select_with_events(TargetMode::Desktop, &sender).unwrap();

    assert_eq!(first.primary.source_id, "fast");
    assert_eq!(second.primary.source_id, "fast");
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    assert!(receiver.drain().iter().any(|event| matches!(
        event,
        Event::Source(SourceEvent::Unavailable { source_id, message })
            if source_id == "counting" && message.contains("still running")
    )));

    // Once the straggler returns, the source takes part again
    thread::sleep(Duration::from_millis(700));
    let engine = engine.with_timeout(None);
    let seen_counting = (0..50).any(|_| {
        engine.select(TargetMode::Desktop).unwrap().primary.source_id == "counting"
    });

    assert!(seen_counting);
    assert_eq!(counting.peak.load(Ordering::SeqCst), 1);
}
