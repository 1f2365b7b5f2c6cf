//! Integration tests for review sessions.
//!
//! A rejected image is deleted, banned, and never offered again by any
//! source, even when the same bytes reappear under another name.

use clockwork_orange::config::{SourceConfig, TargetMode};
use clockwork_orange::core::exclusion::ExclusionStore;
use clockwork_orange::core::fingerprint::{fingerprint, FingerprintCache};
use clockwork_orange::core::review::{Direction, ReviewSession, ReviewState};
use clockwork_orange::core::selection::SelectionEngine;
use clockwork_orange::core::source::SourceRegistry;
use clockwork_orange::events::{Event, EventChannel, ReviewEvent};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Setup {
    dir: TempDir,
    store: Arc<ExclusionStore>,
    fingerprints: Arc<FingerprintCache>,
    registry: Arc<SourceRegistry>,
}

impl Setup {
    fn new(configs: &[SourceConfig]) -> Self {
        let dir = TempDir::new().unwrap();
        Self::in_dir(dir, configs)
    }

    fn in_dir(dir: TempDir, configs: &[SourceConfig]) -> Self {
        let store = Arc::new(ExclusionStore::open(&dir.path().join("blacklist.json")).unwrap());
        let fingerprints = Arc::new(FingerprintCache::new());
        let registry = Arc::new(
            SourceRegistry::from_config(configs, store.clone(), fingerprints.clone()).unwrap(),
        );
        Self {
            dir,
            store,
            fingerprints,
            registry,
        }
    }

    fn session(&self) -> ReviewSession {
        ReviewSession::new(
            self.store.clone(),
            self.registry.clone(),
            self.fingerprints.clone(),
        )
    }
}

fn walls_with(dir: &TempDir, names: &[&str]) -> PathBuf {
    let walls = dir.path().join("walls");
    fs::create_dir_all(&walls).unwrap();
    for name in names {
        fs::write(walls.join(name), format!("pixels of {}", name)).unwrap();
    }
    walls
}

fn sorted_names(session: &ReviewSession) -> Vec<String> {
    let mut names: Vec<String> = session.remaining().iter().map(|c| c.file_name()).collect();
    names.sort();
    names
}

/// Move the cursor onto the image with this name
fn seek(session: &mut ReviewSession, name: &str) {
    while session.current().map(|c| c.file_name()).as_deref() != Some(name) {
        let before = session.position();
        session.advance(Direction::Next);
        assert_ne!(before, session.position(), "{} not found", name);
    }
}

#[test]
fn rejected_image_is_gone_for_good() {
    let dir = TempDir::new().unwrap();
    let walls = walls_with(&dir, &["x.jpg", "y.jpg", "z.jpg"]);
    let y_fingerprint = fingerprint(&walls.join("y.jpg")).unwrap();
    let setup = Setup::in_dir(dir, &[SourceConfig::local("walls", &walls)]);

    let mut session = setup.session();
    session.scan("walls").unwrap();
    seek(&mut session, "y.jpg");
    session.reject().unwrap();

    assert!(!walls.join("y.jpg").exists());
    assert!(setup
        .store
        .list_all()
        .iter()
        .any(|e| e.fingerprint == y_fingerprint && e.source_id == "walls"));

    let mut rescan = setup.session();
    rescan.scan("walls").unwrap();
    assert_eq!(sorted_names(&rescan), vec!["x.jpg", "z.jpg"]);
}

#[test]
fn ban_survives_restart_and_redownload() {
    let dir = TempDir::new().unwrap();
    let walls = walls_with(&dir, &["x.jpg", "y.jpg"]);
    let configs = [SourceConfig::download_dir("wallhaven", Some(walls.clone()))];
    let setup = Setup::in_dir(dir, &configs);

    let mut session = setup.session();
    session.scan("wallhaven").unwrap();
    seek(&mut session, "y.jpg");
    session.reject().unwrap();

    // The downloader fetches the same image again under a new name
    fs::write(walls.join("y-again.jpg"), "pixels of y.jpg").unwrap();

    let restarted = Setup::in_dir(setup.dir, &configs);
    assert_eq!(restarted.store.len(), 1);

    let engine =
        SelectionEngine::new(restarted.registry.adapters().to_vec(), restarted.fingerprints.clone())
            .with_seed(1);
    for _ in 0..30 {
        let result = engine.select(TargetMode::Desktop).unwrap();
        assert_eq!(result.primary.file_name(), "x.jpg");
    }
}

#[test]
fn empty_folder_scans_to_empty() {
    let dir = TempDir::new().unwrap();
    let walls = walls_with(&dir, &[]);
    fs::write(walls.join("readme.txt"), "not an image").unwrap();
    let setup = Setup::in_dir(dir, &[SourceConfig::local("walls", &walls)]);

    let mut session = setup.session();

    assert_eq!(session.scan("walls").unwrap(), ReviewState::Empty);
    assert!(session.current().is_none());
}

#[test]
fn missing_folder_is_an_error_not_empty() {
    let setup = Setup::new(&[SourceConfig::local("walls", "/definitely/not/here")]);
    let mut session = setup.session();

    assert!(session.scan("walls").is_err());
    assert_eq!(session.state(), ReviewState::Empty);
}

#[test]
fn review_reports_events() {
    let dir = TempDir::new().unwrap();
    let walls = walls_with(&dir, &["only.jpg"]);
    let setup = Setup::in_dir(dir, &[SourceConfig::local("walls", &walls)]);
    let (sender, receiver) = EventChannel::new();

    let mut session = setup.session().with_events(sender);
    session.scan("walls").unwrap();
    session.reject().unwrap();
    drop(session);

    let events: Vec<Event> = receiver.iter().collect();
    assert!(matches!(
        events.first(),
        Some(Event::Review(ReviewEvent::Scanned { total: 1, .. }))
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Review(ReviewEvent::Rejected { .. }))));
    assert!(matches!(
        events.last(),
        Some(Event::Review(ReviewEvent::Exhausted { .. }))
    ));
}
