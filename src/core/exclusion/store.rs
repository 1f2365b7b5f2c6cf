//! File-backed exclusion store.

use super::types::{BlacklistDocument, BlacklistDocumentRef, ExclusionEntry, DOCUMENT_VERSION};
use crate::core::fingerprint::{ContentFingerprint, FingerprintCache};
use crate::error::{Result, StoreError};
use crate::events::{Event, EventSender, ExclusionEvent};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
struct StoreState {
    /// Insertion order, which is also display order
    entries: Vec<ExclusionEntry>,
    index: HashSet<ContentFingerprint>,
}

impl StoreState {
    fn from_entries(entries: Vec<ExclusionEntry>) -> Self {
        let mut state = Self::default();
        for entry in entries {
            if state.index.insert(entry.fingerprint) {
                state.entries.push(entry);
            } else {
                warn!(
                    fingerprint = %entry.fingerprint.short(),
                    "Ignoring duplicate blacklist entry"
                );
            }
        }
        state
    }
}

/// Process-wide blacklist of content fingerprints.
///
/// Loaded once, shared by reference (`Arc<ExclusionStore>`) with every
/// source, engine and review session. Mutations are serialized by a writer
/// lock and written to disk before they become visible in memory, so readers
/// only ever see fully persisted states.
pub struct ExclusionStore {
    path: PathBuf,
    state: RwLock<StoreState>,
    writer: Mutex<()>,
    events: Option<EventSender>,
}

impl ExclusionStore {
    /// Open the store backed by `path`.
    ///
    /// A missing file is an empty store. A file that exists but cannot be
    /// parsed is reported as [`StoreError::Corrupt`] and left untouched.
    pub fn open(path: &Path) -> std::result::Result<Self, StoreError> {
        let state = Self::load(path)?;
        info!(path = %path.display(), entries = state.entries.len(), "Loaded blacklist");

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
            writer: Mutex::new(()),
            events: None,
        })
    }

    /// Report mutations through an event channel
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Backing file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, fingerprint: &ContentFingerprint) -> bool {
        self.read_state().index.contains(fingerprint)
    }

    pub fn get(&self, fingerprint: &ContentFingerprint) -> Option<ExclusionEntry> {
        let state = self.read_state();
        if !state.index.contains(fingerprint) {
            return None;
        }
        state
            .entries
            .iter()
            .find(|e| &e.fingerprint == fingerprint)
            .cloned()
    }

    /// Ban a fingerprint and persist immediately.
    ///
    /// Re-adding a known fingerprint is a no-op that keeps the original
    /// record. Returns whether a new entry was written.
    pub fn add(
        &self,
        fingerprint: ContentFingerprint,
        source_id: &str,
        original_name: &str,
    ) -> std::result::Result<bool, StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = self.read_state().clone();
        if !next.index.insert(fingerprint) {
            debug!(fingerprint = %fingerprint.short(), "Already blacklisted");
            return Ok(false);
        }
        next.entries
            .push(ExclusionEntry::new(fingerprint, source_id, original_name));

        self.persist(&next.entries)?;
        *self.write_state() = next;

        info!(
            fingerprint = %fingerprint.short(),
            source = source_id,
            name = original_name,
            "Blacklisted image"
        );
        self.emit(ExclusionEvent::Added {
            fingerprint: fingerprint.to_hex(),
            source_id: source_id.to_string(),
            original_name: original_name.to_string(),
        });
        Ok(true)
    }

    /// Lift a ban. Unknown fingerprints return `Ok(false)`.
    pub fn remove(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> std::result::Result<bool, StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = self.read_state().clone();
        if !next.index.remove(fingerprint) {
            return Ok(false);
        }
        next.entries.retain(|e| &e.fingerprint != fingerprint);

        self.persist(&next.entries)?;
        *self.write_state() = next;

        info!(fingerprint = %fingerprint.short(), "Removed blacklist entry");
        self.emit(ExclusionEvent::Removed {
            fingerprint: fingerprint.to_hex(),
        });
        Ok(true)
    }

    /// All entries in insertion order
    pub fn list_all(&self) -> Vec<ExclusionEntry> {
        self.read_state().entries.clone()
    }

    /// Entries matching a free-text filter (see [`ExclusionEntry::matches`])
    pub fn search(&self, query: &str) -> Vec<ExclusionEntry> {
        self.read_state()
            .entries
            .iter()
            .filter(|e| e.matches(query))
            .cloned()
            .collect()
    }

    /// Resolve a full fingerprint or a prefix of exactly one entry's
    pub fn resolve(&self, input: &str) -> std::result::Result<ContentFingerprint, StoreError> {
        let prefix = input.trim().to_lowercase();
        if prefix.len() == 64 {
            return prefix.parse();
        }
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::InvalidFingerprint {
                value: input.to_string(),
            });
        }

        let state = self.read_state();
        let mut matches = state
            .entries
            .iter()
            .map(|e| e.fingerprint)
            .filter(|fp| fp.to_hex().starts_with(&prefix));

        match (matches.next(), matches.count()) {
            (Some(only), 0) => Ok(only),
            (Some(_), others) => Err(StoreError::AmbiguousPrefix {
                prefix,
                matches: others + 1,
            }),
            (None, _) => Err(StoreError::UnknownPrefix { prefix }),
        }
    }

    pub fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fingerprint a file and ban it without touching the file itself.
    pub fn ban_file(
        &self,
        path: &Path,
        source_id: &str,
        fingerprints: &FingerprintCache,
    ) -> Result<ContentFingerprint> {
        let fingerprint = fingerprints.fingerprint(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.add(fingerprint, source_id, &name)?;
        Ok(fingerprint)
    }

    fn load(path: &Path) -> std::result::Result<StoreState, StoreError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No blacklist yet, starting empty");
                return Ok(StoreState::default());
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let document: BlacklistDocument =
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if document.version > DOCUMENT_VERSION {
            return Err(StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "document version {} is newer than supported version {}",
                    document.version, DOCUMENT_VERSION
                ),
            });
        }

        Ok(StoreState::from_entries(document.entries))
    }

    /// Write the full state to a sibling temp file, then rename it over the
    /// canonical path. The canonical file is never opened for writing.
    fn persist(&self, entries: &[ExclusionEntry]) -> std::result::Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        fs::create_dir_all(&dir).map_err(io_error)?;

        let document = BlacklistDocumentRef {
            version: DOCUMENT_VERSION,
            entries,
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(io_error)?;
        temp.write_all(&json).map_err(io_error)?;
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(&self.path).map_err(|e| io_error(e.error))?;

        sync_directory(&dir);
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ExclusionEvent) {
        if let Some(sender) = &self.events {
            sender.send(Event::Exclusion(event));
        }
    }
}

/// Make the rename itself durable where the platform allows it
#[cfg(unix)]
fn sync_directory(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) {}
