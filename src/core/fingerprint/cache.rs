//! In-memory fingerprint cache.
//!
//! Fingerprinting reads every byte of every candidate, which adds up when
//! the same directories are enumerated every few minutes. Entries are keyed
//! by path and only reused while the file's size and modification time are
//! unchanged. Paths whose file is gone are evicted on lookup and by
//! [`FingerprintCache::prune_missing`], so folders that churn do not grow the
//! map without bound.

use super::{fingerprint, ContentFingerprint};
use crate::error::FingerprintError;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct CachedFingerprint {
    fingerprint: ContentFingerprint,
    file_size: u64,
    file_modified: SystemTime,
}

impl CachedFingerprint {
    /// Valid while neither size nor mtime changed
    fn is_valid_for(&self, file_size: u64, file_modified: SystemTime) -> bool {
        self.file_size == file_size && self.file_modified == file_modified
    }
}

/// Thread-safe fingerprint cache shared by sources and the selection engine
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: RwLock<HashMap<PathBuf, CachedFingerprint>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint a file, reusing a cached digest when the file is unchanged.
    pub fn fingerprint(&self, path: &Path) -> Result<ContentFingerprint, FingerprintError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(source) => {
                if source.kind() == ErrorKind::NotFound {
                    self.invalidate(path);
                }
                return Err(FingerprintError::UnreadableFile {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let file_size = metadata.len();
        let file_modified = metadata.modified().unwrap_or(UNIX_EPOCH);

        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(path) {
                if entry.is_valid_for(file_size, file_modified) {
                    return Ok(entry.fingerprint);
                }
            }
        }

        let computed = fingerprint(path)?;

        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                path.to_path_buf(),
                CachedFingerprint {
                    fingerprint: computed,
                    file_size,
                    file_modified,
                },
            );
        }

        Ok(computed)
    }

    /// Drop the cached digest for a path (e.g. after deleting the file)
    pub fn invalidate(&self, path: &Path) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(path);
        }
    }

    /// Forget every path that no longer exists. Returns how many were dropped.
    pub fn prune_missing(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|path, _| path.exists());
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!(pruned, remaining = entries.len(), "Pruned fingerprints of vanished files");
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
