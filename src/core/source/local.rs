//! Local filesystem source using walkdir.

use super::filter::{is_hidden, ImageFilter};
use super::{CandidateIter, ImageCandidate, SourceAdapter};
use crate::core::exclusion::ExclusionStore;
use crate::core::fingerprint::FingerprintCache;
use crate::error::SourceError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A directory (or single image file) on local storage.
///
/// Blacklist filtering happens while the walk is consumed: each file is
/// fingerprinted (through the shared cache) and dropped if banned. Files that
/// cannot be read are skipped with a warning.
pub struct LocalSource {
    id: String,
    root: PathBuf,
    recursive: bool,
    filter: ImageFilter,
    store: Arc<ExclusionStore>,
    fingerprints: Arc<FingerprintCache>,
}

impl LocalSource {
    pub fn new(
        id: impl Into<String>,
        root: impl Into<PathBuf>,
        store: Arc<ExclusionStore>,
        fingerprints: Arc<FingerprintCache>,
    ) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            recursive: false,
            filter: ImageFilter::new(),
            store,
            fingerprints,
        }
    }

    /// Descend into subdirectories
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Include dotfiles and dot-directories
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.filter = self.filter.with_hidden(include);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unavailable(&self, reason: impl Into<String>) -> SourceError {
        SourceError::Unavailable {
            source_id: self.id.clone(),
            reason: reason.into(),
        }
    }

    /// Build a candidate unless its content is banned or unreadable
    fn admit(&self, path: PathBuf, size: Option<u64>) -> Option<ImageCandidate> {
        match self.fingerprints.fingerprint(&path) {
            Ok(fingerprint) if self.store.contains(&fingerprint) => {
                debug!(
                    source = %self.id,
                    path = %path.display(),
                    "Skipping blacklisted image"
                );
                None
            }
            Ok(_) => {
                let candidate = ImageCandidate::new(path, self.id.clone());
                Some(match size {
                    Some(size) => candidate.with_size_hint(size),
                    None => candidate,
                })
            }
            Err(e) => {
                warn!(source = %self.id, error = %e, "Skipping unreadable image");
                None
            }
        }
    }
}

impl SourceAdapter for LocalSource {
    fn identity(&self) -> &str {
        &self.id
    }

    fn enumerate(&self) -> Result<CandidateIter<'_>, SourceError> {
        let metadata = fs::metadata(&self.root).map_err(|e| {
            self.unavailable(format!("{} is not accessible: {}", self.root.display(), e))
        })?;

        if metadata.is_file() {
            if !self.filter.should_include(&self.root) {
                return Err(self.unavailable(format!(
                    "{} is not a supported image file",
                    self.root.display()
                )));
            }
            let single = self.admit(self.root.clone(), Some(metadata.len()));
            return Ok(Box::new(single.into_iter()));
        }

        // Fail up front if the directory itself cannot be listed
        fs::read_dir(&self.root).map_err(|e| {
            self.unavailable(format!("cannot list {}: {}", self.root.display(), e))
        })?;

        let include_hidden = self.filter.includes_hidden();
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let source_id = self.id.clone();

        let walk = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0 || include_hidden || !is_hidden(entry.path())
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(
                        source = %source_id,
                        error = %e,
                        "Skipping unreadable directory entry"
                    );
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| self.filter.should_include(entry.path()))
            .filter_map(move |entry| {
                let size = entry.metadata().ok().map(|m| m.len());
                self.admit(entry.into_path(), size)
            });

        Ok(Box::new(walk))
    }
}
