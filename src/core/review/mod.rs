//! # Review Module
//!
//! Walk one source's images and prune the ones you never want to see again.
//!
//! ## States
//! - `Empty` - nothing loaded, or every image has been visited or removed
//! - `Positioned(i)` - viewing image `i` of the snapshot
//!
//! `scan` takes a snapshot of the source; later changes on disk are not
//! picked up until the next scan. Rejecting an image deletes the file
//! first and bans its fingerprint only once the delete succeeded, so a ban
//! never hides an image the user can still find in place. A file that
//! vanished since the scan is reported as a failed delete.
//!
//! Deletion is permanent. There is no trash or quarantine folder.

use crate::core::exclusion::ExclusionStore;
use crate::core::fingerprint::{ContentFingerprint, FingerprintCache};
use crate::core::source::{ImageCandidate, SourceRegistry};
use crate::error::{FingerprintError, ReviewError};
use crate::events::{null_sender, Event, EventSender, ReviewEvent};
use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Where the session cursor is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Empty,
    Positioned(usize),
}

/// Browsing direction for [`ReviewSession::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Outcome of a successful rejection
#[derive(Debug, Clone)]
pub struct Rejection {
    pub candidate: ImageCandidate,
    pub fingerprint: ContentFingerprint,
}

/// Interactive pruning of a single source
pub struct ReviewSession {
    store: Arc<ExclusionStore>,
    registry: Arc<SourceRegistry>,
    fingerprints: Arc<FingerprintCache>,
    events: EventSender,
    source_id: Option<String>,
    candidates: Vec<ImageCandidate>,
    state: ReviewState,
}

impl ReviewSession {
    pub fn new(
        store: Arc<ExclusionStore>,
        registry: Arc<SourceRegistry>,
        fingerprints: Arc<FingerprintCache>,
    ) -> Self {
        Self {
            store,
            registry,
            fingerprints,
            events: null_sender(),
            source_id: None,
            candidates: Vec::new(),
            state: ReviewState::Empty,
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Load a snapshot of the source, newest files first.
    ///
    /// An unknown or unreachable source is an error and leaves the session
    /// `Empty`. A source with no images is not an error.
    pub fn scan(&mut self, source_id: &str) -> Result<ReviewState, ReviewError> {
        self.candidates.clear();
        self.state = ReviewState::Empty;
        self.source_id = None;

        let source = self.registry.require(source_id)?;
        let mut dated: Vec<(Option<SystemTime>, ImageCandidate)> = source
            .enumerate()?
            .map(|candidate| {
                let modified = fs::metadata(&candidate.path)
                    .and_then(|m| m.modified())
                    .ok();
                (modified, candidate)
            })
            .collect();

        // Newest first, name as tiebreak so the order is stable
        dated.sort_by(|(a_time, a), (b_time, b)| {
            b_time
                .cmp(a_time)
                .then_with(|| a.file_name().cmp(&b.file_name()))
        });

        self.candidates = dated.into_iter().map(|(_, candidate)| candidate).collect();
        self.source_id = Some(source_id.to_string());
        self.state = if self.candidates.is_empty() {
            ReviewState::Empty
        } else {
            ReviewState::Positioned(0)
        };

        info!(source = %source_id, total = self.candidates.len(), "Review scan complete");
        self.events.send(Event::Review(ReviewEvent::Scanned {
            source_id: source_id.to_string(),
            total: self.candidates.len(),
        }));

        Ok(self.state)
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn current(&self) -> Option<&ImageCandidate> {
        match self.state {
            ReviewState::Positioned(index) => self.candidates.get(index),
            ReviewState::Empty => None,
        }
    }

    /// `(index, total)` for a "3 / 40" style indicator
    pub fn position(&self) -> Option<(usize, usize)> {
        match self.state {
            ReviewState::Positioned(index) => Some((index, self.candidates.len())),
            ReviewState::Empty => None,
        }
    }

    pub fn remaining(&self) -> &[ImageCandidate] {
        &self.candidates
    }

    /// Move one step; stepping past either end stays put
    pub fn advance(&mut self, direction: Direction) -> Option<&ImageCandidate> {
        if let ReviewState::Positioned(index) = self.state {
            let next = match direction {
                Direction::Previous => index.saturating_sub(1),
                Direction::Next => (index + 1).min(self.candidates.len() - 1),
            };
            if next != index {
                self.state = ReviewState::Positioned(next);
                self.events.send(Event::Review(ReviewEvent::Moved {
                    index: next,
                    total: self.candidates.len(),
                }));
            }
        }
        self.current()
    }

    /// Leave the current image alone and move on. Skipping the last image
    /// ends the session.
    pub fn skip(&mut self) -> Option<&ImageCandidate> {
        if let ReviewState::Positioned(index) = self.state {
            if index + 1 < self.candidates.len() {
                self.state = ReviewState::Positioned(index + 1);
                self.events.send(Event::Review(ReviewEvent::Moved {
                    index: index + 1,
                    total: self.candidates.len(),
                }));
            } else {
                self.finish();
            }
        }
        self.current()
    }

    /// Delete the current image and ban its content.
    ///
    /// If the delete fails the image stays in the session and is not
    /// banned. If the delete succeeds but the ban cannot be saved, the image
    /// is dropped from the session (it is gone from disk) and the store
    /// error is returned.
    pub fn reject(&mut self) -> Result<Rejection, ReviewError> {
        let index = match self.state {
            ReviewState::Positioned(index) => index,
            ReviewState::Empty => return Err(ReviewError::NothingSelected),
        };
        let candidate = self.candidates[index].clone();

        // Fingerprint while the bytes still exist
        let fingerprint = match self.fingerprints.fingerprint(&candidate.path) {
            Ok(fingerprint) => fingerprint,
            Err(FingerprintError::UnreadableFile { path, source })
                if source.kind() == ErrorKind::NotFound =>
            {
                warn!(path = %path.display(), "Image vanished before it could be deleted");
                return Err(ReviewError::Deletion { path, source });
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(source) = fs::remove_file(&candidate.path) {
            warn!(
                path = %candidate.path.display(),
                error = %source,
                "Delete failed, image not banned"
            );
            return Err(ReviewError::Deletion {
                path: candidate.path,
                source,
            });
        }
        self.fingerprints.invalidate(&candidate.path);

        if let Err(e) = self
            .store
            .add(fingerprint, &candidate.source_id, &candidate.file_name())
        {
            warn!(
                path = %candidate.path.display(),
                error = %e,
                "Image deleted but its ban was not saved"
            );
            self.drop_at(index);
            return Err(e.into());
        }

        debug!(
            path = %candidate.path.display(),
            fingerprint = %fingerprint.short(),
            "Rejected"
        );
        self.events.send(Event::Review(ReviewEvent::Rejected {
            path: candidate.path.clone(),
            fingerprint: fingerprint.to_hex(),
        }));
        self.drop_at(index);

        Ok(Rejection {
            candidate,
            fingerprint,
        })
    }

    /// Remove an item and keep the cursor on the one that slides into place
    fn drop_at(&mut self, index: usize) {
        self.candidates.remove(index);
        if self.candidates.is_empty() {
            self.finish();
        } else {
            self.state = ReviewState::Positioned(index.min(self.candidates.len() - 1));
        }
    }

    fn finish(&mut self) {
        self.state = ReviewState::Empty;
        if let Some(source_id) = &self.source_id {
            self.events.send(Event::Review(ReviewEvent::Exhausted {
                source_id: source_id.clone(),
            }));
        }
    }
}
