//! Event type definitions for progress and completion reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the selection engine, review sessions and the cycler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-source enumeration events
    Source(SourceEvent),
    /// Selection cycle events
    Selection(SelectionEvent),
    /// Blacklist mutations
    Exclusion(ExclusionEvent),
    /// Review session events
    Review(ReviewEvent),
    /// Continuous cycling events
    Cycle(CycleEvent),
}

/// Events while a source enumerates its candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SourceEvent {
    /// Enumeration has started
    Started { source_id: String },
    /// Enumeration finished with this many non-excluded candidates
    Enumerated { source_id: String, count: usize },
    /// The source could not be used this cycle
    Unavailable { source_id: String, message: String },
}

/// Events during one selection cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectionEvent {
    /// A cycle started over this many enabled sources
    Started { sources: usize, targets: usize },
    /// A result was produced
    Completed { paths: Vec<PathBuf> },
    /// The cycle failed as a whole
    Failed { message: String },
}

/// Blacklist mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExclusionEvent {
    Added {
        fingerprint: String,
        source_id: String,
        original_name: String,
    },
    Removed {
        fingerprint: String,
    },
}

/// Events from an interactive review session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReviewEvent {
    /// A source was scanned for review
    Scanned { source_id: String, total: usize },
    /// The cursor moved
    Moved { index: usize, total: usize },
    /// An image was deleted and banned
    Rejected { path: PathBuf, fingerprint: String },
    /// Every image has been visited or removed
    Exhausted { source_id: String },
}

/// Events from the continuous cycler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleEvent {
    Started { wait_seconds: u64 },
    Applied { cycle: u64, paths: Vec<PathBuf> },
    Skipped { cycle: u64, reason: String },
    Stopped { cycles: u64 },
}
