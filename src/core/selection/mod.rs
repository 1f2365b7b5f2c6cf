//! # Selection Module
//!
//! Fair two-stage random selection across sources.
//!
//! ## Stages
//! 1. **Source** - pick uniformly among sources with at least one candidate
//! 2. **Item** - pick uniformly within the chosen source's pool
//!
//! Flattening every source into one pool would let a folder of 10,000
//! images drown out a folder of 10. Picking the source first gives every
//! non-empty source the same chance regardless of size.
//!
//! ## Dual Target
//! Desktop and lock screen get two images with different content
//! fingerprints, drawn from one shared enumeration pass. When only one
//! distinct image exists the cycle fails instead of repeating it.

mod engine;
mod picker;

pub use crate::config::TargetMode;
pub use engine::SelectionEngine;
pub use picker::{pick_distinct_pair, pick_one};

use crate::core::source::ImageCandidate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Non-excluded candidates one source offered this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePool {
    pub source_id: String,
    pub candidates: Vec<ImageCandidate>,
}

impl SourcePool {
    pub fn new(source_id: impl Into<String>, candidates: Vec<ImageCandidate>) -> Self {
        Self {
            source_id: source_id.into(),
            candidates,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// What a selection cycle hands to the wallpaper setter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    /// Desktop image, or the only image in single-target mode
    pub primary: ImageCandidate,
    /// Lock screen image in dual-target mode; content always differs from `primary`
    pub secondary: Option<ImageCandidate>,
}

impl SelectionResult {
    pub fn single(candidate: ImageCandidate) -> Self {
        Self {
            primary: candidate,
            secondary: None,
        }
    }

    pub fn pair(primary: ImageCandidate, secondary: ImageCandidate) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }

    pub fn is_dual(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn candidates(&self) -> impl Iterator<Item = &ImageCandidate> {
        std::iter::once(&self.primary).chain(self.secondary.as_ref())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.candidates().map(|c| c.path.clone()).collect()
    }
}
