//! # Source Module
//!
//! Pluggable providers of candidate wallpapers.
//!
//! Every source, whether a local folder, a download folder filled by a
//! network plugin, or an AI generator's output directory, implements
//! [`SourceAdapter`]. Adapters yield only candidates whose content is not
//! blacklisted; the selection engine never sees excluded images.
//!
//! ## Supported Formats
//! JPEG, PNG, WebP, GIF, BMP, TIFF, HEIC/HEIF, AVIF
//!
//! ## Example
//! ```rust,ignore
//! let source = LocalSource::new("photos", "/home/me/Pictures", store, fingerprints)
//!     .recursive(true);
//! for candidate in source.enumerate()? {
//!     println!("{}", candidate.path.display());
//! }
//! ```

mod filter;
mod local;
mod registry;

pub use filter::ImageFilter;
pub use local::LocalSource;
pub use registry::SourceRegistry;

use crate::error::SourceError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One image a source could offer this cycle.
///
/// Candidates are value objects re-derived on every enumeration; the path
/// may differ between enumerations if the file was moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Current filesystem location
    pub path: PathBuf,
    /// Id of the adapter that produced it
    pub source_id: String,
    /// File size in bytes, when cheaply known
    pub size_hint: Option<u64>,
}

impl ImageCandidate {
    pub fn new(path: impl Into<PathBuf>, source_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source_id: source_id.into(),
            size_hint: None,
        }
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    /// File name for display
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Lazy, finite sequence of candidates
pub type CandidateIter<'a> = Box<dyn Iterator<Item = ImageCandidate> + Send + 'a>;

/// Capability every image source implements.
///
/// `enumerate` may block on disk or network I/O and is not expected to
/// return the same sequence twice. Failures to reach the source at all are
/// reported as [`SourceError::Unavailable`]; problems with individual files
/// are absorbed by skipping them.
pub trait SourceAdapter: Send + Sync {
    /// Stable id of this source
    fn identity(&self) -> &str;

    /// Candidates not currently blacklisted, in adapter-defined order
    fn enumerate(&self) -> Result<CandidateIter<'_>, SourceError>;
}
