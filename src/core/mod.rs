//! # Core Module
//!
//! The GUI-agnostic wallpaper engine.
//!
//! ## Modules
//! - `fingerprint` - Content identity for image files
//! - `exclusion` - The persistent blacklist of banned fingerprints
//! - `source` - Pluggable image providers
//! - `selection` - Fair two-stage random selection
//! - `review` - Interactive pruning of a source
//! - `cycle` - Timed rotation through a wallpaper sink

pub mod cycle;
pub mod exclusion;
pub mod fingerprint;
pub mod review;
pub mod selection;
pub mod source;

// Re-export commonly used types
pub use cycle::{CancellationToken, Cycler, WallpaperSink};
pub use exclusion::{ExclusionEntry, ExclusionStore};
pub use fingerprint::{ContentFingerprint, FingerprintCache};
pub use review::{Direction, ReviewSession, ReviewState};
pub use selection::{SelectionEngine, SelectionResult, SourcePool};
pub use source::{ImageCandidate, LocalSource, SourceAdapter, SourceRegistry};
