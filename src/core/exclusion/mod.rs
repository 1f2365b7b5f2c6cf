//! # Exclusion Module
//!
//! The permanent blacklist of rejected images.
//!
//! ## Features
//! - Keyed by content fingerprint, so bans survive renames and moves
//! - Persisted as a JSON document after every mutation
//! - Crash-safe writes (temp file in the same directory, then atomic rename)
//! - Refuses to start over a corrupt file instead of silently un-banning
//!
//! ## Backing format
//! ```json
//! {
//!   "version": 1,
//!   "entries": [
//!     {
//!       "fingerprint": "ba7816bf...",
//!       "excluded_at": "2024-05-01T18:22:03.120Z",
//!       "source_id": "wallhaven",
//!       "original_name": "wallhaven-7p39gy.jpg"
//!     }
//!   ]
//! }
//! ```

mod store;
mod types;

pub use store::ExclusionStore;
pub use types::{ExclusionEntry, DOCUMENT_VERSION};
