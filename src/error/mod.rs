//! # Error Module
//!
//! Error types for wallpaper selection, the exclusion store, and review.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, source ids, what went wrong
//! - **Absorb local failures** - one unreadable file or one offline source
//!   shrinks the pool, it does not abort the cycle
//! - **Surface whole-cycle failures** - never fall back to a default image

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum WallpaperError {
    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Exclusion store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to apply wallpaper: {0}")]
    Apply(String),

    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Errors that occur while fingerprinting file content
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Cannot read image file {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by image sources
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source '{source_id}' is unavailable: {reason}")]
    Unavailable { source_id: String, reason: String },

    #[error("Source '{source_id}' did not finish enumerating within {timeout:?}")]
    TimedOut { source_id: String, timeout: Duration },

    #[error("No source named '{source_id}' is configured")]
    UnknownSource { source_id: String },
}

/// Errors that end a selection cycle
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("No candidate images in any enabled source")]
    NoCandidates,

    #[error("Two distinct images are needed but only {available} distinct image(s) are available")]
    InsufficientCandidates { available: usize },

    #[error("A selection cycle is already running")]
    Busy,
}

/// Errors from the persistent exclusion store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "Blacklist at {path} is corrupt ({reason}). Restore it from a backup or remove it \
         explicitly; it was not reset so no bans are lost."
    )]
    Corrupt { path: PathBuf, reason: String },

    #[error("Blacklist I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize blacklist: {0}")]
    Serialization(String),

    #[error("Invalid fingerprint '{value}' (expected 64 hex characters)")]
    InvalidFingerprint { value: String },

    #[error("No blacklist entry has a fingerprint starting with '{prefix}'")]
    UnknownPrefix { prefix: String },

    #[error("Prefix '{prefix}' matches {matches} blacklist entries; give more characters")]
    AmbiguousPrefix { prefix: String, matches: usize },
}

/// Errors from an interactive review session
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Failed to delete {path}: {source}. The image was not blacklisted.")]
    Deletion {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No image is selected")]
    NothingSelected,

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Errors loading or writing the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the user configuration directory")]
    ConfigDirNotFound,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Failed to write config file {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, WallpaperError>;
