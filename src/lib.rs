//! # Clockwork Orange
//!
//! A wallpaper rotator that draws fairly from many image sources and
//! never shows an image you have banned.
//!
//! ## Core Philosophy
//! - **Fair across sources** - a folder of ten images gets picked as often as
//!   a folder of ten thousand
//! - **Bans follow content** - a banned image stays banned after a rename,
//!   move or re-download
//! - **Never lose bans** - a damaged blacklist stops the program instead of
//!   silently starting over
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - Sources, selection, blacklist, review and cycling
//! - `config` - TOML configuration
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, WallpaperError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    init_tracing_with_default("warn");
}

/// Initialize tracing, using `default_directive` when `RUST_LOG` is unset
pub fn init_tracing_with_default(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
