//! # Events Module
//!
//! Event-driven progress and completion reporting.
//!
//! ## Design
//! Selection cycles may block on disk walks and network sources, so they run
//! on a worker thread. The engine emits events through a channel and any UI
//! (CLI, GUI, tray icon) subscribes on its own thread.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Selection(SelectionEvent::Completed { paths }) = event {
//!             println!("Picked {:?}", paths);
//!         }
//!     }
//! });
//!
//! engine.select_with_events(TargetMode::Dual, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
