//! Dialog Stack – a turn-based conversational dialog engine
//!
//! This crate implements multi-turn conversations as a persisted stack of
//! dialogs:
//! - Dialogs begin, continue, resume and end as frames on a per-conversation stack
//! - Results bubble from a finished child to its parent on the same turn
//! - Waterfalls, prompts and composite controls built on the same primitives
//! - Pluggable state stores with in-memory and file-backed implementations

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Dialog engine modules
pub mod dialogs;

// Re-export key types for convenience
pub use dialogs::{DialogBot, DialogContext, DialogSet, EngineConfig};

/// Current version of the dialog engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the persisted conversation state format
pub const STATE_FORMAT_VERSION: u32 = 1;
