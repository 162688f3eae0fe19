//! Dialog engine
//!
//! Conversations are modeled as a stack of dialog frames persisted between
//! turns. Every turn rehydrates the stack, lets the active dialog react to
//! the inbound activity, and saves the stack again.

pub mod bot;
pub mod composite;
pub mod context;
pub mod dialog;
pub mod error;
pub mod instance;
pub mod prompts;
pub mod result;
pub mod set;
pub mod storage;
pub mod turn;
pub mod waterfall;

pub use bot::DialogBot;
pub use composite::CompositeControl;
pub use context::DialogContext;
pub use dialog::{Dialog, DialogHooks};
pub use error::{DialogError, Result, StorageError};
pub use instance::{DialogInstance, DialogStackState, DialogState};
pub use result::{DialogReason, DialogTurnResult};
pub use set::DialogSet;
pub use storage::{FileStorage, MemoryStorage, StateStore};
pub use turn::{Activity, ActivitySender, ActivityType, RecordingSender, TurnContext};
pub use waterfall::{Waterfall, WaterfallStep, WaterfallStepFn, step_fn};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory for persisted state
    pub root: PathBuf,

    /// Dialog started when a conversation has nothing active
    pub root_dialog: String,

    /// Conversation used by single-user hosts
    pub conversation_id: String,

    /// Enable debug logging
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".dialogs"),
            root_dialog: "main".to_string(),
            conversation_id: "console".to_string(),
            debug: false,
        }
    }
}
