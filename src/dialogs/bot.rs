//! Host driver: one call per inbound activity
//!
//! [`DialogBot`] owns the dialog set and a [`StateStore`]. For each turn it
//! loads the conversation's stack, continues the active dialog, starts the
//! root dialog when nothing is running and nothing was said, and saves the
//! stack again.

use tracing::{debug, info};

use super::error::{DialogError, Result};
use super::instance::DialogStackState;
use super::result::DialogTurnResult;
use super::set::DialogSet;
use super::storage::StateStore;
use super::turn::TurnContext;

/// Dialog host bound to a state store
pub struct DialogBot<S> {
    dialogs: DialogSet,
    store: S,
    root_dialog: String,
}

impl<S: StateStore> DialogBot<S> {
    /// Create a bot that starts `root_dialog` for new conversations
    ///
    /// Fails when `root_dialog` is not registered in `dialogs`.
    pub fn new(dialogs: DialogSet, store: S, root_dialog: impl Into<String>) -> Result<Self> {
        let root_dialog = root_dialog.into();
        if !dialogs.contains(&root_dialog) {
            return Err(DialogError::UnknownDialog(root_dialog));
        }
        Ok(Self {
            dialogs,
            store,
            root_dialog,
        })
    }

    /// The registered dialogs
    pub fn dialogs(&self) -> &DialogSet {
        &self.dialogs
    }

    /// The state store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Id of the dialog started for idle conversations
    pub fn root_dialog(&self) -> &str {
        &self.root_dialog
    }

    /// Load the persisted stack for a conversation
    pub async fn load(&self, conversation_id: &str) -> Result<DialogStackState> {
        Ok(self.store.read(conversation_id).await?.unwrap_or_default())
    }

    /// Forget a conversation's stack
    pub async fn reset(&self, conversation_id: &str) -> Result<()> {
        info!(conversation_id, "conversation reset");
        self.store.delete(conversation_id).await
    }

    /// Process one inbound activity
    ///
    /// The stack is saved even when the turn leaves it unchanged. If a dialog
    /// fails, the error propagates and nothing is saved.
    pub async fn on_turn(&self, context: &TurnContext) -> Result<DialogTurnResult> {
        let conversation_id = context.conversation_id();
        let mut state = self.load(conversation_id).await?;
        debug!(
            conversation_id,
            depth = state.depth(),
            activity_type = %context.activity().activity_type.as_str(),
            "turn started"
        );

        let mut dc = self.dialogs.create_context(context, &mut state);
        let mut result = dc.continue_dialog().await?;
        if context.is_message() && !context.responded() && !result.has_active() {
            debug!(conversation_id, root = %self.root_dialog, "starting root dialog");
            result = dc.begin(&self.root_dialog, None).await?;
        }

        self.store.write(conversation_id, &state).await?;
        debug!(
            conversation_id,
            depth = state.depth(),
            has_active = result.has_active(),
            "turn finished"
        );
        Ok(result)
    }
}

impl<S> std::fmt::Debug for DialogBot<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogBot")
            .field("dialogs", &self.dialogs)
            .field("root_dialog", &self.root_dialog)
            .finish_non_exhaustive()
    }
}
