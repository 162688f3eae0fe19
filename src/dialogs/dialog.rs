//! The dialog contract
//!
//! A dialog is a unit of conversational behavior. `begin` is mandatory; the
//! other hooks are optional and their presence is declared up front through
//! [`DialogHooks`] rather than discovered at runtime. When a hook is absent
//! the engine substitutes its fallback:
//!
//! | hook              | fallback when absent                         |
//! |-------------------|----------------------------------------------|
//! | `continue_dialog` | the dialog is ended with no result           |
//! | `resume`          | the result bubbles to the next ancestor      |
//! | `reprompt`        | nothing happens                              |
//! | `end_dialog`      | nothing happens                              |

use async_trait::async_trait;
use serde_json::Value;

use super::context::DialogContext;
use super::error::Result;
use super::instance::DialogInstance;
use super::result::{DialogReason, DialogTurnResult};
use super::turn::TurnContext;

/// Optional hooks a dialog implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogHooks {
    /// `continue_dialog` is implemented
    pub continue_dialog: bool,
    /// `resume` is implemented
    pub resume: bool,
    /// `reprompt` is implemented
    pub reprompt: bool,
    /// `end_dialog` is implemented
    pub end: bool,
}

impl DialogHooks {
    /// Only `begin` is implemented
    pub const BEGIN_ONLY: Self = Self {
        continue_dialog: false,
        resume: false,
        reprompt: false,
        end: false,
    };

    /// Every hook is implemented
    pub const ALL: Self = Self {
        continue_dialog: true,
        resume: true,
        reprompt: true,
        end: true,
    };

    /// Declare `continue_dialog`
    pub const fn with_continue(mut self) -> Self {
        self.continue_dialog = true;
        self
    }

    /// Declare `resume`
    pub const fn with_resume(mut self) -> Self {
        self.resume = true;
        self
    }

    /// Declare `reprompt`
    pub const fn with_reprompt(mut self) -> Self {
        self.reprompt = true;
        self
    }

    /// Declare `end_dialog`
    pub const fn with_end(mut self) -> Self {
        self.end = true;
        self
    }
}

/// A unit of conversational behavior registered in a [`DialogSet`](super::set::DialogSet)
///
/// Hooks only ever touch their own frame, reachable through
/// [`DialogContext::active_dialog_mut`] while the hook runs. The stack itself
/// is changed exclusively through the context's operations.
#[async_trait]
pub trait Dialog: Send + Sync {
    /// Which optional hooks this dialog implements
    fn hooks(&self) -> DialogHooks {
        DialogHooks::BEGIN_ONLY
    }

    /// Called right after a fresh frame for this dialog was pushed
    async fn begin(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult>;

    /// Called when the user replies while this dialog is active
    ///
    /// The context only calls this when [`DialogHooks::continue_dialog`] is
    /// declared. The default body ends the dialog, matching what the context
    /// does for dialogs without the hook, for callers invoking it directly.
    async fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult> {
        dc.end(None).await
    }

    /// Called when a dialog this one started has ended
    ///
    /// The context only calls this when [`DialogHooks::resume`] is declared.
    /// The default body ends this dialog with the child's result, the same
    /// bubbling the context applies to dialogs without the hook.
    async fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult> {
        dc.end(result).await
    }

    /// Called when the host asks the active dialog to re-ask its question
    async fn reprompt(&self, _context: &TurnContext, _instance: &mut DialogInstance) -> Result<()> {
        Ok(())
    }

    /// Called after this dialog's frame was popped, for cleanup only
    async fn end_dialog(
        &self,
        _context: &TurnContext,
        _instance: &mut DialogInstance,
        _reason: DialogReason,
    ) -> Result<()> {
        Ok(())
    }
}
