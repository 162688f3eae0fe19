//! Per-turn dialog stack controller
//!
//! `DialogContext` binds a [`DialogSet`] to one turn and to the conversation's
//! persisted stack. It is the only component that pushes or pops frames. Each
//! operation dispatches to the relevant dialog hook, then checks the hook's
//! [`DialogTurnResult`] against the stack before handing it back.
//!
//! Results that bubble through ancestors without a resume hook are handled by
//! a loop over the stack, so nesting depth never turns into call depth.

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::dialog::Dialog;
use super::error::{DialogError, Result};
use super::instance::DialogInstance;
use super::prompts::{Choice, PromptOptions};
use super::result::{DialogReason, DialogTurnResult};
use super::set::DialogSet;
use super::turn::TurnContext;

/// Stack controller for a single turn
pub struct DialogContext<'a> {
    dialogs: &'a DialogSet,
    context: &'a TurnContext,
    stack: &'a mut Vec<DialogInstance>,
}

impl<'a> DialogContext<'a> {
    /// Bind `dialogs` to a turn and a stack
    pub fn new(
        dialogs: &'a DialogSet,
        context: &'a TurnContext,
        stack: &'a mut Vec<DialogInstance>,
    ) -> Self {
        Self {
            dialogs,
            context,
            stack,
        }
    }

    /// The turn this context is bound to
    pub fn context(&self) -> &'a TurnContext {
        self.context
    }

    /// The dialog set this context dispatches through
    pub fn dialogs(&self) -> &'a DialogSet {
        self.dialogs
    }

    /// The stack, bottom first
    pub fn stack(&self) -> &[DialogInstance] {
        self.stack
    }

    /// Number of frames on the stack
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The active (top) frame
    pub fn active_dialog(&self) -> Option<&DialogInstance> {
        self.stack.last()
    }

    /// Mutable access to the active frame
    ///
    /// While a hook runs, the active frame is the frame of the dialog that
    /// owns the hook.
    pub fn active_dialog_mut(&mut self) -> Option<&mut DialogInstance> {
        self.stack.last_mut()
    }

    pub(crate) fn frame(&self, index: usize) -> Option<&DialogInstance> {
        self.stack.get(index)
    }

    pub(crate) fn frame_mut(&mut self, index: usize) -> Option<&mut DialogInstance> {
        self.stack.get_mut(index)
    }

    /// Push a new frame for `dialog_id` and run its begin hook
    pub async fn begin(
        &mut self,
        dialog_id: &str,
        options: Option<Value>,
    ) -> Result<DialogTurnResult> {
        let dialog = self.find(dialog_id)?;

        let depth = self.stack.len();
        self.stack.push(DialogInstance::new(dialog_id));
        debug!(dialog_id, depth = self.stack.len(), "dialog pushed");

        match dialog.begin(self, options).await {
            Ok(result) => Ok(self.verify(dialog_id, result)),
            Err(err) => {
                // Drop the half-started frame and anything it pushed
                self.stack.truncate(depth);
                debug!(dialog_id, depth, error = %err, "begin failed, frame discarded");
                Err(err)
            }
        }
    }

    /// Start a prompt dialog
    ///
    /// Accepts anything convertible into [`PromptOptions`]: prompt text, an
    /// activity, or fully built options.
    pub async fn prompt(
        &mut self,
        dialog_id: &str,
        options: impl Into<PromptOptions> + Send,
    ) -> Result<DialogTurnResult> {
        let options = serde_json::to_value(options.into())?;
        self.begin(dialog_id, Some(options)).await
    }

    /// Start a prompt dialog with a list of choices
    pub async fn prompt_with_choices(
        &mut self,
        dialog_id: &str,
        prompt: impl Into<PromptOptions> + Send,
        choices: Vec<Choice>,
    ) -> Result<DialogTurnResult> {
        let options = serde_json::to_value(prompt.into().with_choices(choices))?;
        self.begin(dialog_id, Some(options)).await
    }

    /// Deliver the user's reply to the active dialog
    ///
    /// With an empty stack this does nothing. A dialog without a continue
    /// hook is ended on its behalf.
    pub async fn continue_dialog(&mut self) -> Result<DialogTurnResult> {
        let Some(active) = self.stack.last() else {
            return Ok(DialogTurnResult::empty());
        };
        let dialog_id = active.id.clone();
        let dialog = self.find(&dialog_id)?;

        if !dialog.hooks().continue_dialog {
            debug!(dialog_id = %dialog_id, "no continue hook, ending dialog");
            return self.end(None).await;
        }

        let result = dialog.continue_dialog(self).await?;
        Ok(self.verify(&dialog_id, result))
    }

    /// Pop the active dialog and hand `result` to its parent
    ///
    /// The result bubbles past every ancestor that has no resume hook until
    /// one consumes it or the stack is empty. Calling this on an empty stack
    /// does nothing.
    pub async fn end(&mut self, result: Option<Value>) -> Result<DialogTurnResult> {
        let Some(mut popped) = self.stack.pop() else {
            return Ok(DialogTurnResult::empty());
        };

        loop {
            debug!(
                dialog_id = %popped.id,
                depth = self.stack.len(),
                reason = %DialogReason::End,
                "dialog popped"
            );
            self.notify_end(&mut popped, DialogReason::End).await?;

            let Some(parent) = self.stack.last() else {
                return Ok(DialogTurnResult::complete(result));
            };
            let parent_id = parent.id.clone();
            let dialog = self.find(&parent_id)?;

            if dialog.hooks().resume {
                let resumed = dialog.resume(self, DialogReason::End, result).await?;
                return Ok(self.verify(&parent_id, resumed));
            }

            trace!(dialog_id = %parent_id, "no resume hook, bubbling result");
            popped = match self.stack.pop() {
                Some(frame) => frame,
                None => return Ok(DialogTurnResult::complete(result)),
            };
        }
    }

    /// Swap the active dialog for a new one at the same depth
    ///
    /// The replaced dialog is told why it ended; its parent is not resumed.
    pub async fn replace(
        &mut self,
        dialog_id: &str,
        options: Option<Value>,
    ) -> Result<DialogTurnResult> {
        self.find(dialog_id)?;

        if let Some(mut popped) = self.stack.pop() {
            debug!(
                dialog_id = %popped.id,
                replacement = dialog_id,
                depth = self.stack.len(),
                reason = %DialogReason::Replace,
                "dialog popped"
            );
            self.notify_end(&mut popped, DialogReason::Replace).await?;
        }

        self.begin(dialog_id, options).await
    }

    /// Pop every frame, top to bottom, without resuming anything
    pub async fn cancel_all(&mut self) -> Result<()> {
        while let Some(mut popped) = self.stack.pop() {
            debug!(
                dialog_id = %popped.id,
                depth = self.stack.len(),
                reason = %DialogReason::Cancel,
                "dialog popped"
            );
            self.notify_end(&mut popped, DialogReason::Cancel).await?;
        }
        Ok(())
    }

    /// Ask the active dialog to repeat its question
    ///
    /// Dialogs without a reprompt hook are left untouched.
    pub async fn reprompt(&mut self) -> Result<()> {
        let Some(active) = self.stack.last() else {
            return Ok(());
        };
        let dialog = self.find(&active.id)?;
        if !dialog.hooks().reprompt {
            trace!(dialog_id = %active.id, "no reprompt hook");
            return Ok(());
        }

        let context = self.context;
        match self.stack.last_mut() {
            Some(instance) => dialog.reprompt(context, instance).await,
            None => Ok(()),
        }
    }

    fn find(&self, dialog_id: &str) -> Result<&'a dyn Dialog> {
        let dialogs: &'a DialogSet = self.dialogs;
        dialogs
            .find(dialog_id)
            .ok_or_else(|| DialogError::UnknownDialog(dialog_id.to_string()))
    }

    async fn notify_end(&self, instance: &mut DialogInstance, reason: DialogReason) -> Result<()> {
        let dialog = self.find(&instance.id)?;
        if dialog.hooks().end {
            dialog.end_dialog(self.context, instance, reason).await?;
        }
        Ok(())
    }

    fn verify(&self, dialog_id: &str, mut result: DialogTurnResult) -> DialogTurnResult {
        let specified = result.is_specified();
        let claimed_active = result.has_active();
        let claimed_result = result.has_result();
        if result.normalize(self.stack.is_empty()) {
            if specified {
                warn!(
                    dialog_id,
                    depth = self.stack.len(),
                    claimed_active,
                    claimed_result,
                    "dialog result disagreed with the stack"
                );
            } else {
                warn!(
                    dialog_id,
                    depth = self.stack.len(),
                    "dialog returned a result without hasActive"
                );
            }
        }
        result
    }
}

impl std::fmt::Debug for DialogContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogContext")
            .field("dialogs", self.dialogs)
            .field("stack", &self.stack)
            .finish()
    }
}
