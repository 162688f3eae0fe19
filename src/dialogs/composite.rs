//! Composite controls: a dialog whose body is its own dialog set
//!
//! The composite keeps an inner stack in its frame state under
//! `dialogStack` and drives it through an inner [`DialogContext`] bound to
//! the same turn. To the parent stack it looks like any other dialog: it
//! stays active while the inner stack has an active dialog and ends with the
//! inner stack's result once that stack empties.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::context::DialogContext;
use super::dialog::{Dialog, DialogHooks};
use super::error::Result;
use super::instance::{DialogInstance, DialogState};
use super::result::{DialogReason, DialogTurnResult};
use super::set::DialogSet;
use super::turn::TurnContext;

const DIALOG_STACK: &str = "dialogStack";

/// Reusable multi-dialog control
pub struct CompositeControl {
    dialogs: DialogSet,
    initial_dialog_id: String,
}

impl CompositeControl {
    /// Create a control that starts `initial_dialog_id` from `dialogs`
    pub fn new(initial_dialog_id: impl Into<String>, dialogs: DialogSet) -> Self {
        Self {
            dialogs,
            initial_dialog_id: initial_dialog_id.into(),
        }
    }

    /// The inner dialog set
    pub fn dialogs(&self) -> &DialogSet {
        &self.dialogs
    }

    /// Id of the dialog started on begin
    pub fn initial_dialog_id(&self) -> &str {
        &self.initial_dialog_id
    }

    fn load_stack(state: &DialogState) -> Result<Vec<DialogInstance>> {
        Ok(state.get(DIALOG_STACK)?.unwrap_or_default())
    }

    fn store_stack(state: &mut DialogState, stack: &[DialogInstance]) -> Result<()> {
        state.set(DIALOG_STACK, stack)
    }

    async fn settle(
        &self,
        dc: &mut DialogContext<'_>,
        inner: Vec<DialogInstance>,
        result: DialogTurnResult,
    ) -> Result<DialogTurnResult> {
        if result.has_active() {
            if let Some(instance) = dc.active_dialog_mut() {
                Self::store_stack(&mut instance.state, &inner)?;
            }
            return Ok(DialogTurnResult::end_of_turn());
        }

        debug!(
            initial = %self.initial_dialog_id,
            has_result = result.has_result(),
            "inner stack finished"
        );
        dc.end(result.into_result()).await
    }
}

#[async_trait]
impl Dialog for CompositeControl {
    fn hooks(&self) -> DialogHooks {
        DialogHooks::ALL
    }

    async fn begin(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult> {
        let context = dc.context();
        let mut inner = Vec::new();
        let result = DialogContext::new(&self.dialogs, context, &mut inner)
            .begin(&self.initial_dialog_id, options)
            .await?;
        self.settle(dc, inner, result).await
    }

    async fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult> {
        let context = dc.context();
        let mut inner = match dc.active_dialog() {
            Some(instance) => Self::load_stack(&instance.state)?,
            None => return Ok(DialogTurnResult::empty()),
        };
        let result = DialogContext::new(&self.dialogs, context, &mut inner)
            .continue_dialog()
            .await?;
        self.settle(dc, inner, result).await
    }

    async fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        _result: Option<Value>,
    ) -> Result<DialogTurnResult> {
        // A dialog pushed on top of this control by the parent has ended; the
        // inner stack is unchanged, so ask its active dialog to re-ask.
        debug!(reason = %reason, "composite resumed, reprompting inner stack");
        let context = dc.context();
        if let Some(instance) = dc.active_dialog_mut() {
            self.reprompt(context, instance).await?;
        }
        Ok(DialogTurnResult::end_of_turn())
    }

    async fn reprompt(&self, context: &TurnContext, instance: &mut DialogInstance) -> Result<()> {
        let mut inner = Self::load_stack(&instance.state)?;
        DialogContext::new(&self.dialogs, context, &mut inner)
            .reprompt()
            .await?;
        Self::store_stack(&mut instance.state, &inner)
    }

    async fn end_dialog(
        &self,
        context: &TurnContext,
        instance: &mut DialogInstance,
        reason: DialogReason,
    ) -> Result<()> {
        if !matches!(reason, DialogReason::Cancel | DialogReason::Replace) {
            return Ok(());
        }
        let mut inner = Self::load_stack(&instance.state)?;
        if inner.is_empty() {
            return Ok(());
        }
        DialogContext::new(&self.dialogs, context, &mut inner)
            .cancel_all()
            .await?;
        Self::store_stack(&mut instance.state, &inner)
    }
}
