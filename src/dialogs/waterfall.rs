//! Waterfall dialogs: an ordered sequence of steps
//!
//! Each step runs until it either waits for the user, starts a child dialog,
//! or ends the waterfall. The step cursor lives in the waterfall's own frame,
//! so the sequence survives across turns. When a child ends, or the user
//! replies, the following step runs with that result.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use super::context::DialogContext;
use super::dialog::{Dialog, DialogHooks};
use super::error::Result;
use super::prompts::{Choice, PromptOptions};
use super::result::{DialogReason, DialogTurnResult};
use super::turn::TurnContext;

const STEP_INDEX: &str = "stepIndex";
const OPTIONS: &str = "options";
const VALUES: &str = "values";

/// A single waterfall step
pub type WaterfallStepFn = Arc<
    dyn for<'s, 'd, 'a> Fn(&'s mut WaterfallStep<'d, 'a>) -> BoxFuture<'s, Result<DialogTurnResult>>
        + Send
        + Sync,
>;

/// Wrap a closure as a waterfall step
///
/// ```ignore
/// let ask_name = step_fn(|step| Box::pin(async move {
///     step.prompt("text", "What is your name?").await
/// }));
/// ```
pub fn step_fn<F>(f: F) -> WaterfallStepFn
where
    F: for<'s, 'd, 'a> Fn(&'s mut WaterfallStep<'d, 'a>) -> BoxFuture<'s, Result<DialogTurnResult>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Dialog that runs a fixed sequence of steps
pub struct Waterfall {
    steps: Vec<WaterfallStepFn>,
}

impl Waterfall {
    /// Create a waterfall from its steps
    pub fn new(steps: Vec<WaterfallStepFn>) -> Self {
        Self { steps }
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check whether the waterfall has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    async fn run_step(
        &self,
        dc: &mut DialogContext<'_>,
        index: usize,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult> {
        if index >= self.steps.len() {
            debug!(steps = self.steps.len(), "waterfall finished");
            return dc.end(result).await;
        }

        let frame = match dc.depth().checked_sub(1) {
            Some(frame) => frame,
            None => return Ok(DialogTurnResult::empty()),
        };
        let options = match dc.active_dialog_mut() {
            Some(instance) => {
                instance.state.set(STEP_INDEX, &index)?;
                instance.state.get_raw(OPTIONS).cloned()
            }
            None => None,
        };

        debug!(step = index, reason = %reason, "running waterfall step");
        let step_fn = Arc::clone(&self.steps[index]);
        let mut step = WaterfallStep {
            waterfall: self,
            dc,
            frame,
            index,
            reason,
            options,
            result,
        };
        step_fn(&mut step).await
    }
}

#[async_trait]
impl Dialog for Waterfall {
    fn hooks(&self) -> DialogHooks {
        DialogHooks::BEGIN_ONLY.with_continue().with_resume()
    }

    async fn begin(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult> {
        if let Some(instance) = dc.active_dialog_mut() {
            if let Some(options) = &options {
                instance.state.set_raw(OPTIONS, options.clone());
            }
            instance.state.set_raw(VALUES, Value::Object(Map::new()));
        }
        self.run_step(dc, 0, DialogReason::Begin, None).await
    }

    async fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult> {
        let context = dc.context();
        if !context.is_message() {
            return Ok(DialogTurnResult::end_of_turn());
        }
        let reply = context.text().map(|text| Value::String(text.to_string()));
        self.resume(dc, DialogReason::Continue, reply).await
    }

    async fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult> {
        let index = match dc.active_dialog() {
            Some(instance) => instance.state.get::<usize>(STEP_INDEX)?.unwrap_or(0),
            None => 0,
        };
        self.run_step(dc, index + 1, reason, result).await
    }
}

/// Context handed to a running waterfall step
pub struct WaterfallStep<'d, 'a> {
    waterfall: &'d Waterfall,
    dc: &'d mut DialogContext<'a>,
    frame: usize,
    index: usize,
    reason: DialogReason,
    options: Option<Value>,
    result: Option<Value>,
}

impl<'d, 'a> WaterfallStep<'d, 'a> {
    /// Position of this step in the waterfall
    pub fn index(&self) -> usize {
        self.index
    }

    /// Why this step is running
    pub fn reason(&self) -> DialogReason {
        self.reason
    }

    /// Options the waterfall was begun with
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    /// Result handed over by the previous step, child dialog or user reply
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Take ownership of the step result
    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    /// The current turn
    pub fn context(&self) -> &'a TurnContext {
        self.dc.context()
    }

    /// The underlying dialog context
    pub fn dc(&mut self) -> &mut DialogContext<'a> {
        self.dc
    }

    /// Read a value persisted by an earlier step of this waterfall
    pub fn value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = self
            .dc
            .frame(self.frame)
            .and_then(|instance| instance.state.get_raw(VALUES))
            .and_then(|values| values.get(key))
            .cloned();
        match raw {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Persist a value for later steps of this waterfall
    pub fn set_value<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        if let Some(instance) = self.dc.frame_mut(self.frame) {
            let mut values: Map<String, Value> = instance.state.get(VALUES)?.unwrap_or_default();
            values.insert(key.to_string(), value);
            instance.state.set_raw(VALUES, Value::Object(values));
        }
        Ok(())
    }

    /// All values persisted by this waterfall
    pub fn values(&self) -> Map<String, Value> {
        self.dc
            .frame(self.frame)
            .and_then(|instance| instance.state.get_raw(VALUES))
            .and_then(|values| values.as_object().cloned())
            .unwrap_or_default()
    }

    /// Run the following step right away, handing it `result`
    pub async fn next(&mut self, result: Option<Value>) -> Result<DialogTurnResult> {
        self.waterfall
            .run_step(self.dc, self.index + 1, DialogReason::Next, result)
            .await
    }

    /// Start a child dialog; its result feeds the following step
    pub async fn begin(&mut self, dialog_id: &str, options: Option<Value>) -> Result<DialogTurnResult> {
        self.dc.begin(dialog_id, options).await
    }

    /// Start a prompt; the recognized value feeds the following step
    pub async fn prompt(
        &mut self,
        dialog_id: &str,
        options: impl Into<PromptOptions> + Send,
    ) -> Result<DialogTurnResult> {
        self.dc.prompt(dialog_id, options).await
    }

    /// Start a choice prompt
    pub async fn prompt_with_choices(
        &mut self,
        dialog_id: &str,
        prompt: impl Into<PromptOptions> + Send,
        choices: Vec<Choice>,
    ) -> Result<DialogTurnResult> {
        self.dc.prompt_with_choices(dialog_id, prompt, choices).await
    }

    /// Replace the waterfall with another dialog
    pub async fn replace(&mut self, dialog_id: &str, options: Option<Value>) -> Result<DialogTurnResult> {
        self.dc.replace(dialog_id, options).await
    }

    /// End the waterfall, returning `result` to its parent
    pub async fn end(&mut self, result: Option<Value>) -> Result<DialogTurnResult> {
        self.dc.end(result).await
    }

    /// Send a text message
    pub async fn send_text(&self, text: impl Into<String> + Send) -> Result<()> {
        self.dc.context().send_text(text).await
    }

    /// Wait for the user's next message, which feeds the following step
    pub fn end_of_turn(&self) -> Result<DialogTurnResult> {
        Ok(DialogTurnResult::end_of_turn())
    }
}
