//! Prompts: dialogs that ask one question and wait for a usable answer
//!
//! A [`Prompt`] sends its question on begin, then on every reply runs its
//! recognizer and, if that yields a value, the optional validator. A value
//! that survives both ends the prompt with that value. Anything else sends
//! the retry prompt and keeps waiting. There is no attempt limit.
//!
//! Recognizers return `Ok(None)` for "not recognized"; any `Some` value,
//! including `0`, `false` or an empty string, counts as recognized.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::context::DialogContext;
use super::dialog::{Dialog, DialogHooks};
use super::error::Result;
use super::instance::{DialogInstance, DialogState};
use super::result::{DialogReason, DialogTurnResult};
use super::turn::TurnContext;

pub mod choice;
pub mod confirm;
pub mod number;
pub mod options;
pub mod text;

pub use choice::{ChoicePrompt, ChoiceRecognizer};
pub use confirm::{ConfirmPrompt, ConfirmRecognizer};
pub use number::{NumberPrompt, NumberRecognizer};
pub use options::{Choice, FoundChoice, PromptOptions, choices_from};
pub use text::{TextPrompt, TextRecognizer};

const OPTIONS: &str = "options";
const ATTEMPTS: &str = "attempts";

/// The prompt-specific half of a [`Prompt`]
#[async_trait]
pub trait PromptRecognizer: Send + Sync {
    /// Send the question, or the retry question when `is_retry` is set
    async fn on_prompt(
        &self,
        context: &TurnContext,
        _state: &mut DialogState,
        options: &PromptOptions,
        is_retry: bool,
    ) -> Result<()> {
        send_prompt(context, options, is_retry).await
    }

    /// Try to extract a value from the inbound activity
    async fn on_recognize(
        &self,
        context: &TurnContext,
        state: &mut DialogState,
        options: &PromptOptions,
    ) -> Result<Option<Value>>;
}

/// Send the prompt or retry prompt activity from `options`, if there is one
pub async fn send_prompt(
    context: &TurnContext,
    options: &PromptOptions,
    is_retry: bool,
) -> Result<()> {
    match options.activity_for(is_retry) {
        Some(activity) => context.send_activity(activity.clone()).await,
        None => Ok(()),
    }
}

/// Second opinion on a recognized value
///
/// Returning `Ok(None)` rejects the value, whether or not the validator sent
/// a message of its own. Returning `Ok(Some(v))` accepts `v`, which may
/// differ from the recognized value.
#[async_trait]
pub trait PromptValidator: Send + Sync {
    /// Accept, transform or reject a recognized value
    async fn validate(&self, context: &TurnContext, value: Value) -> Result<Option<Value>>;
}

/// Validator backed by a synchronous closure
pub struct FnValidator<F> {
    f: F,
}

/// Wrap a closure as a validator
pub fn validator_fn<F>(f: F) -> FnValidator<F>
where
    F: Fn(&Value) -> Option<Value> + Send + Sync,
{
    FnValidator { f }
}

#[async_trait]
impl<F> PromptValidator for FnValidator<F>
where
    F: Fn(&Value) -> Option<Value> + Send + Sync,
{
    async fn validate(&self, _context: &TurnContext, value: Value) -> Result<Option<Value>> {
        Ok((self.f)(&value))
    }
}

/// A dialog that asks until it gets an acceptable answer
pub struct Prompt<R> {
    recognizer: R,
    validator: Option<Box<dyn PromptValidator>>,
}

impl<R: PromptRecognizer> Prompt<R> {
    /// Create a prompt around a recognizer
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            validator: None,
        }
    }

    /// Attach a validator
    pub fn with_validator(mut self, validator: impl PromptValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// The recognizer
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    async fn ask(&self, context: &TurnContext, instance: &mut DialogInstance, is_retry: bool) -> Result<()> {
        let options: PromptOptions = instance.state.get(OPTIONS)?.unwrap_or_default();
        self.recognizer
            .on_prompt(context, &mut instance.state, &options, is_retry)
            .await
    }

    async fn validate(&self, context: &TurnContext, recognized: Option<Value>) -> Result<Option<Value>> {
        match (recognized, &self.validator) {
            (Some(value), Some(validator)) => validator.validate(context, value).await,
            (recognized, None) => Ok(recognized),
            (None, Some(_)) => Ok(None),
        }
    }
}

impl<R: PromptRecognizer + Default> Default for Prompt<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

#[async_trait]
impl<R: PromptRecognizer + 'static> Dialog for Prompt<R> {
    fn hooks(&self) -> DialogHooks {
        DialogHooks::BEGIN_ONLY
            .with_continue()
            .with_resume()
            .with_reprompt()
    }

    async fn begin(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult> {
        let options = PromptOptions::from_args(options)?;
        let context = dc.context();
        if let Some(instance) = dc.active_dialog_mut() {
            instance.state.set(OPTIONS, &options)?;
            instance.state.set(ATTEMPTS, &0u32)?;
            self.recognizer
                .on_prompt(context, &mut instance.state, &options, false)
                .await?;
        }
        Ok(DialogTurnResult::end_of_turn())
    }

    async fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult> {
        let context = dc.context();
        if !context.is_message() {
            return Ok(DialogTurnResult::end_of_turn());
        }

        let recognized = match dc.active_dialog_mut() {
            Some(instance) => {
                let attempts = instance.state.get::<u32>(ATTEMPTS)?.unwrap_or(0) + 1;
                instance.state.set(ATTEMPTS, &attempts)?;
                let options: PromptOptions = instance.state.get(OPTIONS)?.unwrap_or_default();
                let recognized = self
                    .recognizer
                    .on_recognize(context, &mut instance.state, &options)
                    .await?;
                debug!(attempts, recognized = recognized.is_some(), "prompt reply recognized");
                recognized
            }
            None => return Ok(DialogTurnResult::empty()),
        };

        match self.validate(context, recognized).await? {
            Some(value) => dc.end(Some(value)).await,
            None => {
                if let Some(instance) = dc.active_dialog_mut() {
                    self.ask(context, instance, true).await?;
                }
                Ok(DialogTurnResult::end_of_turn())
            }
        }
    }

    async fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        _result: Option<Value>,
    ) -> Result<DialogTurnResult> {
        // Something was pushed on top of this prompt and has ended; its
        // result is not an answer to our question.
        debug!(reason = %reason, "prompt resumed, asking again");
        let context = dc.context();
        if let Some(instance) = dc.active_dialog_mut() {
            self.ask(context, instance, false).await?;
        }
        Ok(DialogTurnResult::end_of_turn())
    }

    async fn reprompt(&self, context: &TurnContext, instance: &mut DialogInstance) -> Result<()> {
        self.ask(context, instance, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogs::set::DialogSet;
    use crate::dialogs::turn::{Activity, ActivityType, RecordingSender};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct Exact;

    #[async_trait]
    impl PromptRecognizer for Exact {
        async fn on_recognize(
            &self,
            context: &TurnContext,
            _state: &mut DialogState,
            _options: &PromptOptions,
        ) -> Result<Option<Value>> {
            Ok(match context.text() {
                Some("zero") => Some(json!(0)),
                Some("nothing") => None,
                Some(other) => Some(json!(other)),
                None => None,
            })
        }
    }

    #[tokio::test]
    async fn test_attempts_are_counted_in_frame_state() {
        let mut set = DialogSet::new();
        set.add("exact", Prompt::<Exact>::default()).unwrap();
        let sender = Arc::new(RecordingSender::new());
        let mut stack = Vec::new();

        let ctx = TurnContext::new("t", Activity::message("go"), sender.clone());
        DialogContext::new(&set, &ctx, &mut stack)
            .prompt("exact", PromptOptions::new("Say something").with_retry_prompt("Again?"))
            .await
            .unwrap();

        for _ in 0..2 {
            let ctx = TurnContext::new("t", Activity::message("nothing"), sender.clone());
            let result = DialogContext::new(&set, &ctx, &mut stack)
                .continue_dialog()
                .await
                .unwrap();
            assert!(result.has_active());
        }

        assert_eq!(stack[0].state.get::<u32>(ATTEMPTS).unwrap(), Some(2));
        assert_eq!(sender.texts(), vec!["Say something", "Again?", "Again?"]);
    }

    #[tokio::test]
    async fn test_non_message_is_not_an_attempt() {
        let mut set = DialogSet::new();
        set.add("exact", Prompt::<Exact>::default()).unwrap();
        let sender = Arc::new(RecordingSender::new());
        let mut stack = Vec::new();

        let ctx = TurnContext::new("t", Activity::message("go"), sender.clone());
        DialogContext::new(&set, &ctx, &mut stack)
            .prompt("exact", "Say something")
            .await
            .unwrap();

        let ctx = TurnContext::new("t", Activity::new(ActivityType::Event), sender.clone());
        let result = DialogContext::new(&set, &ctx, &mut stack)
            .continue_dialog()
            .await
            .unwrap();

        assert!(result.has_active());
        assert_eq!(stack[0].state.get::<u32>(ATTEMPTS).unwrap(), Some(0));
        assert_eq!(sender.texts(), vec!["Say something"]);
    }

    #[tokio::test]
    async fn test_falsy_value_is_recognized() {
        let mut set = DialogSet::new();
        set.add("exact", Prompt::<Exact>::default()).unwrap();
        let sender = Arc::new(RecordingSender::new());
        let mut stack = Vec::new();

        let ctx = TurnContext::new("t", Activity::message("go"), sender.clone());
        DialogContext::new(&set, &ctx, &mut stack)
            .prompt("exact", "Count?")
            .await
            .unwrap();

        let ctx = TurnContext::new("t", Activity::message("zero"), sender.clone());
        let result = DialogContext::new(&set, &ctx, &mut stack)
            .continue_dialog()
            .await
            .unwrap();

        assert_eq!(result, DialogTurnResult::complete(Some(json!(0))));
        assert!(stack.is_empty());
    }
}
