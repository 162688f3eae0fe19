//! Yes/no prompt

use async_trait::async_trait;
use serde_json::Value;

use super::{Prompt, PromptOptions, PromptRecognizer};
use crate::dialogs::error::Result;
use crate::dialogs::instance::DialogState;
use crate::dialogs::turn::TurnContext;

const YES: &[&str] = &["yes", "y", "yeah", "yep", "sure", "ok", "okay", "true", "1"];
const NO: &[&str] = &["no", "n", "nope", "nah", "false", "0"];

/// Accepts a yes or no answer, returned as a JSON boolean
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmRecognizer;

/// Interpret `text` as yes (`true`) or no (`false`)
pub fn parse_confirmation(text: &str) -> Option<bool> {
    let normalized = text
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();
    if YES.contains(&normalized.as_str()) {
        Some(true)
    } else if NO.contains(&normalized.as_str()) {
        Some(false)
    } else {
        None
    }
}

#[async_trait]
impl PromptRecognizer for ConfirmRecognizer {
    async fn on_recognize(
        &self,
        context: &TurnContext,
        _state: &mut DialogState,
        _options: &PromptOptions,
    ) -> Result<Option<Value>> {
        Ok(context
            .text()
            .and_then(parse_confirmation)
            .map(Value::Bool))
    }
}

/// Prompt for a yes/no answer
pub type ConfirmPrompt = Prompt<ConfirmRecognizer>;
