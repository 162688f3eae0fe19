//! Free-text prompt

use async_trait::async_trait;
use serde_json::Value;

use super::{Prompt, PromptOptions, PromptRecognizer};
use crate::dialogs::error::Result;
use crate::dialogs::instance::DialogState;
use crate::dialogs::turn::TurnContext;

/// Accepts any message with non-blank text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRecognizer;

#[async_trait]
impl PromptRecognizer for TextRecognizer {
    async fn on_recognize(
        &self,
        context: &TurnContext,
        _state: &mut DialogState,
        _options: &PromptOptions,
    ) -> Result<Option<Value>> {
        Ok(context
            .text()
            .filter(|text| !text.trim().is_empty())
            .map(|text| Value::String(text.to_string())))
    }
}

/// Prompt for free text
pub type TextPrompt = Prompt<TextRecognizer>;
