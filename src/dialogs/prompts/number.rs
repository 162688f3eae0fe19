//! Numeric prompt

use async_trait::async_trait;
use serde_json::{Number, Value};

use super::{Prompt, PromptOptions, PromptRecognizer};
use crate::dialogs::error::Result;
use crate::dialogs::instance::DialogState;
use crate::dialogs::turn::TurnContext;

/// Accepts a plain decimal number
///
/// Integers are returned as JSON integers, everything else as a float.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberRecognizer;

/// Parse `text` as a number
pub fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(integer) = text.parse::<i64>() {
        return Some(Value::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

#[async_trait]
impl PromptRecognizer for NumberRecognizer {
    async fn on_recognize(
        &self,
        context: &TurnContext,
        _state: &mut DialogState,
        _options: &PromptOptions,
    ) -> Result<Option<Value>> {
        Ok(context.text().and_then(parse_number))
    }
}

/// Prompt for a number
pub type NumberPrompt = Prompt<NumberRecognizer>;
