//! Pick-one-of-several prompt

use async_trait::async_trait;
use serde_json::Value;

use super::{Choice, FoundChoice, Prompt, PromptOptions, PromptRecognizer};
use crate::dialogs::error::Result;
use crate::dialogs::instance::DialogState;
use crate::dialogs::turn::{Activity, TurnContext};

/// Accepts a choice by value, synonym or 1-based position
///
/// The question is sent with the choices listed after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceRecognizer;

/// Find the choice `text` refers to
pub fn find_choice(text: &str, choices: &[Choice]) -> Option<FoundChoice> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Ok(position) = needle.parse::<usize>() {
        if position >= 1 && position <= choices.len() {
            let index = position - 1;
            return Some(FoundChoice {
                value: choices[index].value.clone(),
                index,
            });
        }
    }

    choices
        .iter()
        .enumerate()
        .find(|(_, choice)| {
            choice.value.to_lowercase() == needle
                || choice
                    .synonyms
                    .iter()
                    .any(|synonym| synonym.to_lowercase() == needle)
        })
        .map(|(index, choice)| FoundChoice {
            value: choice.value.clone(),
            index,
        })
}

fn with_choice_list(activity: &Activity, choices: &[Choice]) -> Activity {
    let list = choices
        .iter()
        .enumerate()
        .map(|(index, choice)| format!("({}) {}", index + 1, choice.value))
        .collect::<Vec<_>>()
        .join(", ");

    let mut activity = activity.clone();
    activity.text = Some(match activity.text.take() {
        Some(text) if !text.is_empty() => format!("{text} {list}"),
        _ => list,
    });
    activity
}

#[async_trait]
impl PromptRecognizer for ChoiceRecognizer {
    async fn on_prompt(
        &self,
        context: &TurnContext,
        _state: &mut DialogState,
        options: &PromptOptions,
        is_retry: bool,
    ) -> Result<()> {
        let Some(activity) = options.activity_for(is_retry) else {
            return Ok(());
        };
        let choices = options.choices.as_deref().unwrap_or_default();
        if choices.is_empty() {
            return context.send_activity(activity.clone()).await;
        }
        context.send_activity(with_choice_list(activity, choices)).await
    }

    async fn on_recognize(
        &self,
        context: &TurnContext,
        _state: &mut DialogState,
        options: &PromptOptions,
    ) -> Result<Option<Value>> {
        let choices = options.choices.as_deref().unwrap_or_default();
        let found = context.text().and_then(|text| find_choice(text, choices));
        Ok(match found {
            Some(found) => Some(serde_json::to_value(found)?),
            None => None,
        })
    }
}

/// Prompt for one of several choices
pub type ChoicePrompt = Prompt<ChoiceRecognizer>;
