//! Prompt options and choices

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dialogs::error::{DialogError, Result};
use crate::dialogs::turn::Activity;

/// What a prompt should say and accept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOptions {
    /// Initial question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Activity>,

    /// Sent instead of `prompt` after a failed attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_prompt: Option<Activity>,

    /// Choices offered by choice prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,

    /// Validator-specific settings
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PromptOptions {
    /// Options with just an initial question
    pub fn new(prompt: impl Into<Activity>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }

    /// Set the retry prompt
    pub fn with_retry_prompt(mut self, retry_prompt: impl Into<Activity>) -> Self {
        self.retry_prompt = Some(retry_prompt.into());
        self
    }

    /// Set the choices
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = Some(choices);
        self
    }

    /// Attach a validator-specific setting
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Normalize begin arguments into prompt options
    ///
    /// Accepts nothing, a bare prompt string, or a serialized options object.
    pub fn from_args(args: Option<Value>) -> Result<Self> {
        match args {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::String(text)) => Ok(Self::new(text)),
            Some(value @ Value::Object(_)) => Ok(serde_json::from_value(value)?),
            Some(other) => Err(DialogError::InvalidOptions(format!(
                "expected prompt text or an options object, got {other}"
            ))),
        }
    }

    /// The activity to send for an attempt
    pub fn activity_for(&self, is_retry: bool) -> Option<&Activity> {
        if is_retry {
            self.retry_prompt.as_ref().or(self.prompt.as_ref())
        } else {
            self.prompt.as_ref()
        }
    }
}

impl From<&str> for PromptOptions {
    fn from(text: &str) -> Self {
        PromptOptions::new(text)
    }
}

impl From<String> for PromptOptions {
    fn from(text: String) -> Self {
        PromptOptions::new(text)
    }
}

impl From<Activity> for PromptOptions {
    fn from(activity: Activity) -> Self {
        PromptOptions::new(activity)
    }
}

/// One option of a choice prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Value returned when chosen
    pub value: String,

    /// Other words that select this choice
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

impl Choice {
    /// A choice with no synonyms
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            synonyms: Vec::new(),
        }
    }

    /// Add a synonym
    pub fn with_synonym(mut self, synonym: impl Into<String>) -> Self {
        self.synonyms.push(synonym.into());
        self
    }
}

impl From<&str> for Choice {
    fn from(value: &str) -> Self {
        Choice::new(value)
    }
}

/// Convert plain strings into choices
pub fn choices_from<I, S>(values: I) -> Vec<Choice>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Choice::new).collect()
}

/// The choice a user picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundChoice {
    /// Value of the picked choice
    pub value: String,
    /// Zero-based position of the picked choice
    pub index: usize,
}
