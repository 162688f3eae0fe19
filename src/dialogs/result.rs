//! Turn results and lifecycle reasons

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Why a dialog is being ended or resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogReason {
    /// A dialog was started via `begin`
    #[serde(rename = "beginCalled")]
    Begin,
    /// A dialog was continued because the user replied
    #[serde(rename = "continueCalled")]
    Continue,
    /// A dialog ended normally via `end`
    #[serde(rename = "endCalled")]
    End,
    /// A dialog was swapped out via `replace`
    #[serde(rename = "replaceCalled")]
    Replace,
    /// A dialog was cancelled via `cancel_all`
    #[serde(rename = "cancelCalled")]
    Cancel,
    /// A waterfall step was skipped ahead via `next`
    #[serde(rename = "nextCalled")]
    Next,
}

impl fmt::Display for DialogReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DialogReason::Begin => "beginCalled",
            DialogReason::Continue => "continueCalled",
            DialogReason::End => "endCalled",
            DialogReason::Replace => "replaceCalled",
            DialogReason::Cancel => "cancelCalled",
            DialogReason::Next => "nextCalled",
        };
        f.write_str(name)
    }
}

/// Outcome of a dialog context operation
///
/// `has_result == true` means the dialog that produced it was just popped;
/// `result` may still be `None` in that case, so callers must branch on
/// [`DialogTurnResult::has_result`] rather than on the value.
///
/// A hook may leave `has_active` unspecified; the engine fills it in from the
/// stack before returning the result to its caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogTurnResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    has_active: Option<bool>,
    #[serde(default)]
    has_result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
}

impl DialogTurnResult {
    /// The active dialog is waiting for the next turn
    pub fn end_of_turn() -> Self {
        Self {
            has_active: Some(true),
            has_result: false,
            result: None,
        }
    }

    /// A dialog completed and was popped, yielding `result`
    pub fn complete(result: Option<Value>) -> Self {
        Self {
            has_active: Some(false),
            has_result: true,
            result,
        }
    }

    /// Nothing is active and nothing was produced
    pub fn empty() -> Self {
        Self {
            has_active: Some(false),
            has_result: false,
            result: None,
        }
    }

    /// A result whose `has_active` flag is left for the engine to infer
    pub fn unspecified() -> Self {
        Self::default()
    }

    /// Whether a dialog remains active on the stack
    pub fn has_active(&self) -> bool {
        self.has_active.unwrap_or(false)
    }

    /// Whether a dialog completed during this operation
    pub fn has_result(&self) -> bool {
        self.has_result
    }

    /// The value the completed dialog returned, if any
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Take ownership of the returned value
    pub fn into_result(self) -> Option<Value> {
        self.result
    }

    /// Whether `has_active` was explicitly set by whoever produced this result
    pub fn is_specified(&self) -> bool {
        self.has_active.is_some()
    }

    /// Fill in or correct the result against the actual stack
    ///
    /// `has_active` always reflects whether the stack is empty. A result
    /// claimed while frames remain is dropped, since only a popped frame
    /// produces one. Returns `true` if anything had to be changed.
    pub(crate) fn normalize(&mut self, stack_is_empty: bool) -> bool {
        let actual = !stack_is_empty;
        let mut changed = self.has_active != Some(actual);
        self.has_active = Some(actual);

        if actual && self.has_result {
            self.has_result = false;
            self.result = None;
            changed = true;
        }
        changed
    }
}
