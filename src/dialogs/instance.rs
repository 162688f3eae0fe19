//! Dialog stack frames and the persisted stack
//!
//! A `DialogInstance` is one frame on the dialog stack: the identity of the
//! dialog that owns it plus that dialog's private state. The stack itself is
//! the only thing the engine persists between turns.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::Result;

/// Private per-frame state, owned by the dialog named in the frame.
///
/// Stored as a JSON object. Each dialog variant reads and writes its own
/// concrete shape through the typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogState(Map<String, Value>);

impl DialogState {
    /// Create an empty state object
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Read and deserialize the value stored under `key`
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.0.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        self.0.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Borrow the raw JSON stored under `key`
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Store raw JSON under `key`
    pub fn set_raw(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Remove the value stored under `key`
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Check whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Check whether no keys are stored
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for DialogState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One frame on the dialog stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogInstance {
    /// Id of the dialog that owns this frame
    pub id: String,

    /// State private to that dialog
    #[serde(default)]
    pub state: DialogState,
}

impl DialogInstance {
    /// Create a fresh frame with empty state
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: DialogState::new(),
        }
    }
}

/// The persisted unit of a conversation: its dialog stack
///
/// Index 0 is the bottom (oldest) frame; the last frame is the active dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogStackState {
    /// Stack frames, bottom first
    #[serde(default)]
    pub dialog_stack: Vec<DialogInstance>,
}

impl DialogStackState {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames on the stack
    pub fn depth(&self) -> usize {
        self.dialog_stack.len()
    }

    /// The active (top) frame, if any
    pub fn active(&self) -> Option<&DialogInstance> {
        self.dialog_stack.last()
    }

    /// Check whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.dialog_stack.is_empty()
    }
}
