//! Dialog registry
//!
//! A `DialogSet` maps dialog ids to dialogs and is the table the engine
//! dispatches through. Sets are built explicitly and owned by whoever needs
//! them (the host, or a composite control for its inner dialogs).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::context::DialogContext;
use super::dialog::Dialog;
use super::error::{DialogError, Result};
use super::instance::DialogStackState;
use super::turn::TurnContext;
use super::waterfall::{Waterfall, WaterfallStepFn};

/// Registry of dialogs keyed by id
#[derive(Clone, Default)]
pub struct DialogSet {
    dialogs: HashMap<String, Arc<dyn Dialog>>,
}

impl DialogSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dialog under `id`
    ///
    /// Fails with [`DialogError::DuplicateId`] if `id` is taken.
    pub fn add<D>(&mut self, id: impl Into<String>, dialog: D) -> Result<&mut Self>
    where
        D: Dialog + 'static,
    {
        self.insert(id.into(), Arc::new(dialog))
    }

    /// Register a shared dialog instance under `id`
    pub fn add_shared(&mut self, id: impl Into<String>, dialog: Arc<dyn Dialog>) -> Result<&mut Self> {
        self.insert(id.into(), dialog)
    }

    /// Register an ordered sequence of steps as a waterfall dialog
    pub fn add_waterfall(
        &mut self,
        id: impl Into<String>,
        steps: Vec<WaterfallStepFn>,
    ) -> Result<&mut Self> {
        self.insert(id.into(), Arc::new(Waterfall::new(steps)))
    }

    fn insert(&mut self, id: String, dialog: Arc<dyn Dialog>) -> Result<&mut Self> {
        if self.dialogs.contains_key(&id) {
            return Err(DialogError::DuplicateId(id));
        }
        tracing::trace!(dialog_id = %id, "dialog registered");
        self.dialogs.insert(id, dialog);
        Ok(self)
    }

    /// Look up a dialog by id
    ///
    /// `None` means the id was never registered, which is a configuration
    /// error for any caller that expected it.
    pub fn find(&self, id: &str) -> Option<&dyn Dialog> {
        self.dialogs.get(id).map(|dialog| dialog.as_ref())
    }

    /// Check whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.dialogs.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.dialogs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered dialogs
    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    /// Check whether no dialogs are registered
    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }

    /// Bind this set to one turn and one conversation's persisted stack
    pub fn create_context<'a>(
        &'a self,
        context: &'a TurnContext,
        state: &'a mut DialogStackState,
    ) -> DialogContext<'a> {
        DialogContext::new(self, context, &mut state.dialog_stack)
    }
}

impl fmt::Debug for DialogSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogSet").field("ids", &self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogs::result::DialogTurnResult;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Noop;

    #[async_trait]
    impl Dialog for Noop {
        async fn begin(
            &self,
            _dc: &mut DialogContext<'_>,
            _options: Option<Value>,
        ) -> Result<DialogTurnResult> {
            Ok(DialogTurnResult::end_of_turn())
        }
    }

    #[test]
    fn test_add_and_find() {
        let mut set = DialogSet::new();
        set.add("a", Noop).unwrap().add("b", Noop).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.find("a").is_some());
        assert!(set.find("missing").is_none());
        assert_eq!(set.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut set = DialogSet::new();
        set.add("confirm", Noop).unwrap();

        let err = set.add("confirm", Noop).unwrap_err();
        assert!(matches!(err, DialogError::DuplicateId(ref id) if id == "confirm"));
        assert_eq!(set.len(), 1);

        let err = set.add_waterfall("confirm", Vec::new()).unwrap_err();
        assert!(matches!(err, DialogError::DuplicateId(_)));
    }
}
