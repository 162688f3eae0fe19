//! Integration tests for the turn driver
//!
//! Tests multi-turn conversations through DialogBot with both state stores.

use async_trait::async_trait;
use dialog_stack::dialogs::prompts::{NumberPrompt, TextPrompt};
use dialog_stack::dialogs::{
    Activity, ActivityType, Dialog, DialogBot, DialogContext, DialogHooks, DialogSet,
    DialogTurnResult, FileStorage, MemoryStorage, RecordingSender, Result, StateStore,
    TurnContext, step_fn,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

fn greeter_dialogs() -> DialogSet {
    let mut set = DialogSet::new();
    set.add("text", TextPrompt::default()).unwrap();
    set.add("number", NumberPrompt::default()).unwrap();
    set.add_waterfall(
        "main",
        vec![
            step_fn(|step| Box::pin(async move { step.prompt("text", "Name?").await })),
            step_fn(|step| {
                Box::pin(async move {
                    let name = step.take_result();
                    step.set_value("name", &name)?;
                    step.prompt("number", "Lucky number?").await
                })
            }),
            step_fn(|step| {
                Box::pin(async move {
                    let name: String = step.value("name")?.unwrap_or_default();
                    let lucky = step.result().cloned().unwrap_or(Value::Null);
                    step.send_text(format!("Bye {name}, {lucky} it is.")).await?;
                    step.end(None).await
                })
            }),
        ],
    )
    .unwrap();
    set
}

async fn say<S: StateStore>(bot: &DialogBot<S>, conversation: &str, text: &str) -> Vec<String> {
    let sender = Arc::new(RecordingSender::new());
    let ctx = TurnContext::new(conversation, Activity::message(text), sender.clone());
    bot.on_turn(&ctx).await.unwrap();
    sender.texts()
}

#[tokio::test]
async fn test_conversation_runs_to_completion_in_memory() {
    let bot = DialogBot::new(greeter_dialogs(), MemoryStorage::new(), "main").unwrap();

    assert_eq!(say(&bot, "c", "hi").await, vec!["Name?"]);
    assert_eq!(say(&bot, "c", "Ada").await, vec!["Lucky number?"]);
    assert_eq!(say(&bot, "c", "seven").await, vec!["Lucky number?"]);
    assert_eq!(say(&bot, "c", "7").await, vec!["Bye Ada, 7 it is."]);
    assert!(bot.load("c").await.unwrap().is_empty());

    // The goodbye counted as a reply, so the next message starts over
    assert_eq!(say(&bot, "c", "hello again").await, vec!["Name?"]);
}

#[tokio::test]
async fn test_conversations_are_isolated() {
    let bot = DialogBot::new(greeter_dialogs(), MemoryStorage::new(), "main").unwrap();

    say(&bot, "alice", "hi").await;
    say(&bot, "alice", "Alice").await;
    say(&bot, "bob", "hi").await;

    assert_eq!(bot.load("alice").await.unwrap().depth(), 2);
    assert_eq!(
        bot.load("alice").await.unwrap().active().map(|f| f.id.as_str()),
        Some("number")
    );
    assert_eq!(
        bot.load("bob").await.unwrap().active().map(|f| f.id.as_str()),
        Some("text")
    );

    assert_eq!(say(&bot, "bob", "Bob").await, vec!["Lucky number?"]);
    assert_eq!(say(&bot, "alice", "3").await, vec!["Bye Alice, 3 it is."]);
    assert_eq!(bot.store().len(), 2);
}

#[tokio::test]
async fn test_non_message_activity_keeps_state() {
    let bot = DialogBot::new(greeter_dialogs(), MemoryStorage::new(), "main").unwrap();
    say(&bot, "c", "hi").await;

    let sender = Arc::new(RecordingSender::new());
    let ctx = TurnContext::new("c", Activity::new(ActivityType::Typing), sender.clone());
    let result = bot.on_turn(&ctx).await.unwrap();

    assert!(result.has_active());
    assert!(sender.texts().is_empty());
    assert_eq!(bot.load("c").await.unwrap().depth(), 2);
}

#[tokio::test]
async fn test_file_storage_resumes_across_bot_instances() {
    let temp = TempDir::new().unwrap();
    let open = || DialogBot::new(greeter_dialogs(), FileStorage::new(temp.path()), "main").unwrap();

    assert_eq!(say(&open(), "console", "hi").await, vec!["Name?"]);
    assert_eq!(say(&open(), "console", "Grace").await, vec!["Lucky number?"]);
    assert!(temp.path().join("conversations/console.json").exists());

    assert_eq!(say(&open(), "console", "9").await, vec!["Bye Grace, 9 it is."]);
    assert!(open().load("console").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_forgets_the_stack() {
    let temp = TempDir::new().unwrap();
    let bot = DialogBot::new(greeter_dialogs(), FileStorage::new(temp.path()), "main").unwrap();

    say(&bot, "console", "hi").await;
    say(&bot, "console", "Grace").await;
    bot.reset("console").await.unwrap();

    assert!(bot.load("console").await.unwrap().is_empty());
    assert_eq!(say(&bot, "console", "hi").await, vec!["Name?"]);
}

/// Stays on the stack while reporting that nothing is active
struct Silent;

#[async_trait]
impl Dialog for Silent {
    fn hooks(&self) -> DialogHooks {
        DialogHooks::BEGIN_ONLY.with_continue()
    }

    async fn begin(
        &self,
        _dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult> {
        Ok(DialogTurnResult::empty())
    }

    async fn continue_dialog(&self, _dc: &mut DialogContext<'_>) -> Result<DialogTurnResult> {
        Ok(DialogTurnResult::empty())
    }
}

#[tokio::test]
async fn test_root_dialog_is_not_stacked_on_a_live_frame() {
    let mut set = DialogSet::new();
    set.add("main", Silent).unwrap();
    let bot = DialogBot::new(set, MemoryStorage::new(), "main").unwrap();

    for text in ["one", "two", "three"] {
        let sender = Arc::new(RecordingSender::new());
        let ctx = TurnContext::new("c", Activity::message(text), sender);
        let result = bot.on_turn(&ctx).await.unwrap();
        assert!(result.has_active());
    }

    assert_eq!(bot.load("c").await.unwrap().depth(), 1);
}
