//! Integration tests for waterfalls
//!
//! Nested waterfalls, results flowing between steps, and stacks that are
//! serialized between every turn.

use dialog_stack::dialogs::prompts::{NumberPrompt, TextPrompt};
use dialog_stack::dialogs::{
    Activity, DialogReason, DialogSet, DialogStackState, DialogTurnResult, RecordingSender,
    TurnContext, step_fn,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn turn(sender: &Arc<RecordingSender>, text: &str) -> TurnContext {
    TurnContext::new("waterfall", Activity::message(text), sender.clone())
}

/// Each waterfall starts the next one and passes the child's result up
fn nested_set() -> DialogSet {
    let mut set = DialogSet::new();
    for (id, child) in [("A", "B"), ("B", "C")] {
        set.add_waterfall(
            id,
            vec![
                step_fn(move |step| Box::pin(async move { step.begin(child, None).await })),
                step_fn(|step| {
                    Box::pin(async move {
                        assert_eq!(step.reason(), DialogReason::End);
                        let result = step.take_result();
                        step.end(result).await
                    })
                }),
            ],
        )
        .unwrap();
    }
    set.add_waterfall(
        "C",
        vec![step_fn(|step| Box::pin(async move { step.end(Some(json!(42))).await }))],
    )
    .unwrap();
    set
}

#[tokio::test]
async fn test_nested_waterfalls_bubble_result_to_caller() {
    let set = nested_set();
    let sender = Arc::new(RecordingSender::new());
    let ctx = turn(&sender, "go");
    let mut state = DialogStackState::new();

    let result = set
        .create_context(&ctx, &mut state)
        .begin("A", None)
        .await
        .unwrap();

    assert_eq!(result, DialogTurnResult::complete(Some(json!(42))));
    assert!(state.is_empty());
}

fn order_set() -> DialogSet {
    let mut set = DialogSet::new();
    set.add("text", TextPrompt::default()).unwrap();
    set.add("number", NumberPrompt::default()).unwrap();
    set.add_waterfall(
        "order",
        vec![
            step_fn(|step| {
                Box::pin(async move {
                    let greeting = step
                        .options()
                        .and_then(|options| options.get("greeting"))
                        .and_then(Value::as_str)
                        .unwrap_or("Hello")
                        .to_string();
                    step.send_text(greeting).await?;
                    step.prompt("text", "What would you like?").await
                })
            }),
            step_fn(|step| {
                Box::pin(async move {
                    let item = step.take_result();
                    step.set_value("item", &item)?;
                    step.prompt("number", "How many?").await
                })
            }),
            step_fn(|step| {
                Box::pin(async move {
                    let quantity = step.take_result();
                    step.set_value("quantity", &quantity)?;
                    step.next(Some(json!("confirmed"))).await
                })
            }),
            step_fn(|step| {
                Box::pin(async move {
                    assert_eq!(step.reason(), DialogReason::Next);
                    assert_eq!(step.index(), 3);
                    let mut order = step.values();
                    order.insert("status".to_string(), step.take_result().unwrap_or(Value::Null));
                    step.end(Some(Value::Object(order))).await
                })
            }),
        ],
    )
    .unwrap();
    set
}

/// Runs one turn against a stack that only exists as JSON between turns
async fn persisted_turn(
    set: &DialogSet,
    sender: &Arc<RecordingSender>,
    stored: &mut String,
    text: &str,
    begin: Option<Value>,
) -> DialogTurnResult {
    let mut state: DialogStackState = serde_json::from_str(stored).unwrap();
    let ctx = turn(sender, text);
    let mut dc = set.create_context(&ctx, &mut state);
    let result = match begin {
        Some(options) => dc.begin("order", Some(options)).await.unwrap(),
        None => dc.continue_dialog().await.unwrap(),
    };
    *stored = serde_json::to_string(&state).unwrap();
    result
}

#[tokio::test]
async fn test_waterfall_survives_serialization_between_turns() {
    let set = order_set();
    let sender = Arc::new(RecordingSender::new());
    let mut stored = serde_json::to_string(&DialogStackState::new()).unwrap();

    let result = persisted_turn(
        &set,
        &sender,
        &mut stored,
        "hi",
        Some(json!({ "greeting": "Welcome back" })),
    )
    .await;
    assert!(result.has_active());

    let result = persisted_turn(&set, &sender, &mut stored, "tea", None).await;
    assert!(result.has_active());

    let result = persisted_turn(&set, &sender, &mut stored, "lots", None).await;
    assert!(result.has_active());

    let result = persisted_turn(&set, &sender, &mut stored, "2", None).await;
    assert_eq!(
        result,
        DialogTurnResult::complete(Some(json!({
            "item": "tea",
            "quantity": 2,
            "status": "confirmed"
        })))
    );
    assert_eq!(stored, r#"{"dialogStack":[]}"#);
    assert_eq!(
        sender.texts(),
        vec!["Welcome back", "What would you like?", "How many?", "How many?"]
    );
}

#[tokio::test]
async fn test_step_can_wait_for_raw_reply() {
    let mut set = DialogSet::new();
    set.add_waterfall(
        "echo",
        vec![
            step_fn(|step| {
                Box::pin(async move {
                    step.send_text("Say anything").await?;
                    step.end_of_turn()
                })
            }),
            step_fn(|step| {
                Box::pin(async move {
                    assert_eq!(step.reason(), DialogReason::Continue);
                    let reply = step.take_result();
                    step.end(reply).await
                })
            }),
        ],
    )
    .unwrap();

    let sender = Arc::new(RecordingSender::new());
    let mut state = DialogStackState::new();

    let ctx = turn(&sender, "start");
    set.create_context(&ctx, &mut state)
        .begin("echo", None)
        .await
        .unwrap();

    let ctx = turn(&sender, "anything at all");
    let result = set
        .create_context(&ctx, &mut state)
        .continue_dialog()
        .await
        .unwrap();
    assert_eq!(result, DialogTurnResult::complete(Some(json!("anything at all"))));
}

#[tokio::test]
async fn test_step_replace_restarts_waterfall() {
    let mut set = DialogSet::new();
    set.add("text", TextPrompt::default()).unwrap();
    set.add_waterfall(
        "loop",
        vec![
            step_fn(|step| Box::pin(async move { step.prompt("text", "Again or stop?").await })),
            step_fn(|step| {
                Box::pin(async move {
                    if step.result().and_then(Value::as_str) == Some("again") {
                        step.replace("loop", None).await
                    } else {
                        step.end(None).await
                    }
                })
            }),
        ],
    )
    .unwrap();

    let sender = Arc::new(RecordingSender::new());
    let mut state = DialogStackState::new();

    let ctx = turn(&sender, "start");
    set.create_context(&ctx, &mut state)
        .begin("loop", None)
        .await
        .unwrap();

    let ctx = turn(&sender, "again");
    let result = set
        .create_context(&ctx, &mut state)
        .continue_dialog()
        .await
        .unwrap();
    assert!(result.has_active());
    assert_eq!(state.depth(), 2);

    let ctx = turn(&sender, "stop");
    let result = set
        .create_context(&ctx, &mut state)
        .continue_dialog()
        .await
        .unwrap();
    assert_eq!(result, DialogTurnResult::complete(None));
    assert_eq!(sender.texts(), vec!["Again or stop?", "Again or stop?"]);
}
