//! Activities and the per-turn handle
//!
//! The engine only ever inspects the inbound activity's type and text and
//! sends outbound activities through an injected [`ActivitySender`]. The
//! transport behind the sender is the host's concern.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::error::Result;

/// Kind of activity exchanged with the user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    /// A user or bot message
    Message,
    /// Members joined or left the conversation
    ConversationUpdate,
    /// A programmatic event
    Event,
    /// Typing indicator
    Typing,
    /// The conversation is over
    EndOfConversation,
    /// Any activity type the engine has no special handling for
    Other(String),
}

impl ActivityType {
    /// Wire name of this activity type
    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::Message => "message",
            ActivityType::ConversationUpdate => "conversationUpdate",
            ActivityType::Event => "event",
            ActivityType::Typing => "typing",
            ActivityType::EndOfConversation => "endOfConversation",
            ActivityType::Other(name) => name,
        }
    }
}

impl From<String> for ActivityType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "message" => ActivityType::Message,
            "conversationUpdate" => ActivityType::ConversationUpdate,
            "event" => ActivityType::Event,
            "typing" => ActivityType::Typing,
            "endOfConversation" => ActivityType::EndOfConversation,
            _ => ActivityType::Other(name),
        }
    }
}

impl From<ActivityType> for String {
    fn from(kind: ActivityType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single inbound or outbound activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Activity type
    #[serde(rename = "type")]
    pub activity_type: ActivityType,

    /// Identifier assigned when the activity is sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Message text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Locale of the text (e.g. "en-US")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Structured payload (card submissions, event values)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Send time, stamped on outbound activities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Activity {
    /// Create an empty activity of the given type
    pub fn new(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            id: None,
            text: None,
            locale: None,
            value: None,
            timestamp: None,
        }
    }

    /// Create a text message
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(ActivityType::Message)
        }
    }

    /// Set the locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the structured value
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Whether this is a message activity
    pub fn is_message(&self) -> bool {
        self.activity_type == ActivityType::Message
    }
}

impl From<&str> for Activity {
    fn from(text: &str) -> Self {
        Activity::message(text)
    }
}

impl From<String> for Activity {
    fn from(text: String) -> Self {
        Activity::message(text)
    }
}

/// Outbound side of the transport
#[async_trait]
pub trait ActivitySender: Send + Sync {
    /// Deliver activities to the user, in order
    async fn send_activities(&self, activities: Vec<Activity>) -> Result<()>;
}

/// Sender that keeps every outbound activity in memory
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Activity>>,
}

impl RecordingSender {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot everything sent so far
    pub fn sent(&self) -> Vec<Activity> {
        self.sent.lock().clone()
    }

    /// Text of everything sent so far
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|activity| activity.text.clone())
            .collect()
    }

    /// Drain and return everything sent so far
    pub fn take(&self) -> Vec<Activity> {
        std::mem::take(&mut *self.sent.lock())
    }
}

#[async_trait]
impl ActivitySender for RecordingSender {
    async fn send_activities(&self, activities: Vec<Activity>) -> Result<()> {
        self.sent.lock().extend(activities);
        Ok(())
    }
}

/// Handle for one turn of one conversation
pub struct TurnContext {
    conversation_id: String,
    activity: Activity,
    sender: Arc<dyn ActivitySender>,
    responded: AtomicBool,
}

impl TurnContext {
    /// Create a turn handle for an inbound activity
    pub fn new(
        conversation_id: impl Into<String>,
        activity: Activity,
        sender: Arc<dyn ActivitySender>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            activity,
            sender,
            responded: AtomicBool::new(false),
        }
    }

    /// Conversation this turn belongs to
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// The inbound activity
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Whether the inbound activity is a message
    pub fn is_message(&self) -> bool {
        self.activity.is_message()
    }

    /// Inbound message text, if any
    pub fn text(&self) -> Option<&str> {
        self.activity.text.as_deref()
    }

    /// Whether anything has been sent during this turn
    pub fn responded(&self) -> bool {
        self.responded.load(Ordering::SeqCst)
    }

    /// Send a single activity
    ///
    /// Outbound activities are stamped with an id and timestamp and inherit
    /// the inbound locale when they carry none.
    pub async fn send_activity(&self, activity: Activity) -> Result<()> {
        self.send_activities(vec![activity]).await
    }

    /// Send a text message
    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send_activity(Activity::message(text)).await
    }

    /// Send several activities in order
    pub async fn send_activities(&self, activities: Vec<Activity>) -> Result<()> {
        if activities.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let stamped = activities
            .into_iter()
            .map(|mut activity| {
                activity.id.get_or_insert_with(|| Uuid::new_v4().to_string());
                activity.timestamp.get_or_insert(now);
                if activity.locale.is_none() {
                    activity.locale = self.activity.locale.clone();
                }
                activity
            })
            .collect();

        self.sender.send_activities(stamped).await?;
        self.responded.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnContext")
            .field("conversation_id", &self.conversation_id)
            .field("activity", &self.activity)
            .field("responded", &self.responded())
            .finish()
    }
}
