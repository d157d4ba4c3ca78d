//! Wire and domain types shared across the streaming pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a chat message, as carried on the wire and in conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    Error,
}

/// One message inside a streamed wire object. All fields except `role` are
/// optional because delta objects routinely omit them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireChoice {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

/// Error payload on a wire object. Some backends send a bare string, others
/// an object with a `message` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireError {
    Message(String),
    Detailed { message: String },
}

impl WireError {
    pub fn message(&self) -> &str {
        match self {
            WireError::Message(msg) => msg,
            WireError::Detailed { message } => message,
        }
    }
}

/// Conversation metadata piggybacked on streamed objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMetadata {
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// One fully decoded JSON unit from the streaming response.
///
/// An object with no choices, no metadata and no error is a heartbeat: it
/// keeps the connection alive without contributing content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, rename = "object", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default)]
    pub choices: Vec<WireChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_metadata: Option<HistoryMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl WireObject {
    pub fn is_heartbeat(&self) -> bool {
        self.choices.is_empty() && self.history_metadata.is_none() && self.error.is_none()
    }
}

/// A message as held in conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A document citation referenced from generated answer text.
///
/// `reindex_id` stays `None` until citation resolution assigns the stable,
/// order-of-first-appearance sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reindex_id: Option<u32>,
}

/// Parsed form of a tool message's `content` field, which is itself a JSON
/// string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolMessageContent {
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub intent: String,
}

/// A conversation thread as owned by the state manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub date: DateTime<Utc>,
}

/// Closed set of terminal failures a stream can surface.
///
/// Cancellation is deliberately absent: a cancelled stream ends as a normal,
/// if incomplete, completion and keeps the content assembled so far.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("No content in response")]
    ContentAbsence,

    #[error("No conversation found with id {0}")]
    UnknownConversation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl StreamError {
    /// User-visible text for this error. Presentation stays decoupled from
    /// the classification carried by the variant itself.
    pub fn user_message(&self) -> &'static str {
        match self {
            StreamError::ContentAbsence => "The model returned no content for this request.",
            StreamError::UnknownConversation(_) => "Conversation not found.",
            StreamError::Api(_) | StreamError::Transport(_) => {
                "An error occurred. Please try again. If the problem persists, contact the site administrator."
            }
        }
    }
}
