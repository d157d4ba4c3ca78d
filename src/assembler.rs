//! Folding of streamed delta objects into one logical assistant turn

use crate::citations::ResolvedAnswer;
use crate::types::{
    ChatMessage, HistoryMetadata, Role, StreamError, ToolMessageContent, WireMessage, WireObject,
};
use tracing::{debug, warn};

/// In-progress state of one turn: the exchange triggered by a single user
/// message. Holds at most one tool message and one assistant message that
/// grows monotonically as deltas arrive.
#[derive(Debug, Default, Clone)]
pub struct TurnState {
    /// Accumulated assistant text. Append-only until the stream ends.
    pub assistant_content: String,
    /// Assistant message carrying the accumulated content. Identity fields
    /// (id, date) come from the most recent delta that supplied them.
    pub assistant: Option<ChatMessage>,
    /// Tool message (citations carrier). Replaced, never appended.
    pub tool: Option<ChatMessage>,
    /// Conversation metadata from the stream, if any object carried it.
    pub metadata: Option<HistoryMetadata>,
    /// Final text with citation tokens rewritten, plus the referenced
    /// citations. Populated once the stream terminates.
    pub resolved: Option<ResolvedAnswer>,
}

impl TurnState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the tool message content, if a tool message arrived.
    ///
    /// An unparseable tool payload is treated as carrying no citations
    /// rather than failing the turn.
    pub fn tool_content(&self) -> Option<ToolMessageContent> {
        let tool = self.tool.as_ref()?;
        match serde_json::from_str(&tool.content) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!("Ignoring unparseable tool message content: {err}");
                None
            }
        }
    }
}

/// Pure reducer folding wire objects into a caller-owned [`TurnState`].
///
/// Performs no I/O and never retains state of its own; ordering guarantees
/// come entirely from the caller applying objects in decode order.
#[derive(Debug, Default)]
pub struct DeltaAssembler;

impl DeltaAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Fold one decoded object into the turn.
    ///
    /// Heartbeat objects are skipped. An object carrying an error payload,
    /// an error-role message, or a message with neither `content` nor
    /// `context` terminates assembly with the matching [`StreamError`].
    pub fn apply(&self, obj: &WireObject, turn: &mut TurnState) -> Result<(), StreamError> {
        if let Some(error) = &obj.error {
            return Err(StreamError::Api(error.message().to_string()));
        }

        if obj.is_heartbeat() {
            debug!("Skipping heartbeat object");
            return Ok(());
        }

        if let Some(metadata) = &obj.history_metadata {
            turn.metadata = Some(metadata.clone());
        }

        let Some(choice) = obj.choices.first() else {
            // Metadata-only object; nothing to assemble.
            return Ok(());
        };
        if choice.messages.is_empty() {
            // A choice that carries no messages means the model produced
            // nothing, which is distinct from a transport failure.
            return Err(StreamError::ContentAbsence);
        }

        for message in &choice.messages {
            match message.role {
                Role::Assistant => self.apply_assistant(message, turn)?,
                Role::Tool => {
                    turn.tool = Some(Self::to_chat_message(message, Role::Tool));
                }
                Role::Error => {
                    let detail = message.content.clone().unwrap_or_default();
                    return Err(StreamError::Api(detail));
                }
                Role::User => {
                    // The stream echoes no user messages; tolerate and skip.
                    debug!("Ignoring user-role message in stream");
                }
            }
        }
        Ok(())
    }

    fn apply_assistant(
        &self,
        message: &WireMessage,
        turn: &mut TurnState,
    ) -> Result<(), StreamError> {
        if message.content.is_none() && message.context.is_none() {
            return Err(StreamError::ContentAbsence);
        }

        if let Some(content) = &message.content {
            turn.assistant_content.push_str(content);
        }

        let mut assembled = Self::to_chat_message(message, Role::Assistant);
        assembled.content = turn.assistant_content.clone();
        if assembled.context.is_none() {
            // Keep a context delivered by an earlier delta.
            assembled.context = turn.assistant.as_ref().and_then(|m| m.context.clone());
        }
        turn.assistant = Some(assembled);
        Ok(())
    }

    fn to_chat_message(message: &WireMessage, role: Role) -> ChatMessage {
        ChatMessage {
            id: message.id.clone().unwrap_or_default(),
            role,
            content: message.content.clone().unwrap_or_default(),
            date: message.date.clone().unwrap_or_default(),
            context: message.context.clone(),
        }
    }
}
