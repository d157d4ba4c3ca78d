//! Conversation state owned on behalf of the presentation layer
//!
//! The streaming core treats a conversation as an append target; this
//! manager owns the id → thread mapping, checks that a caller-supplied
//! conversation id actually exists before a stream starts, and merges a
//! finished turn (user message, optional tool message, assistant message,
//! in that order) into the thread.

use crate::assembler::TurnState;
use crate::types::{ChatMessage, Conversation, StreamError};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ConversationStateManager {
    conversations: HashMap<String, Conversation>,
}

impl ConversationStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new conversation thread and return its id.
    pub fn create(&mut self, id: impl Into<String>, title: impl Into<String>) -> String {
        let id = id.into();
        let conversation = Conversation {
            id: id.clone(),
            title: title.into(),
            messages: Vec::new(),
            date: Utc::now(),
        };
        self.conversations.insert(id.clone(), conversation);
        id
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    /// Verify that a caller-supplied conversation id refers to a thread we
    /// actually hold. A miss is a usage error: it is reported and the
    /// stream must not start.
    pub fn begin_turn(&self, id: &str) -> Result<(), StreamError> {
        if self.conversations.contains_key(id) {
            Ok(())
        } else {
            warn!(conversation_id = id, "conversation not found, refusing to start stream");
            Err(StreamError::UnknownConversation(id.to_string()))
        }
    }

    /// Merge a terminal turn into its conversation.
    ///
    /// Appends the user message, then the tool message if one arrived, then
    /// the assistant message. Applies a title carried by the stream's
    /// history metadata. A turn that assembled no assistant message (for
    /// example, cancelled before the first delta) appends only what exists.
    pub fn commit_turn(
        &mut self,
        id: &str,
        user_message: ChatMessage,
        turn: &TurnState,
    ) -> Result<(), StreamError> {
        let conversation = self
            .conversations
            .get_mut(id)
            .ok_or_else(|| StreamError::UnknownConversation(id.to_string()))?;

        conversation.messages.push(user_message);
        if let Some(tool) = &turn.tool {
            conversation.messages.push(tool.clone());
        }
        if let Some(assistant) = &turn.assistant {
            conversation.messages.push(assistant.clone());
        }

        if let Some(metadata) = &turn.metadata {
            if let Some(title) = &metadata.title {
                conversation.title = title.clone();
            }
        }
        debug!(
            conversation_id = id,
            messages = conversation.messages.len(),
            "turn committed"
        );
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        self.conversations.remove(id)
    }
}
