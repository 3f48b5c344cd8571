//! Read snapshot of the session.

use serde::Serialize;

use crate::api::{Conversation, ConversationId, ConversationWithMessages};

/// Everything the presentation layer renders for the chat pane and sidebar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Conversation summaries, in server order.
    pub conversations: Vec<Conversation>,
    /// The single active conversation; `None` for a new, unsaved one.
    pub current: Option<ConversationWithMessages>,
    /// A list or conversation load is in flight.
    pub is_loading: bool,
    /// A send is in flight and the assistant reply is pending.
    pub is_typing: bool,
    /// Sticky inline error, cleared by the next success or explicit dismissal.
    pub error: Option<String>,
}

impl SessionState {
    /// Id of the active conversation, if any.
    #[must_use]
    pub fn current_id(&self) -> Option<&ConversationId> {
        self.current.as_ref().map(ConversationWithMessages::id)
    }

    /// Whether a summary with this id is known.
    #[must_use]
    pub fn has_conversation(&self, id: &ConversationId) -> bool {
        self.conversations.iter().any(|c| &c.id == id)
    }

    /// Number of messages in the active conversation.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.current.as_ref().map_or(0, |c| c.messages.len())
    }
}
