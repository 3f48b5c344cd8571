//! Keeps the conversation summaries consistent with the server.
//!
//! Summaries carry server-computed fields (`message_count`, `updated_at`), so
//! the list is always re-fetched and replaced wholesale, never merged.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiResult, ChatService, ConversationId, ConversationWithMessages};
use crate::notifications::{NotificationScheduler, Severity};
use crate::session::SessionStore;

/// Fallback text when listing conversations fails.
pub const LIST_FAILED: &str = "Failed to load conversations";
/// Fallback text when loading one conversation fails.
pub const LOAD_FAILED: &str = "Failed to load conversation";
/// Notice shown when loading one conversation fails.
pub const LOAD_FAILED_NOTICE: &str = "Could not load conversation";
/// Fallback text when a delete fails.
pub const DELETE_FAILED: &str = "Failed to delete conversation";
/// Notice shown after a confirmed delete.
pub const DELETED_NOTICE: &str = "Conversation deleted";

/// Result of a full list refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The list was replaced; holds the new number of summaries.
    Updated(usize),
    /// The fetch failed; local list untouched, `error` set.
    Failed(String),
}

/// Result of a delete request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The server confirmed; the summary is gone locally.
    Deleted,
    /// The server refused or was unreachable; local state untouched.
    Failed(String),
}

/// Result of loading the active conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Installed as the active conversation; holds the message count.
    Loaded(usize),
    /// Loaded, but the user moved to another conversation meanwhile; discarded.
    Superseded,
    /// The fetch failed; `error` set.
    Failed(String),
}

/// Conversation list synchronizer.
#[derive(Clone)]
pub struct ConversationListSynchronizer {
    service: Arc<dyn ChatService>,
    session: SessionStore,
    notifications: NotificationScheduler,
}

impl ConversationListSynchronizer {
    /// Create a synchronizer over shared session and notification state.
    #[must_use]
    pub fn new(
        service: Arc<dyn ChatService>,
        session: SessionStore,
        notifications: NotificationScheduler,
    ) -> Self {
        Self {
            service,
            session,
            notifications,
        }
    }

    /// Re-fetch every summary and replace the local list.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.session.set_loading(true);
        let outcome = match self.service.list_conversations().await {
            Ok(conversations) => {
                let count = conversations.len();
                self.session.set_conversations(conversations);
                debug!(count, "Conversation list refreshed");
                RefreshOutcome::Updated(count)
            }
            Err(err) => {
                warn!(%err, "Conversation list refresh failed");
                let message = err.user_message(LIST_FAILED);
                self.session.set_error(Some(message.clone()));
                RefreshOutcome::Failed(message)
            }
        };
        self.session.set_loading(false);
        outcome
    }

    /// Delete a conversation once the server confirms it.
    ///
    /// Nothing changes locally before the confirmation. On success the summary
    /// is removed, the active conversation is cleared to none if it was the
    /// deleted one, and the list is refreshed.
    pub async fn delete(&self, id: &ConversationId) -> DeleteOutcome {
        match self.service.delete_conversation(id).await {
            Ok(()) => {
                info!(conversation_id = %id, "Conversation deleted");
                self.session.remove_conversation(id);
                self.notifications.notify(Severity::Success, DELETED_NOTICE);
                self.refresh().await;
                DeleteOutcome::Deleted
            }
            Err(err) => {
                warn!(conversation_id = %id, %err, "Conversation delete failed");
                let message = err.user_message(DELETE_FAILED);
                self.notifications.notify(Severity::Error, message.clone());
                DeleteOutcome::Failed(message)
            }
        }
    }

    /// Fetch a conversation and its messages and install it as active.
    pub async fn load_conversation(&self, id: &ConversationId) -> LoadOutcome {
        self.load(id, false).await
    }

    /// Make a known conversation active immediately, then load its messages.
    ///
    /// If the user selects something else before the messages arrive, the
    /// late result is discarded.
    pub async fn select_conversation(&self, id: &ConversationId) -> LoadOutcome {
        self.session.select_conversation(id);
        self.load(id, true).await
    }

    async fn load(&self, id: &ConversationId, only_if_selected: bool) -> LoadOutcome {
        self.session.set_loading(true);
        let outcome = match self.fetch(id).await {
            Ok(conversation) => {
                if only_if_selected && self.session.current_id().as_ref() != Some(id) {
                    debug!(conversation_id = %id, "Selection changed during load; result dropped");
                    LoadOutcome::Superseded
                } else {
                    let count = conversation.messages.len();
                    self.session.set_current_conversation(Some(conversation));
                    LoadOutcome::Loaded(count)
                }
            }
            Err(err) => {
                warn!(conversation_id = %id, %err, "Conversation load failed");
                let message = err.user_message(LOAD_FAILED);
                self.session.set_error(Some(message.clone()));
                self.notifications.notify(Severity::Error, LOAD_FAILED_NOTICE);
                LoadOutcome::Failed(message)
            }
        };
        self.session.set_loading(false);
        outcome
    }

    async fn fetch(&self, id: &ConversationId) -> ApiResult<ConversationWithMessages> {
        let (conversation, messages) = futures::try_join!(
            self.service.get_conversation(id),
            self.service.list_messages(id),
        )?;
        if &conversation.id != id {
            return Err(ApiError::Decode(format!(
                "asked for conversation {id}, got {}",
                conversation.id
            )));
        }
        Ok(ConversationWithMessages {
            conversation,
            messages,
        })
    }
}
