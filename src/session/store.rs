//! Observable container owning the session state.
//!
//! Setters are synchronous and total: each one applies a whole mutation under
//! the channel lock and only then publishes it, so a subscriber never sees a
//! half-applied change. They are the only way to mutate session state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::api::{Conversation, ConversationId, ConversationWithMessages, Message, MessageId};

use super::state::SessionState;

/// Shared handle to the session state. Clones observe and mutate the same state.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Whether a send is in flight.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.state.borrow().is_typing
    }

    /// Id of the active conversation, if any.
    #[must_use]
    pub fn current_id(&self) -> Option<ConversationId> {
        self.state.borrow().current_id().cloned()
    }

    // ----- conversations ---------------------------------------------------

    /// Replace the summary list wholesale.
    pub fn set_conversations(&self, conversations: Vec<Conversation>) {
        debug!(count = conversations.len(), "Conversation list replaced");
        self.state.send_modify(|s| s.conversations = conversations);
    }

    /// Prepend a summary.
    pub fn add_conversation(&self, conversation: Conversation) {
        self.state
            .send_modify(|s| s.conversations.insert(0, conversation));
    }

    /// Drop a summary; clears the active conversation to none if it matches.
    pub fn remove_conversation(&self, id: &ConversationId) {
        self.state.send_modify(|s| {
            s.conversations.retain(|c| &c.id != id);
            if s.current_id() == Some(id) {
                s.current = None;
            }
        });
    }

    // ----- active conversation ---------------------------------------------

    /// Install (or clear) the active conversation wholesale.
    pub fn set_current_conversation(&self, conversation: Option<ConversationWithMessages>) {
        self.state.send_modify(|s| s.current = conversation);
    }

    /// Append a message to the active conversation.
    ///
    /// A no-op when no conversation is active: a reply that lands after the
    /// user navigated away is dropped. Returns whether the message was appended.
    pub fn append_message(&self, message: Message) -> bool {
        self.state.send_if_modified(|s| match s.current.as_mut() {
            Some(current) => {
                current.messages.push(message);
                true
            }
            None => {
                debug!(message_id = %message.id, "No active conversation; append dropped");
                false
            }
        })
    }

    /// Append a message only if `id` is still the active conversation.
    ///
    /// Async replies land here: if the user moved to another conversation (or
    /// none) while the request was in flight, the message is dropped instead
    /// of being attached to whatever is on screen now.
    pub fn append_message_to(&self, id: &ConversationId, message: Message) -> bool {
        self.state.send_if_modified(|s| match s.current.as_mut() {
            Some(current) if &current.conversation.id == id => {
                current.messages.push(message);
                true
            }
            _ => {
                debug!(%id, message_id = %message.id, "Conversation no longer active; append dropped");
                false
            }
        })
    }

    /// Replace the unsaved draft with its saved conversation.
    ///
    /// Only applies while the draft (placeholder id) is still active. Returns
    /// whether the conversation was installed.
    pub fn replace_draft(&self, conversation: ConversationWithMessages) -> bool {
        self.state.send_if_modified(|s| {
            if !s.current.as_ref().is_some_and(|c| c.id().is_empty()) {
                debug!(id = %conversation.id(), "Draft no longer active; install dropped");
                return false;
            }
            s.current = Some(conversation);
            true
        })
    }

    /// Swap a temporary message id for its server id, keeping position and content.
    ///
    /// Returns whether a message carried `temporary`.
    pub fn reconcile_message_id(&self, temporary: &MessageId, server: MessageId) -> bool {
        self.state.send_if_modified(|s| {
            let Some(message) = s
                .current
                .as_mut()
                .and_then(|c| c.messages.iter_mut().find(|m| &m.id == temporary))
            else {
                return false;
            };
            message.id = server;
            true
        })
    }

    /// Rename the active conversation and its summary.
    pub fn update_current_conversation_title(&self, title: &str) {
        self.state.send_if_modified(|s| {
            let Some(current) = s.current.as_mut() else {
                return false;
            };
            current.conversation.title = title.to_string();
            let id = current.conversation.id.clone();
            for summary in s.conversations.iter_mut().filter(|c| c.id == id) {
                summary.title = title.to_string();
            }
            true
        });
    }

    /// Leave the active conversation for a new, unsaved one.
    pub fn start_new_conversation(&self) {
        self.state.send_modify(|s| {
            s.current = None;
            s.error = None;
        });
    }

    /// Make a known conversation active with no messages loaded yet.
    ///
    /// Unknown ids are ignored. Returns whether the selection happened.
    pub fn select_conversation(&self, id: &ConversationId) -> bool {
        self.state.send_if_modified(|s| {
            let Some(summary) = s.conversations.iter().find(|c| &c.id == id).cloned() else {
                return false;
            };
            s.current = Some(ConversationWithMessages::empty(summary));
            s.error = None;
            true
        })
    }

    // ----- flags -----------------------------------------------------------

    /// Set the loading flag.
    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_loading != loading;
            s.is_loading = loading;
            changed
        });
    }

    /// Set the typing flag.
    pub fn set_typing(&self, typing: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_typing != typing;
            s.is_typing = typing;
            changed
        });
    }

    /// Raise the typing flag unless it is already raised.
    ///
    /// Check and set happen under one lock, so of two racing callers exactly
    /// one wins. Returns whether this caller raised the flag.
    pub fn try_begin_typing(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.is_typing {
                return false;
            }
            s.is_typing = true;
            true
        })
    }

    /// Set or clear the sticky error.
    ///
    /// Setting an error also drops the loading flag. The typing flag is left
    /// alone: it belongs to the send in flight, which lowers it when it settles.
    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|s| {
            if error.is_some() {
                s.is_loading = false;
            }
            s.error = error;
        });
    }

    /// Clear the sticky error.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Reset everything, e.g. on logout.
    ///
    /// A send still in flight keeps its typing flag until it settles.
    pub fn clear_chat(&self) {
        self.state.send_modify(|s| {
            *s = SessionState {
                is_typing: s.is_typing,
                ..SessionState::default()
            };
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Role;
    use crate::api::scripted::conversation;

    fn message(id: MessageId, role: Role, content: &str) -> Message {
        Message::now(id, role, content, ConversationId::new("c1"))
    }

    fn store_with_active() -> SessionStore {
        let store = SessionStore::new();
        store.set_conversations(vec![conversation("c1", "One", 0), conversation("c2", "Two", 0)]);
        assert!(store.select_conversation(&ConversationId::new("c1")));
        store
    }

    #[test]
    fn append_without_active_conversation_is_noop() {
        let store = SessionStore::new();
        let rx = store.subscribe();

        let appended = store.append_message(message(MessageId::temporary(), Role::User, "hi"));

        assert!(!appended);
        assert!(store.snapshot().current.is_none());
        assert!(!rx.has_changed().unwrap_or(true));
    }

    #[test]
    fn append_preserves_insertion_order() {
        let store = store_with_active();
        assert!(store.append_message(message(MessageId::new("a"), Role::User, "q")));
        assert!(store.append_message(message(MessageId::new("b"), Role::Assistant, "r")));

        let snapshot = store.snapshot();
        let ids: Vec<&str> = snapshot
            .current
            .iter()
            .flat_map(|c| c.messages.iter().map(|m| m.id.as_str()))
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn reconcile_keeps_position_and_content() {
        let store = store_with_active();
        let temp = MessageId::temporary();
        store.append_message(message(temp.clone(), Role::User, "first"));
        store.append_message(message(MessageId::new("m2"), Role::Assistant, "second"));

        assert!(store.reconcile_message_id(&temp, MessageId::new("m1")));
        assert!(!store.reconcile_message_id(&temp, MessageId::new("m9")));

        let snapshot = store.snapshot();
        let messages = snapshot.current.map(|c| c.messages).unwrap_or_default();
        assert_eq!(messages[0].id.as_str(), "m1");
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].id.as_str(), "m2");
    }

    #[test]
    fn removing_active_conversation_clears_it_to_none() {
        let store = store_with_active();
        store.remove_conversation(&ConversationId::new("c1"));

        let snapshot = store.snapshot();
        assert!(snapshot.current.is_none());
        assert_eq!(snapshot.conversations.len(), 1);
        assert_eq!(snapshot.conversations[0].id.as_str(), "c2");
    }

    #[test]
    fn removing_other_conversation_keeps_active() {
        let store = store_with_active();
        store.remove_conversation(&ConversationId::new("c2"));
        assert_eq!(store.current_id(), Some(ConversationId::new("c1")));
    }

    #[test]
    fn select_unknown_conversation_is_ignored() {
        let store = store_with_active();
        assert!(!store.select_conversation(&ConversationId::new("nope")));
        assert_eq!(store.current_id(), Some(ConversationId::new("c1")));
    }

    #[test]
    fn try_begin_typing_admits_one_caller() {
        let store = SessionStore::new();
        assert!(store.try_begin_typing());
        assert!(!store.try_begin_typing());
        store.set_typing(false);
        assert!(store.try_begin_typing());
    }

    #[test]
    fn set_error_settles_loading_but_not_typing() {
        let store = SessionStore::new();
        store.set_loading(true);
        assert!(store.try_begin_typing());

        store.set_error(Some("boom".to_string()));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
        assert!(!snapshot.is_loading);
        assert!(snapshot.is_typing);
        assert!(!store.try_begin_typing());

        store.clear_error();
        assert!(store.snapshot().error.is_none());
    }

    #[test]
    fn targeted_append_skips_other_conversations() {
        let store = store_with_active();
        let c1 = ConversationId::new("c1");
        let c2 = ConversationId::new("c2");

        assert!(!store.append_message_to(&c2, message(MessageId::new("x"), Role::Assistant, "late")));
        assert!(store.append_message_to(&c1, message(MessageId::new("y"), Role::Assistant, "on time")));
        assert_eq!(store.snapshot().message_count(), 1);

        store.start_new_conversation();
        assert!(!store.append_message_to(&c1, message(MessageId::new("z"), Role::Assistant, "gone")));
    }

    #[test]
    fn draft_is_replaced_only_while_active() {
        let saved = |id: &str| ConversationWithMessages::empty(conversation(id, "New", 2));
        let draft = || ConversationWithMessages::empty(conversation("", "New", 1));

        let store = SessionStore::new();
        assert!(!store.replace_draft(saved("c9")));

        store.set_current_conversation(Some(draft()));
        assert!(store.replace_draft(saved("c9")));
        assert_eq!(store.current_id(), Some(ConversationId::new("c9")));

        let store = store_with_active();
        store.set_current_conversation(Some(draft()));
        assert!(store.select_conversation(&ConversationId::new("c2")));
        assert!(!store.replace_draft(saved("c9")));
        assert_eq!(store.current_id(), Some(ConversationId::new("c2")));
    }

    #[test]
    fn title_update_touches_summary_too() {
        let store = store_with_active();
        store.update_current_conversation_title("Renamed");

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot.current.map(|c| c.conversation.title).as_deref(),
            Some("Renamed")
        );
        assert_eq!(snapshot.conversations[0].title, "Renamed");
        assert_eq!(snapshot.conversations[1].title, "Two");
    }

    #[test]
    fn add_conversation_prepends() {
        let store = store_with_active();
        store.add_conversation(conversation("c0", "Zero", 0));
        assert_eq!(store.snapshot().conversations[0].id.as_str(), "c0");
    }

    #[test]
    fn start_new_and_clear_chat() {
        let store = store_with_active();
        store.set_error(Some("x".into()));
        store.start_new_conversation();
        let snapshot = store.snapshot();
        assert!(snapshot.current.is_none());
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.conversations.len(), 2);

        store.clear_chat();
        assert_eq!(store.snapshot(), SessionState::default());
    }

    #[test]
    fn clear_chat_keeps_in_flight_send_guard() {
        let store = store_with_active();
        assert!(store.try_begin_typing());

        store.clear_chat();

        let snapshot = store.snapshot();
        assert!(snapshot.conversations.is_empty());
        assert!(snapshot.current.is_none());
        assert!(snapshot.is_typing);
    }

    #[test]
    fn subscribers_see_complete_mutations() {
        let store = store_with_active();
        let mut rx = store.subscribe();
        store.remove_conversation(&ConversationId::new("c1"));

        assert!(rx.has_changed().unwrap_or(false));
        let seen = rx.borrow_and_update().clone();
        assert!(seen.current.is_none());
        assert!(!seen.has_conversation(&ConversationId::new("c1")));
    }
}
