//! One object wiring the containers and services of a chat session together.

use std::sync::Arc;

use tracing::info;

use crate::api::{AuthApi, ChatService, ConversationId, HttpChatService, UserCreate, UserLogin};
use crate::auth::{AuthSession, AuthStore};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::notifications::{NotificationId, NotificationScheduler};
use crate::preferences::PreferencesStore;
use crate::session::SessionStore;
use crate::storage::{FileKeyValueStore, KeyValueStore};

use super::orchestrator::{MessageSendOrchestrator, SendOutcome};
use super::synchronizer::{ConversationListSynchronizer, DeleteOutcome, LoadOutcome, RefreshOutcome};

/// Chat client facade.
///
/// Holds the session store, notification scheduler, auth and preferences,
/// and exposes the user-level operations. Every state change is pushed to
/// subscribers of the individual stores.
#[derive(Clone)]
pub struct ChatClient {
    session: SessionStore,
    notifications: NotificationScheduler,
    orchestrator: MessageSendOrchestrator,
    synchronizer: ConversationListSynchronizer,
    auth: AuthSession,
    preferences: PreferencesStore,
    max_message_chars: usize,
}

impl ChatClient {
    /// Assemble a client over injected services and store.
    #[must_use]
    pub fn new(
        service: Arc<dyn ChatService>,
        auth_api: Arc<dyn AuthApi>,
        storage: Arc<dyn KeyValueStore>,
        config: &ClientConfig,
    ) -> Self {
        let session = SessionStore::new();
        let notifications = NotificationScheduler::new(config.notification_ttl);
        let synchronizer =
            ConversationListSynchronizer::new(service.clone(), session.clone(), notifications.clone());
        let orchestrator = MessageSendOrchestrator::new(
            service,
            session.clone(),
            notifications.clone(),
            synchronizer.clone(),
        )
        .with_ask_timeout(config.ask_timeout)
        .with_title_max_chars(config.title_max_chars);
        let auth = AuthSession::new(
            auth_api,
            AuthStore::new(storage.clone()),
            session.clone(),
            notifications.clone(),
        );

        Self {
            session,
            notifications,
            orchestrator,
            synchronizer,
            auth,
            preferences: PreferencesStore::new(storage),
            max_message_chars: config.max_message_chars,
        }
    }

    /// Build a client talking HTTP to `config.base_url`, persisting to `config.storage_path`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the store cannot be
    /// opened, or the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let storage: Arc<dyn KeyValueStore> =
            Arc::new(FileKeyValueStore::open(config.storage_path.clone())?);
        let http = Arc::new(HttpChatService::new(config, storage.clone())?);
        info!(base_url = %http.root(), "Chat client ready");
        Ok(Self::new(http.clone(), http, storage, config))
    }

    /// Session state handle.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Notification list handle.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationScheduler {
        &self.notifications
    }

    /// Auth flows and state.
    #[must_use]
    pub const fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// UI preferences.
    #[must_use]
    pub const fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    /// Send into the active conversation, or start a new one if none is saved yet.
    ///
    /// Text over the configured length is rejected before anything changes.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let target = self.session.current_id().filter(|id| !id.is_empty());
        self.send_message_to(text, target.as_ref()).await
    }

    /// Send into `conversation_id`, or into a new conversation when `None`.
    pub async fn send_message_to(
        &self,
        text: &str,
        conversation_id: Option<&ConversationId>,
    ) -> SendOutcome {
        let got = text.trim().chars().count();
        if got > self.max_message_chars {
            return SendOutcome::TooLong {
                max: self.max_message_chars,
                got,
            };
        }
        self.orchestrator.send(text, conversation_id).await
    }

    /// Re-fetch the conversation list.
    pub async fn load_conversations(&self) -> RefreshOutcome {
        self.synchronizer.refresh().await
    }

    /// Open a conversation and load its messages.
    ///
    /// Ids missing from the local list are fetched directly.
    pub async fn select_conversation(&self, id: &ConversationId) -> LoadOutcome {
        if self.session.snapshot().has_conversation(id) {
            self.synchronizer.select_conversation(id).await
        } else {
            self.synchronizer.load_conversation(id).await
        }
    }

    /// Delete a conversation once the service confirms.
    pub async fn delete_conversation(&self, id: &ConversationId) -> DeleteOutcome {
        self.synchronizer.delete(id).await
    }

    /// Leave the active conversation; the next send starts a new one.
    pub fn start_new_conversation(&self) {
        self.session.start_new_conversation();
    }

    /// Dismiss the sticky error banner.
    pub fn clear_error(&self) {
        self.session.clear_error();
    }

    /// Dismiss a notice. Unknown or already expired ids are ignored.
    pub fn dismiss_notification(&self, id: NotificationId) -> bool {
        self.notifications.remove(id)
    }

    /// Sign in, then load the conversation list.
    pub async fn login(&self, credentials: &UserLogin) -> bool {
        let ok = self.auth.login(credentials).await;
        if ok {
            self.synchronizer.refresh().await;
        }
        ok
    }

    /// Create an account, then load the (empty) conversation list.
    pub async fn register(&self, user: &UserCreate) -> bool {
        let ok = self.auth.register(user).await;
        if ok {
            self.synchronizer.refresh().await;
        }
        ok
    }

    /// Sign out and reset the chat session.
    pub async fn logout(&self) {
        self.auth.logout().await;
    }

    /// Validate a persisted session and, if valid, load the conversation list.
    pub async fn restore(&self) -> bool {
        let ok = self.auth.check_auth().await;
        if ok {
            self.synchronizer.refresh().await;
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::scripted::{Call, ScriptedService, conversation, user};
    use crate::api::{ChatResponse, MessageId, Token};
    use crate::storage::MemoryKeyValueStore;

    fn client(service: ScriptedService) -> (Arc<ScriptedService>, ChatClient) {
        let service = Arc::new(service);
        let config = ClientConfig::new();
        let client = ChatClient::new(
            service.clone(),
            service.clone(),
            Arc::new(MemoryKeyValueStore::new()),
            &config,
        );
        (service, client)
    }

    fn reply(conversation: &str, message: &str) -> ChatResponse {
        ChatResponse {
            response: "answer".into(),
            conversation_id: ConversationId::new(conversation),
            message_id: MessageId::new(message),
        }
    }

    #[tokio::test]
    async fn follow_up_goes_to_created_conversation() {
        let (service, client) = client(ScriptedService::new());
        service.push_ask(Ok(reply("c1", "m1")));
        service.push_ask(Ok(reply("c1", "m2")));

        assert!(client.send_message("first question").await.is_delivered());
        assert!(client.send_message("second question").await.is_delivered());

        let asks: Vec<Option<String>> = service
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Ask {
                    conversation_id, ..
                } => Some(conversation_id),
                _ => None,
            })
            .collect();
        assert_eq!(asks, vec![None, Some("c1".to_string())]);
        assert_eq!(client.session().snapshot().message_count(), 4);
    }

    #[tokio::test]
    async fn retry_after_failed_first_message_starts_new_conversation() {
        let (service, client) = client(ScriptedService::new());
        service.push_ask(Err(crate::api::ApiError::Transport("down".into())));
        client.send_message("hello").await;

        service.push_ask(Ok(reply("c1", "m1")));
        client.send_message("hello").await;

        assert_eq!(
            service.calls().last(),
            Some(&Call::Ask {
                message: "hello".into(),
                conversation_id: None,
            })
        );
    }

    #[tokio::test]
    async fn overlong_message_is_rejected_untouched() {
        let (service, client) = client(ScriptedService::new());
        let text = "a".repeat(1_001);

        assert_eq!(
            client.send_message(&text).await,
            SendOutcome::TooLong { max: 1_000, got: 1_001 }
        );
        assert!(service.calls().is_empty());
        assert!(client.session().snapshot().current.is_none());
    }

    #[tokio::test]
    async fn select_unknown_id_fetches_directly() {
        let (service, client) =
            client(ScriptedService::new().with_conversations(vec![conversation("c5", "Old", 0)]));

        let outcome = client.select_conversation(&ConversationId::new("c5")).await;

        assert_eq!(outcome, LoadOutcome::Loaded(0));
        assert_eq!(client.session().current_id(), Some(ConversationId::new("c5")));
        assert_eq!(service.count(|c| matches!(c, Call::GetConversation(_))), 1);
    }

    #[tokio::test]
    async fn login_loads_conversations_and_logout_clears_them() {
        let (service, client) =
            client(ScriptedService::new().with_conversations(vec![conversation("c1", "A", 2)]));
        service.push_token(Ok(Token {
            access_token: "tok".into(),
            token_type: "bearer".into(),
            user: user("Asha Rao"),
        }));
        let credentials = UserLogin {
            email: "driver@example.com".into(),
            password: "secret".into(),
        };

        assert!(client.login(&credentials).await);
        assert_eq!(client.session().snapshot().conversations.len(), 1);

        client.logout().await;
        assert!(client.session().snapshot().conversations.is_empty());
        assert!(!client.auth().store().is_authenticated());
    }

    #[tokio::test]
    async fn dismissing_a_notice_twice_is_harmless() {
        let (service, client) = client(ScriptedService::new());
        service.push_delete(Err(crate::api::ApiError::status(500, None)));
        client.delete_conversation(&ConversationId::new("c1")).await;

        let id = client.notifications().snapshot()[0].id;
        assert!(client.dismiss_notification(id));
        assert!(!client.dismiss_notification(id));
        assert!(client.notifications().is_empty());
    }
}
