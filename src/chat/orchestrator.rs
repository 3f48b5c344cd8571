//! Sends one user message: optimistic append, remote ask, reconcile.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::api::{
    ApiError, ChatResponse, ChatService, Conversation, ConversationId, ConversationWithMessages,
    FailureClass, Message, MessageId, Role, UserId,
};
use crate::notifications::{NotificationScheduler, Severity};
use crate::session::SessionStore;

use super::synchronizer::ConversationListSynchronizer;
use super::title::derive_title;

/// Sticky error text for any failed send without service detail.
pub const SEND_FAILED: &str = "Failed to send message";
/// Notice shown when the service could not be reached.
pub const NETWORK_NOTICE: &str = "Network error - please try again";

/// A successful round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Conversation the exchange belongs to.
    pub conversation_id: ConversationId,
    /// Server id of the assistant reply.
    pub assistant_message_id: MessageId,
    /// Whether this send created the conversation.
    pub created: bool,
}

/// A send that reached the failure path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendFailure {
    /// Transport or business failure.
    pub class: FailureClass,
    /// Text installed as the sticky error.
    pub message: String,
}

/// How a send settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was installed.
    Delivered(Delivery),
    /// The optimistic message stays; no reply appended.
    Failed(SendFailure),
    /// Nothing left after trimming. Nothing changed.
    Empty,
    /// Another send is in flight. Nothing changed.
    Busy,
    /// Longer than the configured limit. Nothing changed.
    TooLong {
        /// Limit in characters.
        max: usize,
        /// Length of the rejected text in characters.
        got: usize,
    },
}

impl SendOutcome {
    /// Whether the reply was installed.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Lowers the typing flag when dropped, whatever path the send took.
struct TypingGuard<'a> {
    session: &'a SessionStore,
}

impl Drop for TypingGuard<'_> {
    fn drop(&mut self) {
        self.session.set_typing(false);
    }
}

/// Message send orchestrator.
#[derive(Clone)]
pub struct MessageSendOrchestrator {
    service: Arc<dyn ChatService>,
    session: SessionStore,
    notifications: NotificationScheduler,
    synchronizer: ConversationListSynchronizer,
    ask_timeout: Duration,
    title_max_chars: usize,
}

impl MessageSendOrchestrator {
    /// Create an orchestrator over shared state.
    #[must_use]
    pub fn new(
        service: Arc<dyn ChatService>,
        session: SessionStore,
        notifications: NotificationScheduler,
        synchronizer: ConversationListSynchronizer,
    ) -> Self {
        Self {
            service,
            session,
            notifications,
            synchronizer,
            ask_timeout: Duration::from_secs(60),
            title_max_chars: 50,
        }
    }

    /// Bound on the remote ask; past it the send fails as a transport failure.
    #[must_use]
    pub const fn with_ask_timeout(mut self, timeout: Duration) -> Self {
        self.ask_timeout = timeout;
        self
    }

    /// Length limit for derived conversation titles.
    #[must_use]
    pub const fn with_title_max_chars(mut self, max: usize) -> Self {
        self.title_max_chars = max;
        self
    }

    /// Send `text` into `conversation_id`, or into a new conversation when `None`.
    ///
    /// Only one send runs at a time per session; a second one returns
    /// [`SendOutcome::Busy`] without touching state. Failures never propagate:
    /// they end as a sticky error plus exactly one error notice, and the
    /// optimistic user message stays visible. A reply that arrives after the
    /// user moved to another conversation is not shown there.
    pub async fn send(&self, text: &str, conversation_id: Option<&ConversationId>) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Empty;
        }
        if !self.session.try_begin_typing() {
            debug!("Send rejected, another send is in flight");
            return SendOutcome::Busy;
        }
        let guard = TypingGuard {
            session: &self.session,
        };

        let user_message = Message::now(
            MessageId::temporary(),
            Role::User,
            text,
            conversation_id.cloned().unwrap_or_else(ConversationId::placeholder),
        );
        self.show_optimistic(&user_message, conversation_id);

        info!(
            conversation_id = conversation_id.map_or("new", ConversationId::as_str),
            chars = text.chars().count(),
            "Sending message"
        );
        let reply = match tokio::time::timeout(
            self.ask_timeout,
            self.service.ask(text, conversation_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        };

        let outcome = match reply {
            Ok(reply) => {
                let delivery = self.install_reply(user_message, reply, conversation_id);
                self.session.clear_error();
                SendOutcome::Delivered(delivery)
            }
            Err(err) => SendOutcome::Failed(self.fail(&err)),
        };
        drop(guard);

        if outcome.is_delivered() {
            self.synchronizer.refresh().await;
        }
        outcome
    }

    /// Put the user's message on screen before the service answers.
    ///
    /// An existing conversation gets a plain append. A new one gets an unsaved
    /// draft holding only this message, replaced wholesale on success.
    fn show_optimistic(&self, message: &Message, conversation_id: Option<&ConversationId>) {
        if let Some(id) = conversation_id {
            self.session.append_message_to(id, message.clone());
            return;
        }
        let now = Utc::now();
        let draft = Conversation {
            id: ConversationId::placeholder(),
            title: derive_title(&message.content, self.title_max_chars),
            user_id: UserId::default(),
            created_at: now,
            updated_at: now,
            message_count: 1,
        };
        self.session.set_current_conversation(Some(ConversationWithMessages {
            conversation: draft,
            messages: vec![message.clone()],
        }));
    }

    /// Show the reply if the user is still looking at the conversation it
    /// belongs to. Otherwise the post-send refresh is all that changes.
    fn install_reply(
        &self,
        mut user_message: Message,
        reply: ChatResponse,
        target: Option<&ConversationId>,
    ) -> Delivery {
        let ChatResponse {
            response,
            conversation_id,
            message_id,
        } = reply;
        let assistant = Message::now(
            message_id.clone(),
            Role::Assistant,
            response,
            conversation_id.clone(),
        );

        let created = target.is_none();
        if let Some(target) = target {
            if self.session.append_message_to(target, assistant) {
                debug!(%conversation_id, %message_id, "Reply appended");
            } else {
                info!(%conversation_id, "Reply arrived after navigation; not shown");
            }
        } else {
            let now = Utc::now();
            user_message.conversation_id = conversation_id.clone();
            let conversation = Conversation {
                id: conversation_id.clone(),
                title: derive_title(&user_message.content, self.title_max_chars),
                user_id: UserId::default(),
                created_at: now,
                updated_at: now,
                message_count: 2,
            };
            let installed = self.session.replace_draft(ConversationWithMessages {
                conversation,
                messages: vec![user_message, assistant],
            });
            if installed {
                info!(%conversation_id, "Conversation created");
            } else {
                info!(%conversation_id, "Conversation created after navigation; not opened");
            }
        }

        Delivery {
            conversation_id,
            assistant_message_id: message_id,
            created,
        }
    }

    fn fail(&self, err: &ApiError) -> SendFailure {
        warn!(%err, "Send failed");
        let class = err.class();
        let (message, notice) = match class {
            FailureClass::Business => {
                let message = err.user_message(SEND_FAILED);
                (message.clone(), message)
            }
            FailureClass::Transport => (SEND_FAILED.to_string(), NETWORK_NOTICE.to_string()),
        };
        self.session.set_error(Some(message.clone()));
        self.notifications.notify(Severity::Error, notice);
        SendFailure { class, message }
    }
}
