//! Wire and domain types shared by the remote chat service and the session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, MessageId, UserId};

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    User,
    /// Produced by the assistant.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Conversation summary as listed in the sidebar (no messages).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Server-issued identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Owner of the conversation.
    pub user_id: UserId,
    /// Creation time.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last activity time, computed server-side.
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Number of messages, computed server-side.
    pub message_count: u32,
}

/// One message of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server id, or a temporary id for an optimistic message.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Creation time.
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Owning conversation (placeholder while the conversation is unsaved).
    pub conversation_id: ConversationId,
}

impl Message {
    /// Build a message stamped with the current time.
    #[must_use]
    pub fn now(
        id: MessageId,
        role: Role,
        content: impl Into<String>,
        conversation_id: ConversationId,
    ) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
            conversation_id,
        }
    }

    /// True while the message still carries a locally generated id.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.id.is_temporary()
    }
}

/// The single active conversation together with its ordered messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationWithMessages {
    /// Summary fields.
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Messages in display order.
    pub messages: Vec<Message>,
}

impl ConversationWithMessages {
    /// Promote a summary to an active conversation with no loaded messages.
    #[must_use]
    pub const fn empty(conversation: Conversation) -> Self {
        Self {
            conversation,
            messages: Vec::new(),
        }
    }

    /// Conversation id shortcut.
    #[must_use]
    pub const fn id(&self) -> &ConversationId {
        &self.conversation.id
    }
}

/// Body of `POST /chat/ask`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest<'a> {
    /// User message.
    pub message: &'a str,
    /// Existing conversation, absent to start a new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<&'a ConversationId>,
}

/// Reply of `POST /chat/ask`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant reply text.
    pub response: String,
    /// Conversation the exchange belongs to (newly created or existing).
    pub conversation_id: ConversationId,
    /// Server id of the assistant message.
    pub message_id: MessageId,
}

/// Body of `POST /conversations`.
#[derive(Clone, Debug, Serialize)]
pub struct ConversationCreate<'a> {
    /// Title of the new conversation.
    pub title: &'a str,
}

/// Authenticated user record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account id.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Registration time.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Registration payload.
#[derive(Clone, Debug, Serialize)]
pub struct UserCreate {
    /// Login email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Plain password, sent over TLS only.
    pub password: String,
}

/// Login payload.
#[derive(Clone, Debug, Serialize)]
pub struct UserLogin {
    /// Login email.
    pub email: String,
    /// Plain password, sent over TLS only.
    pub password: String,
}

/// Access token issued on login or registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer token.
    pub access_token: String,
    /// Token scheme, normally `bearer`.
    pub token_type: String,
    /// The authenticated user.
    pub user: User,
}

/// Reply of `POST /auth/logout`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Server acknowledgement.
    #[serde(default)]
    pub message: String,
}

/// Timestamps as sent by the service.
///
/// Accepts RFC 3339 and naive ISO-8601 (interpreted as UTC); always writes RFC 3339.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
    }
}
