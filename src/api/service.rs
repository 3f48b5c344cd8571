//! Contracts of the remote services consumed by the client core.

use async_trait::async_trait;

use super::error::ApiResult;
use super::ids::ConversationId;
use super::types::{
    ChatResponse, Conversation, LogoutResponse, Message, Token, User, UserCreate, UserLogin,
};

/// Authoritative store of conversations and messages.
///
/// Every call either succeeds or fails with an [`ApiError`](super::ApiError);
/// implementations never retry.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// List the caller's conversation summaries.
    async fn list_conversations(&self) -> ApiResult<Vec<Conversation>>;

    /// Fetch one conversation summary.
    async fn get_conversation(&self, id: &ConversationId) -> ApiResult<Conversation>;

    /// Fetch the messages of a conversation in display order.
    async fn list_messages(&self, conversation_id: &ConversationId) -> ApiResult<Vec<Message>>;

    /// Create an empty conversation.
    async fn create_conversation(&self, title: &str) -> ApiResult<Conversation>;

    /// Delete a conversation and all its messages.
    async fn delete_conversation(&self, id: &ConversationId) -> ApiResult<()>;

    /// Send a message, optionally inside an existing conversation, and get the reply.
    async fn ask(
        &self,
        message: &str,
        conversation_id: Option<&ConversationId>,
    ) -> ApiResult<ChatResponse>;
}

/// Account endpoints of the remote service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Create an account and obtain a token.
    async fn register(&self, user: &UserCreate) -> ApiResult<Token>;

    /// Exchange credentials for a token.
    async fn login(&self, credentials: &UserLogin) -> ApiResult<Token>;

    /// Invalidate the current token server-side.
    async fn logout(&self) -> ApiResult<LogoutResponse>;

    /// Fetch the user the current token belongs to.
    async fn me(&self) -> ApiResult<User>;
}
