//! Remote chat service: wire types, error taxonomy, service contracts and the HTTP adapter.

pub mod error;
pub mod http;
pub mod ids;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod scripted;

pub use error::{ApiError, ApiResult, FailureClass};
pub use http::HttpChatService;
pub use ids::{ConversationId, MessageId, UserId};
pub use service::{AuthApi, ChatService};
pub use types::{
    ChatResponse, Conversation, ConversationWithMessages, LogoutResponse, Message, Role, Token,
    User, UserCreate, UserLogin,
};
