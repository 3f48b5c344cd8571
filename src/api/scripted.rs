//! Scripted in-memory service used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::error::{ApiError, ApiResult};
use super::ids::{ConversationId, UserId};
use super::service::{AuthApi, ChatService};
use super::types::{
    ChatResponse, Conversation, LogoutResponse, Message, Token, User, UserCreate, UserLogin,
};

/// Build a conversation summary with fixed timestamps.
pub fn conversation(id: &str, title: &str, message_count: u32) -> Conversation {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).single().unwrap_or_default();
    Conversation {
        id: ConversationId::new(id),
        title: title.to_string(),
        user_id: UserId::new("u1"),
        created_at: at,
        updated_at: at,
        message_count,
    }
}

/// Build a user record.
pub fn user(name: &str) -> User {
    User {
        id: UserId::new("u1"),
        email: "driver@example.com".to_string(),
        full_name: name.to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}

/// Every call the double received, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ListConversations,
    GetConversation(String),
    ListMessages(String),
    CreateConversation(String),
    DeleteConversation(String),
    Ask {
        message: String,
        conversation_id: Option<String>,
    },
    Register(String),
    Login(String),
    Logout,
    Me,
}

/// Returns queued results per operation; unscripted calls fall back to defaults.
#[derive(Default)]
pub struct ScriptedService {
    calls: Mutex<Vec<Call>>,
    conversations: Mutex<Vec<Conversation>>,
    list_results: Mutex<VecDeque<ApiResult<Vec<Conversation>>>>,
    get_results: Mutex<VecDeque<ApiResult<Conversation>>>,
    message_results: Mutex<VecDeque<ApiResult<Vec<Message>>>>,
    delete_results: Mutex<VecDeque<ApiResult<()>>>,
    ask_results: Mutex<VecDeque<ApiResult<ChatResponse>>>,
    token_results: Mutex<VecDeque<ApiResult<Token>>>,
    logout_results: Mutex<VecDeque<ApiResult<LogoutResponse>>>,
    me_results: Mutex<VecDeque<ApiResult<User>>>,
    ask_delay: Mutex<Option<Duration>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server-side conversations returned by unscripted list calls.
    pub fn with_conversations(self, conversations: Vec<Conversation>) -> Self {
        *lock(&self.conversations) = conversations;
        self
    }

    pub fn push_list(&self, result: ApiResult<Vec<Conversation>>) {
        lock(&self.list_results).push_back(result);
    }

    pub fn push_get(&self, result: ApiResult<Conversation>) {
        lock(&self.get_results).push_back(result);
    }

    pub fn push_messages(&self, result: ApiResult<Vec<Message>>) {
        lock(&self.message_results).push_back(result);
    }

    pub fn push_delete(&self, result: ApiResult<()>) {
        lock(&self.delete_results).push_back(result);
    }

    pub fn push_ask(&self, result: ApiResult<ChatResponse>) {
        lock(&self.ask_results).push_back(result);
    }

    pub fn push_token(&self, result: ApiResult<Token>) {
        lock(&self.token_results).push_back(result);
    }

    pub fn push_logout(&self, result: ApiResult<LogoutResponse>) {
        lock(&self.logout_results).push_back(result);
    }

    pub fn push_me(&self, result: ApiResult<User>) {
        lock(&self.me_results).push_back(result);
    }

    /// Delay every `ask` reply by `delay`.
    pub fn delay_ask(&self, delay: Duration) {
        *lock(&self.ask_delay) = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }
}

fn unscripted(op: &str) -> ApiError {
    ApiError::Transport(format!("no scripted reply for {op}"))
}

#[async_trait]
impl ChatService for ScriptedService {
    async fn list_conversations(&self) -> ApiResult<Vec<Conversation>> {
        self.record(Call::ListConversations);
        let scripted = lock(&self.list_results).pop_front();
        scripted.unwrap_or_else(|| Ok(lock(&self.conversations).clone()))
    }

    async fn get_conversation(&self, id: &ConversationId) -> ApiResult<Conversation> {
        self.record(Call::GetConversation(id.to_string()));
        let scripted = lock(&self.get_results).pop_front();
        scripted.unwrap_or_else(|| {
            lock(&self.conversations)
                .iter()
                .find(|c| &c.id == id)
                .cloned()
                .ok_or_else(|| ApiError::status(404, Some("Conversation not found".into())))
        })
    }

    async fn list_messages(&self, conversation_id: &ConversationId) -> ApiResult<Vec<Message>> {
        self.record(Call::ListMessages(conversation_id.to_string()));
        let scripted = lock(&self.message_results).pop_front();
        scripted.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_conversation(&self, title: &str) -> ApiResult<Conversation> {
        self.record(Call::CreateConversation(title.to_string()));
        let created = conversation("created", title, 0);
        lock(&self.conversations).insert(0, created.clone());
        Ok(created)
    }

    async fn delete_conversation(&self, id: &ConversationId) -> ApiResult<()> {
        self.record(Call::DeleteConversation(id.to_string()));
        let scripted = lock(&self.delete_results).pop_front();
        let result = scripted.unwrap_or(Ok(()));
        if result.is_ok() {
            lock(&self.conversations).retain(|c| &c.id != id);
        }
        result
    }

    async fn ask(
        &self,
        message: &str,
        conversation_id: Option<&ConversationId>,
    ) -> ApiResult<ChatResponse> {
        self.record(Call::Ask {
            message: message.to_string(),
            conversation_id: conversation_id.map(ToString::to_string),
        });
        let delay = *lock(&self.ask_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = lock(&self.ask_results).pop_front();
        scripted.unwrap_or_else(|| Err(unscripted("ask")))
    }
}

#[async_trait]
impl AuthApi for ScriptedService {
    async fn register(&self, user: &UserCreate) -> ApiResult<Token> {
        self.record(Call::Register(user.email.clone()));
        let scripted = lock(&self.token_results).pop_front();
        scripted.unwrap_or_else(|| Err(unscripted("register")))
    }

    async fn login(&self, credentials: &UserLogin) -> ApiResult<Token> {
        self.record(Call::Login(credentials.email.clone()));
        let scripted = lock(&self.token_results).pop_front();
        scripted.unwrap_or_else(|| Err(unscripted("login")))
    }

    async fn logout(&self) -> ApiResult<LogoutResponse> {
        self.record(Call::Logout);
        let scripted = lock(&self.logout_results).pop_front();
        scripted.unwrap_or_else(|| Ok(LogoutResponse::default()))
    }

    async fn me(&self) -> ApiResult<User> {
        self.record(Call::Me);
        let scripted = lock(&self.me_results).pop_front();
        scripted.unwrap_or_else(|| Err(unscripted("me")))
    }
}
