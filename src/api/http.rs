//! `reqwest`-backed implementation of the remote chat and auth services.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::storage::{AUTH_TOKEN_KEY, KeyValueStore, USER_KEY};

use super::error::{ApiError, ApiResult};
use super::ids::ConversationId;
use super::service::{AuthApi, ChatService};
use super::types::{
    ChatRequest, ChatResponse, Conversation, ConversationCreate, LogoutResponse, Message, Token,
    User, UserCreate, UserLogin,
};

/// Relative endpoint paths under the API root.
mod endpoints {
    pub const ASK: &[&str] = &["chat", "ask"];
    pub const CONVERSATIONS: &[&str] = &["conversations"];
    pub const REGISTER: &[&str] = &["auth", "register"];
    pub const LOGIN: &[&str] = &["auth", "login"];
    pub const LOGOUT: &[&str] = &["auth", "logout"];
    pub const ME: &[&str] = &["auth", "me"];
    pub const MESSAGES: &str = "messages";
}

/// HTTP client for the remote chat service.
///
/// The bearer token is read from the durable store on every request, so a
/// login or logout takes effect without rebuilding the client. A `401`
/// answer clears the persisted token and user record.
pub struct HttpChatService {
    client: Client,
    root: Url,
    storage: Arc<dyn KeyValueStore>,
}

impl HttpChatService {
    /// Build the adapter from the client configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: Arc<dyn KeyValueStore>) -> ApiResult<Self> {
        let root = config
            .api_root()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .gzip(true)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            root,
            storage,
        })
    }

    /// API root every endpoint is resolved against.
    #[must_use]
    pub const fn root(&self) -> &Url {
        &self.root
    }

    /// Resolve an endpoint from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Client(format!("{} cannot be a base url", self.root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn conversation_endpoint(&self, id: &ConversationId, tail: Option<&str>) -> ApiResult<Url> {
        let mut segments: Vec<&str> = endpoints::CONVERSATIONS.to_vec();
        segments.push(id.as_str());
        segments.extend(tail);
        self.endpoint(&segments)
    }

    fn bearer(&self) -> Option<HeaderValue> {
        let token = self.storage.get(AUTH_TOKEN_KEY)?;
        HeaderValue::from_str(&format!("Bearer {token}")).ok()
    }

    fn clear_auth_data(&self) {
        for key in [AUTH_TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, %err, "Failed to clear persisted auth data");
            }
        }
    }

    /// Send one request and map non-success answers to [`ApiError::Status`].
    async fn execute<B>(&self, method: Method, url: Url, body: Option<&B>) -> ApiResult<Response>
    where
        B: Serialize + Sync + ?Sized,
    {
        let span = info_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %method,
            path = url.path(),
        );

        async move {
            let started = Instant::now();
            let mut request = self.client.request(method, url);
            if let Some(bearer) = self.bearer() {
                request = request.header(AUTHORIZATION, bearer);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|err| {
                warn!(%err, "Request did not reach the service");
                ApiError::from(err)
            })?;

            let status = response.status();
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if status.is_success() {
                debug!(status = status.as_u16(), elapsed_ms, "Request completed");
                return Ok(response);
            }

            let raw = response.text().await.unwrap_or_default();
            let detail = error_detail(&raw).or_else(|| status.canonical_reason().map(str::to_string));
            warn!(status = status.as_u16(), elapsed_ms, ?detail, "Service rejected request");

            if status == StatusCode::UNAUTHORIZED {
                self.clear_auth_data();
            }
            Err(ApiError::status(status.as_u16(), detail))
        }
        .instrument(span)
        .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let response = self.execute::<()>(Method::GET, url, None).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B, T>(&self, url: Url, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(Method::POST, url, body).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Extract the human-readable `detail` of an error body.
///
/// Handles the plain string form and the validation-error list form
/// (`[{"msg": ...}, ...]`).
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn list_conversations(&self) -> ApiResult<Vec<Conversation>> {
        self.get_json(self.endpoint(endpoints::CONVERSATIONS)?).await
    }

    async fn get_conversation(&self, id: &ConversationId) -> ApiResult<Conversation> {
        self.get_json(self.conversation_endpoint(id, None)?).await
    }

    async fn list_messages(&self, conversation_id: &ConversationId) -> ApiResult<Vec<Message>> {
        let url = self.conversation_endpoint(conversation_id, Some(endpoints::MESSAGES))?;
        self.get_json(url).await
    }

    async fn create_conversation(&self, title: &str) -> ApiResult<Conversation> {
        let body = ConversationCreate { title };
        self.post_json(self.endpoint(endpoints::CONVERSATIONS)?, Some(&body))
            .await
    }

    async fn delete_conversation(&self, id: &ConversationId) -> ApiResult<()> {
        let url = self.conversation_endpoint(id, None)?;
        self.execute::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn ask(
        &self,
        message: &str,
        conversation_id: Option<&ConversationId>,
    ) -> ApiResult<ChatResponse> {
        let body = ChatRequest {
            message,
            conversation_id,
        };
        self.post_json(self.endpoint(endpoints::ASK)?, Some(&body))
            .await
    }
}

#[async_trait]
impl AuthApi for HttpChatService {
    async fn register(&self, user: &UserCreate) -> ApiResult<Token> {
        self.post_json(self.endpoint(endpoints::REGISTER)?, Some(user))
            .await
    }

    async fn login(&self, credentials: &UserLogin) -> ApiResult<Token> {
        self.post_json(self.endpoint(endpoints::LOGIN)?, Some(credentials))
            .await
    }

    async fn logout(&self) -> ApiResult<LogoutResponse> {
        self.post_json::<(), _>(self.endpoint(endpoints::LOGOUT)?, None)
            .await
    }

    async fn me(&self) -> ApiResult<User> {
        self.get_json(self.endpoint(endpoints::ME)?).await
    }
}
