//! Sign-in flows: remote call, state update, user-facing notice.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{ApiError, AuthApi, Token, UserCreate, UserLogin};
use crate::notifications::{NotificationScheduler, Severity};
use crate::session::SessionStore;

use super::store::AuthStore;

const REGISTER_FAILED: &str = "Registration failed";
const REGISTER_UNREACHABLE: &str = "Registration failed. Please try again.";
const LOGIN_FAILED: &str = "Login failed";
const LOGIN_UNREACHABLE: &str = "Login failed. Please check your credentials.";
const LOGGED_OUT: &str = "You have been logged out successfully.";

/// Drives the auth service and keeps [`AuthStore`] in step.
#[derive(Clone)]
pub struct AuthSession {
    api: Arc<dyn AuthApi>,
    store: AuthStore,
    session: SessionStore,
    notifications: NotificationScheduler,
}

impl AuthSession {
    /// Create the flow over shared state.
    #[must_use]
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: AuthStore,
        session: SessionStore,
        notifications: NotificationScheduler,
    ) -> Self {
        Self {
            api,
            store,
            session,
            notifications,
        }
    }

    /// Auth state handle.
    #[must_use]
    pub const fn store(&self) -> &AuthStore {
        &self.store
    }

    /// Create an account and sign in. Returns whether it succeeded.
    pub async fn register(&self, user: &UserCreate) -> bool {
        self.store.set_loading(true);
        self.store.clear_error();
        match self.api.register(user).await {
            Ok(token) => {
                let name = token.user.full_name.clone();
                self.accept(token);
                self.notifications.notify(
                    Severity::Success,
                    format!("Welcome {name}! Your account has been created."),
                );
                true
            }
            Err(err) => {
                self.reject(&err, REGISTER_FAILED, REGISTER_UNREACHABLE);
                false
            }
        }
    }

    /// Sign in with email and password. Returns whether it succeeded.
    pub async fn login(&self, credentials: &UserLogin) -> bool {
        self.store.set_loading(true);
        self.store.clear_error();
        match self.api.login(credentials).await {
            Ok(token) => {
                let name = token.user.full_name.clone();
                self.accept(token);
                self.notifications
                    .notify(Severity::Success, format!("Welcome back, {name}!"));
                true
            }
            Err(err) => {
                self.reject(&err, LOGIN_FAILED, LOGIN_UNREACHABLE);
                false
            }
        }
    }

    /// Sign out. Local state is cleared even when the service call fails.
    pub async fn logout(&self) {
        let remote = self.api.logout().await;
        self.store.logout();
        self.session.clear_chat();
        match remote {
            Ok(_) => {
                info!("Signed out");
                self.notifications.notify(Severity::Info, LOGGED_OUT);
            }
            Err(err) => warn!(%err, "Remote logout failed; local session cleared anyway"),
        }
    }

    /// Validate the persisted token. Returns whether a user is signed in.
    ///
    /// With no token the local state is reset. With a token but no known user
    /// the service is asked who the token belongs to; any failure signs out.
    pub async fn check_auth(&self) -> bool {
        let Some(token) = self.store.persisted_token() else {
            self.store.logout();
            return false;
        };
        if self.store.snapshot().user.is_some() {
            return true;
        }

        self.store.set_loading(true);
        let valid = match self.api.me().await {
            Ok(user) => {
                if let Err(err) = self.store.login(token, user) {
                    warn!(%err, "Failed to persist restored session");
                }
                true
            }
            Err(err) => {
                warn!(%err, "Persisted token rejected");
                self.store.logout();
                false
            }
        };
        self.store.set_loading(false);
        valid
    }

    fn accept(&self, token: Token) {
        let Token {
            access_token, user, ..
        } = token;
        info!(user_id = %user.id, "Authenticated");
        if let Err(err) = self.store.login(access_token, user) {
            warn!(%err, "Failed to persist session; it will not survive a restart");
        }
    }

    fn reject(&self, err: &ApiError, fallback: &str, unreachable: &str) {
        warn!(%err, "Authentication failed");
        let message = if err.is_transport() {
            unreachable.to_string()
        } else {
            err.user_message(fallback)
        };
        self.store.set_error(Some(message.clone()));
        self.notifications.notify(Severity::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::scripted::{Call, ScriptedService, conversation, user};
    use crate::storage::{AUTH_TOKEN_KEY, KeyValueStore, MemoryKeyValueStore};

    struct Fixture {
        api: Arc<ScriptedService>,
        storage: Arc<MemoryKeyValueStore>,
        session: SessionStore,
        notifications: NotificationScheduler,
        auth: AuthSession,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(ScriptedService::new());
        let storage = Arc::new(MemoryKeyValueStore::new());
        let session = SessionStore::new();
        let notifications = NotificationScheduler::default();
        let auth = AuthSession::new(
            api.clone(),
            AuthStore::new(storage.clone()),
            session.clone(),
            notifications.clone(),
        );
        Fixture {
            api,
            storage,
            session,
            notifications,
            auth,
        }
    }

    fn token(name: &str) -> Token {
        Token {
            access_token: "tok".into(),
            token_type: "bearer".into(),
            user: user(name),
        }
    }

    fn credentials() -> UserLogin {
        UserLogin {
            email: "driver@example.com".into(),
            password: "secret".into(),
        }
    }

    #[tokio::test]
    async fn login_welcomes_back() {
        let f = fixture();
        f.api.push_token(Ok(token("Asha Rao")));

        assert!(f.auth.login(&credentials()).await);

        assert!(f.auth.store().is_authenticated());
        assert_eq!(f.storage.get(AUTH_TOKEN_KEY).as_deref(), Some("tok"));
        let notices = f.notifications.snapshot();
        assert_eq!(notices[0].message, "Welcome back, Asha Rao!");
        assert_eq!(notices[0].severity, Severity::Success);
    }

    #[tokio::test]
    async fn register_welcomes_new_user() {
        let f = fixture();
        f.api.push_token(Ok(token("Asha Rao")));
        let form = UserCreate {
            email: "driver@example.com".into(),
            full_name: "Asha Rao".into(),
            password: "secret".into(),
        };

        assert!(f.auth.register(&form).await);
        assert_eq!(
            f.notifications.snapshot()[0].message,
            "Welcome Asha Rao! Your account has been created."
        );
        assert_eq!(f.api.calls(), vec![Call::Register("driver@example.com".into())]);
    }

    #[tokio::test]
    async fn rejected_login_shows_detail() {
        let f = fixture();
        f.api
            .push_token(Err(ApiError::status(401, Some("Incorrect email or password".into()))));

        assert!(!f.auth.login(&credentials()).await);

        let state = f.auth.store().snapshot();
        assert!(!state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("Incorrect email or password"));
        assert_eq!(f.notifications.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_login_uses_generic_text() {
        let f = fixture();
        f.api.push_token(Err(ApiError::Transport("refused".into())));

        assert!(!f.auth.login(&credentials()).await);
        assert_eq!(f.auth.store().snapshot().error.as_deref(), Some(LOGIN_UNREACHABLE));
    }

    #[tokio::test]
    async fn logout_clears_even_when_service_fails() {
        let f = fixture();
        f.api.push_token(Ok(token("Asha Rao")));
        f.auth.login(&credentials()).await;
        f.session.set_conversations(vec![conversation("c1", "A", 1)]);
        f.api.push_logout(Err(ApiError::Transport("down".into())));

        f.auth.logout().await;

        assert!(!f.auth.store().is_authenticated());
        assert!(f.storage.is_empty());
        assert!(f.session.snapshot().conversations.is_empty());
    }

    #[tokio::test]
    async fn logout_notifies_on_success() {
        let f = fixture();
        f.auth.logout().await;
        assert_eq!(f.notifications.snapshot()[0].message, LOGGED_OUT);
        assert_eq!(f.notifications.snapshot()[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn check_auth_without_token_signs_out() {
        let f = fixture();
        assert!(!f.auth.check_auth().await);
        assert!(f.api.calls().is_empty());
    }

    #[tokio::test]
    async fn check_auth_restores_user_for_token() {
        let f = fixture();
        f.storage.set(AUTH_TOKEN_KEY, "tok").unwrap_or_default();
        f.api.push_me(Ok(user("Asha Rao")));

        assert!(f.auth.check_auth().await);

        let state = f.auth.store().snapshot();
        assert!(state.is_authenticated);
        assert!(!state.is_loading);
        assert_eq!(state.user.map(|u| u.full_name).as_deref(), Some("Asha Rao"));
    }

    #[tokio::test]
    async fn check_auth_with_rejected_token_signs_out() {
        let f = fixture();
        f.storage.set(AUTH_TOKEN_KEY, "stale").unwrap_or_default();
        f.api.push_me(Err(ApiError::status(401, None)));

        assert!(!f.auth.check_auth().await);
        assert!(f.storage.get(AUTH_TOKEN_KEY).is_none());
    }
}
