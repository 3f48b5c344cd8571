//! Observable authentication state, mirrored into the durable store.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::User;
use crate::storage::{AUTH_TOKEN_KEY, KeyValueStore, StorageError, StorageResult, USER_KEY};

/// Who is signed in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Signed-in user, once known.
    pub user: Option<User>,
    /// Bearer token.
    pub token: Option<String>,
    /// True once both token and user are known.
    pub is_authenticated: bool,
    /// An auth call is in flight.
    pub is_loading: bool,
    /// Last auth failure shown to the user.
    pub error: Option<String>,
}

/// Shared handle to the auth state.
#[derive(Clone)]
pub struct AuthStore {
    state: Arc<watch::Sender<AuthState>>,
    storage: Arc<dyn KeyValueStore>,
}

impl AuthStore {
    /// Create the store, rehydrating token and user from `storage`.
    ///
    /// A token without a readable user record is kept unauthenticated until
    /// it is validated against the service.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let token = storage.get(AUTH_TOKEN_KEY);
        let user = storage.get(USER_KEY).and_then(|raw| {
            serde_json::from_str::<User>(&raw)
                .map_err(|err| warn!(%err, "Ignoring unreadable persisted user"))
                .ok()
        });
        let is_authenticated = token.is_some() && user.is_some();
        let (state, _) = watch::channel(AuthState {
            user,
            token,
            is_authenticated,
            ..AuthState::default()
        });
        Self {
            state: Arc::new(state),
            storage,
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Token currently persisted, which may differ from the in-memory one
    /// after the transport cleared it on a `401`.
    #[must_use]
    pub fn persisted_token(&self) -> Option<String> {
        self.storage.get(AUTH_TOKEN_KEY)
    }

    /// Record a successful sign-in and persist it.
    ///
    /// # Errors
    /// Returns an error if the token or user cannot be persisted. The
    /// in-memory state is updated regardless.
    pub fn login(&self, token: String, user: User) -> StorageResult<()> {
        let persisted = self.persist(&token, &user);
        debug!(user_id = %user.id, "Signed in");
        self.state.send_modify(|s| {
            *s = AuthState {
                user: Some(user),
                token: Some(token),
                is_authenticated: true,
                is_loading: false,
                error: None,
            };
        });
        persisted
    }

    fn persist(&self, token: &str, user: &User) -> StorageResult<()> {
        self.storage.set(AUTH_TOKEN_KEY, token)?;
        self.storage.set(USER_KEY, &serde_json::to_string(user)?)
    }

    /// Forget the user locally and in the durable store.
    ///
    /// Always resets the in-memory state, even if the store fails.
    pub fn logout(&self) {
        for key in [AUTH_TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, %err, "Failed to clear persisted auth data");
            }
        }
        self.state.send_modify(|s| *s = AuthState::default());
    }

    /// Set the loading flag.
    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_loading != loading;
            s.is_loading = loading;
            changed
        });
    }

    /// Set or clear the auth error; setting one settles the loading flag.
    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|s| {
            if error.is_some() {
                s.is_loading = false;
            }
            s.error = error;
        });
    }

    /// Clear the auth error.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Replace the user record, e.g. after a profile refresh.
    pub fn update_user(&self, user: User) {
        if let Err(err) = serde_json::to_string(&user)
            .map_err(StorageError::from)
            .and_then(|raw| self.storage.set(USER_KEY, &raw))
        {
            warn!(%err, "Failed to persist user record");
        }
        self.state.send_modify(|s| s.user = Some(user));
    }
}
