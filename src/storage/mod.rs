//! Durable key-value store holding the auth token, user record and UI preferences.
//!
//! The core only needs "read/write a named slot". Two backends are provided:
//! - [`MemoryKeyValueStore`] for tests and ephemeral sessions
//! - [`FileKeyValueStore`], one JSON object on disk

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

/// Key of the bearer token slot.
pub const AUTH_TOKEN_KEY: &str = "traffic_ai_token";
/// Key of the UI preferences slot (theme and sidebar).
pub const THEME_KEY: &str = "traffic_ai_theme";
/// Key of the persisted user summary slot.
pub const USER_KEY: &str = "traffic_ai_user";

/// A string-to-string durable store.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a slot, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the backend cannot persist the value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a slot. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns an error if the backend cannot persist the removal.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
