//! Crate-level error type for building a client.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Failures while assembling a [`ChatClient`](crate::chat::ChatClient).
///
/// Operations on a running client never fail this way: they report
/// outcomes and surface problems through session state and notices.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The durable store could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The HTTP adapter could not be built.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ClientError>;
