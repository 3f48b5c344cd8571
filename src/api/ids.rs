//! Identifier types exchanged with the remote chat service.
//!
//! The service issues opaque string ids. They are wrapped in newtypes so a
//! conversation id can never be passed where a message id is expected.
//! Message ids may also be *temporary*: generated locally for an optimistic
//! message before the server round-trip completes.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Prefix carried by every locally generated message id.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Process-wide counter disambiguating temporary ids minted in the same millisecond.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Declare a string newtype with a consistent API.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-issued identifier.
            #[inline]
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into `String`.
            #[inline]
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }

            /// True when no identifier has been assigned yet.
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<$name> for String {
            #[inline]
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Server-issued conversation identifier.
    ///
    /// The empty value is the placeholder used by optimistic messages of a
    /// conversation that does not exist server-side yet.
    ConversationId
);

define_string_id!(
    /// Message identifier, either server-issued or temporary.
    MessageId
);

define_string_id!(
    /// User account identifier.
    UserId
);

impl ConversationId {
    /// Placeholder for a conversation not yet created on the server.
    #[inline]
    #[must_use]
    pub const fn placeholder() -> Self {
        Self(String::new())
    }
}

impl MessageId {
    /// Mint a temporary id for an optimistic message.
    ///
    /// Ids are derived from the wall clock plus a process-wide sequence, so
    /// two ids minted within the same millisecond still differ. A temporary
    /// id is never handed out twice during the process lifetime.
    #[must_use]
    pub fn temporary() -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{TEMP_ID_PREFIX}{millis}-{seq}"))
    }

    /// True for ids minted by [`MessageId::temporary`].
    #[inline]
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn temporary_ids_are_unique_in_a_burst() {
        let ids: HashSet<MessageId> = (0..1_000).map(|_| MessageId::temporary()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn temporary_ids_are_recognisable() {
        assert!(MessageId::temporary().is_temporary());
        assert!(!MessageId::new("m1").is_temporary());
    }

    #[test]
    fn placeholder_conversation_id_is_empty() {
        assert!(ConversationId::placeholder().is_empty());
        assert_eq!(ConversationId::from("c1").to_string(), "c1");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ConversationId::new("c1")).unwrap_or_default();
        assert_eq!(json, "\"c1\"");
    }
}
