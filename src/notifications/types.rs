//! Notification records.

use core::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of a notice, unique and increasing within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity class, drives presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Error,
    /// Something needs attention.
    Warning,
    /// Neutral information.
    Info,
}

/// How long a notice stays before it removes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// The scheduler's configured default lifetime.
    #[default]
    Default,
    /// A specific lifetime. A zero duration means persistent.
    After(Duration),
    /// Stays until dismissed.
    Persistent,
}

impl Ttl {
    /// Resolve against the scheduler default; `None` means persistent.
    #[must_use]
    pub fn resolve(self, default: Duration) -> Option<Duration> {
        let ttl = match self {
            Self::Default => default,
            Self::After(ttl) => ttl,
            Self::Persistent => return None,
        };
        (!ttl.is_zero()).then_some(ttl)
    }
}

/// One notice in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique id.
    pub id: NotificationId,
    /// Severity class.
    pub severity: Severity,
    /// Text shown to the user.
    pub message: String,
    /// Lifetime; `None` for a persistent notice.
    #[serde(skip)]
    pub ttl: Option<Duration>,
}
