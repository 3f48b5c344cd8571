//! Ephemeral user-facing notices with self-expiring timers.

pub mod scheduler;
pub mod types;

pub use scheduler::NotificationScheduler;
pub use types::{Notification, NotificationId, Severity, Ttl};
