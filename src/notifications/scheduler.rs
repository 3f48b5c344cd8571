//! Notification list with one cancellable expiry task per notice.
//!
//! The list is published through a `watch` channel so the presentation layer
//! sees every change before it processes the next input. Each finite-TTL
//! notice owns exactly one spawned timer; removing the notice aborts the
//! timer, so a dismissed notice can never be "expired" a second time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use super::types::{Notification, NotificationId, Severity, Ttl};

struct Inner {
    list: watch::Sender<Vec<Notification>>,
    timers: DashMap<NotificationId, AbortHandle>,
    next_id: AtomicU64,
    default_ttl: Duration,
}

impl Inner {
    fn contains(&self, id: NotificationId) -> bool {
        self.list.borrow().iter().any(|n| n.id == id)
    }

    fn remove_entry(&self, id: NotificationId) -> bool {
        self.list.send_if_modified(|list| {
            let before = list.len();
            list.retain(|n| n.id != id);
            list.len() != before
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for entry in self.timers.iter() {
            entry.value().abort();
        }
    }
}

/// Owner of the notification list. Cheap to clone; clones share the list.
#[derive(Clone)]
pub struct NotificationScheduler {
    inner: Arc<Inner>,
}

impl NotificationScheduler {
    /// Default lifetime of a notice.
    pub const DEFAULT_TTL: Duration = Duration::from_millis(5_000);

    /// Create an empty scheduler whose notices live `default_ttl` unless told otherwise.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        let (list, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                list,
                timers: DashMap::new(),
                next_id: AtomicU64::new(1),
                default_ttl,
            }),
        }
    }

    /// Append a notice with the default lifetime.
    pub fn notify(&self, severity: Severity, message: impl Into<String>) -> NotificationId {
        self.add(severity, message, Ttl::Default)
    }

    /// Append a notice at the end of the list and schedule its expiry.
    ///
    /// Must be called from within a Tokio runtime for the expiry to be
    /// scheduled; outside one the notice stays until removed.
    pub fn add(&self, severity: Severity, message: impl Into<String>, ttl: Ttl) -> NotificationId {
        let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let ttl = ttl.resolve(self.inner.default_ttl);
        let notification = Notification {
            id,
            severity,
            message: message.into(),
            ttl,
        };
        debug!(%id, ?severity, ?ttl, "Notification added");
        self.inner.list.send_modify(|list| list.push(notification));

        if let Some(ttl) = ttl {
            self.schedule_expiry(id, ttl);
        }
        id
    }

    fn schedule_expiry(&self, id: NotificationId, ttl: Duration) {
        let Ok(handle) = Handle::try_current() else {
            warn!(%id, "No async runtime; notification will persist until dismissed");
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = weak.upgrade() {
                inner.timers.remove(&id);
                if inner.remove_entry(id) {
                    debug!(%id, "Notification expired");
                }
            }
        });

        self.inner.timers.insert(id, task.abort_handle());
        // The timer may already have fired on another worker thread.
        if !self.inner.contains(id) {
            self.inner.timers.remove(&id);
        }
    }

    /// Remove a notice and cancel its pending expiry.
    ///
    /// Idempotent: unknown or already-removed ids are ignored. Returns whether
    /// a notice was removed.
    pub fn remove(&self, id: NotificationId) -> bool {
        if let Some((_, timer)) = self.inner.timers.remove(&id) {
            timer.abort();
        }
        let removed = self.inner.remove_entry(id);
        if removed {
            debug!(%id, "Notification dismissed");
        }
        removed
    }

    /// Remove every notice and cancel every pending expiry.
    pub fn clear(&self) {
        let ids: Vec<NotificationId> = self.inner.timers.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, timer)) = self.inner.timers.remove(&id) {
                timer.abort();
            }
        }
        self.inner.list.send_if_modified(|list| {
            let changed = !list.is_empty();
            list.clear();
            changed
        });
    }

    /// Current list, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.list.borrow().clone()
    }

    /// Number of notices currently shown.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.list.borrow().len()
    }

    /// Whether no notice is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.list.borrow().is_empty()
    }

    /// Number of expiry timers still pending.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.len()
    }

    /// Receive every list change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.list.subscribe()
    }
}

impl Default for NotificationScheduler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
