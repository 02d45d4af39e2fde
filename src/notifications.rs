//! Transient user-facing notifications
//!
//! Each notification is retired exactly once: by an explicit dismiss or by
//! its expiry timer, whichever comes first. The other path becomes a no-op.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::shared::{UiSink, UiUpdate};

/// Time a notification stays visible unless dismissed
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// Identifier of a pushed notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a notification is styled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    /// Short label for text renderers
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Error => "error",
        }
    }
}

/// A live notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: u64,
    /// Insertion order, newest last
    live: Vec<Notification>,
}

/// Auto-expiring notification stack
///
/// Cloning yields another handle to the same queue. `push` schedules its
/// expiry on the current Tokio runtime.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    state: Arc<Mutex<QueueState>>,
    sink: UiSink,
    ttl: Duration,
}

impl NotificationQueue {
    /// Create a queue with a custom lifetime
    pub fn with_ttl(sink: UiSink, ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            sink,
            ttl,
        }
    }

    /// Show a notification and schedule its expiry
    pub fn push(&self, message: impl Into<String>, severity: Severity) -> NotificationId {
        let notification = {
            let mut state = self.state.lock();
            state.next_id += 1;
            let notification = Notification {
                id: NotificationId(state.next_id),
                message: message.into(),
                severity,
            };
            state.live.push(notification.clone());
            self.sink.send(UiUpdate::NotificationShown(notification.clone()));
            notification
        };

        debug!(
            "Notification {} [{}]: {}",
            notification.id,
            severity.label(),
            notification.message
        );

        let id = notification.id;
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(queue.ttl).await;
            if queue.dismiss(id) {
                trace!("Notification {} expired", id);
            }
        });

        id
    }

    /// Remove a notification; returns false if it was already gone
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let mut state = self.state.lock();
        let Some(pos) = state.live.iter().position(|n| n.id == id) else {
            return false;
        };
        state.live.remove(pos);
        self.sink.send(UiUpdate::NotificationRetired(id));
        true
    }
}

#[cfg(test)]
impl NotificationQueue {
    /// Create a queue with the default five second lifetime
    pub fn new(sink: UiSink) -> Self {
        Self::with_ttl(sink, DEFAULT_TTL)
    }

    /// Snapshot of live notifications, oldest first
    pub fn live(&self) -> Vec<Notification> {
        self.state.lock().live.clone()
    }
}
