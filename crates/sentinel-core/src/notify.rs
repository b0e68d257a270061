//! Notification broker.
//!
//! Keeps the most recent [`MAX_NOTIFICATIONS`] events in a newest-first
//! ring buffer. Events are transient: they are relayed to peers as
//! `ACTION_NOTIF` but never persisted.

use std::collections::VecDeque;

use chrono::Utc;
use sentinel_types::{MAX_NOTIFICATIONS, Notice, NotificationEvent, NotificationId, NotificationTier};
use tracing::debug;

/// Newest-first ring buffer of notification events.
#[derive(Debug, Clone)]
pub struct NotificationBroker {
    events: VecDeque<NotificationEvent>,
    capacity: usize,
}

impl NotificationBroker {
    /// Create a broker holding at most [`MAX_NOTIFICATIONS`] events.
    pub fn new() -> Self {
        Self::with_capacity(MAX_NOTIFICATIONS)
    }

    /// Create a broker with an explicit capacity (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a fresh event and record it.
    ///
    /// The caller forwards the returned event to the sync channel.
    pub fn emit(
        &mut self,
        tier: NotificationTier,
        message: impl Into<String>,
        urgency: f64,
    ) -> NotificationEvent {
        let event = NotificationEvent {
            id: NotificationId::new(),
            tier,
            message: message.into(),
            timestamp: Utc::now(),
            urgency,
        };
        debug!(tier = ?event.tier, message = %event.message, "Notification emitted");
        self.push(event.clone());
        event
    }

    /// Emit a [`Notice`] produced by the simulation rules.
    pub fn emit_notice(&mut self, notice: Notice) -> NotificationEvent {
        self.emit(notice.tier, notice.message, notice.urgency)
    }

    /// Record an event relayed by a peer. No deduplication.
    pub fn record_relayed(&mut self, event: NotificationEvent) {
        self.push(event);
    }

    /// All buffered events, newest first.
    pub fn recent(&self) -> Vec<NotificationEvent> {
        self.events.iter().cloned().collect()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, event: NotificationEvent) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }
}

impl Default for NotificationBroker {
    fn default() -> Self {
        Self::new()
    }
}
