//! User-facing notification entries.

use std::collections::VecDeque;

/// Oldest entries are dropped past this many
pub const MAX_NOTIFICATIONS: usize = 32;

/// A notification entry with message and timestamp
#[derive(Debug, Clone)]
pub struct NotificationEntry {
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Local>,
}

impl NotificationEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: chrono::Local::now(),
        }
    }
}

/// Push an entry, trimming the queue to [`MAX_NOTIFICATIONS`]
pub fn push_notification(queue: &mut VecDeque<NotificationEntry>, message: impl Into<String>) {
    queue.push_back(NotificationEntry::new(message));
    while queue.len() > MAX_NOTIFICATIONS {
        queue.pop_front();
    }
}
