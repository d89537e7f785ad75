use crate::domain::model::{Notification, Severity};
use crate::domain::ports::Notifier;
use std::sync::Mutex;

/// Writes notifications to the log at a level matching their severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => {
                tracing::info!("✅ {}: {}", notification.title, notification.description)
            }
            Severity::Warning => {
                tracing::warn!("🔖 {}: {}", notification.title, notification.description)
            }
            Severity::Error => {
                tracing::error!("❌ {}: {}", notification.title, notification.description)
            }
        }
    }
}

/// Keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains what has been received so far.
    pub fn take(&self) -> Vec<Notification> {
        let mut received = self
            .received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *received)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}
