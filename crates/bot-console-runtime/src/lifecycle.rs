//! Offline and relogin notifications.

use bot_console_core::{
    BotEvent, BotEventHandler, LogBuffer, Notification, NotificationId, Notifier, OfflineKind,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns connection lifecycle events into offline alerts.
pub struct LifecycleNotifier {
    console_name: String,
    logs: LogBuffer,
    notifier: Arc<dyn Notifier>,
}

impl LifecycleNotifier {
    /// Create a handler publishing through `notifier` and logging to `logs`.
    #[must_use]
    pub fn new(console_name: impl Into<String>, logs: LogBuffer, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            console_name: console_name.into(),
            logs,
            notifier,
        }
    }

    fn on_offline(&self, kind: &OfflineKind) {
        let notification = match kind {
            OfflineKind::Dropped => Notification::offline_dropped(&self.console_name),
            OfflineKind::Force { message } => {
                Notification::offline_forced(&self.console_name, message)
            }
            OfflineKind::Active | OfflineKind::RequireReconnect => {
                debug!(?kind, "Offline event without alert");
                return;
            }
        };

        self.logs.push("[INFO] Sending offline notification....");
        if let Err(e) = self.notifier.notify(notification) {
            warn!(error = %e, "Offline notification publish failed");
        }
    }

    fn on_relogin(&self) {
        self.logs.push("[INFO] Sending online notification....");
        if let Err(e) = self.notifier.cancel(NotificationId::OFFLINE) {
            warn!(error = %e, "Failed to clear offline notification");
        }
    }
}

impl BotEventHandler for LifecycleNotifier {
    fn on_event(&self, event: &BotEvent) {
        match event {
            BotEvent::Offline(kind) => self.on_offline(kind),
            BotEvent::Relogin => self.on_relogin(),
            BotEvent::MessageReceived { .. } => {}
        }
    }
}
