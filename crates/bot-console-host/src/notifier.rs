//! Notifications rendered on the terminal.

use bot_console_core::{Notification, NotificationId, Notifier, TapAction};
use chrono::Local;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Prints notifications to stdout and remembers which ones are shown.
#[derive(Default)]
pub struct TerminalNotifier {
    shown: Mutex<HashMap<NotificationId, Notification>>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids currently shown.
    pub fn shown(&self) -> Vec<NotificationId> {
        let mut ids: Vec<_> = self
            .shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_by_key(|id| id.0);
        ids
    }
}

/// One-line rendering of a notification.
pub fn render(notification: &Notification) -> String {
    let time = notification.posted_at.with_timezone(&Local).format("%H:%M:%S");
    let mut line = format!(
        "[{time}] [{channel}] {title}: {text}",
        channel = notification.channel.id(),
        title = notification.title,
        text = notification.text,
    );
    match notification.tap_action {
        Some(TapAction::OpenCaptchaInput) => line.push_str(" (type `answer <code>`)"),
        Some(TapAction::OpenConsole) | None => {}
    }
    line
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        let line = render(&notification);
        info!(id = %notification.id, channel = notification.channel.id(), "Notification published");
        println!("{line}");
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(notification.id, notification);
        Ok(())
    }

    fn cancel(&self, id: NotificationId) -> anyhow::Result<()> {
        let removed = self
            .shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(notification) = removed {
            info!(id = %id, "Notification cleared");
            println!("[{}] cleared: {}", notification.channel.id(), notification.title);
        }
        Ok(())
    }
}
