//! Status notification refresh loop.
//!
//! Once per interval the loop samples the inbound message counter, converts it
//! to messages per minute and republishes the ongoing status notification with
//! the bot's avatar. The avatar is downloaded once, before the first publish,
//! and cached for the lifetime of the loop. Everything stops when the session's
//! cancellation token fires.

use crate::avatar::{download_avatar, AvatarFetcher};
use bot_console_core::rate::per_minute;
use bot_console_core::{
    AvatarRetryPolicy, BotEvent, BotEventHandler, BotSession, ConsoleSettings, LogBuffer,
    Notification, Notifier, RateCounter,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Refresh loop configuration.
#[derive(Debug, Clone)]
pub struct RefreshLoopConfig {
    /// Period between publishes.
    pub interval: Duration,
    /// Delay policy between avatar download attempts.
    pub avatar_retry: AvatarRetryPolicy,
    /// Name shown in the notification title.
    pub console_name: String,
}

impl RefreshLoopConfig {
    /// Derive the loop configuration from console settings.
    #[must_use]
    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        Self {
            interval: settings.refresh_interval(),
            avatar_retry: settings.avatar_retry_policy(),
            console_name: settings.console_name.clone(),
        }
    }
}

/// Counts every inbound message of a session.
pub struct MessageCounter {
    counter: Arc<RateCounter>,
}

impl MessageCounter {
    /// Count into `counter`.
    #[must_use]
    pub const fn new(counter: Arc<RateCounter>) -> Self {
        Self { counter }
    }
}

impl BotEventHandler for MessageCounter {
    fn on_event(&self, event: &BotEvent) {
        if matches!(event, BotEvent::MessageReceived { .. }) {
            self.counter.increment();
        }
    }
}

/// Periodic status notification publisher for one bot session.
pub struct RefreshLoop {
    session: Arc<dyn BotSession>,
    notifier: Arc<dyn Notifier>,
    avatars: Arc<dyn AvatarFetcher>,
    logs: LogBuffer,
    counter: Arc<RateCounter>,
    config: RefreshLoopConfig,
}

impl RefreshLoop {
    /// Create a loop for `session` with its own message counter.
    #[must_use]
    pub fn new(
        session: Arc<dyn BotSession>,
        notifier: Arc<dyn Notifier>,
        avatars: Arc<dyn AvatarFetcher>,
        logs: LogBuffer,
        config: RefreshLoopConfig,
    ) -> Self {
        Self {
            session,
            notifier,
            avatars,
            logs,
            counter: Arc::new(RateCounter::new()),
            config,
        }
    }

    /// The counter sampled by this loop.
    #[must_use]
    pub fn counter(&self) -> Arc<RateCounter> {
        Arc::clone(&self.counter)
    }

    /// Reset the counter, start counting the session's messages and spawn the loop.
    pub fn start(self) -> JoinHandle<()> {
        self.counter.reset();
        self.session
            .register_handler(Arc::new(MessageCounter::new(self.counter())));
        tokio::spawn(self.run())
    }

    /// Run the loop until the session is cancelled.
    pub async fn run(self) {
        let cancel = self.session.cancellation_token();
        let bot_id = self.session.id();
        let url = self.session.avatar_url();

        let Some(avatar) = download_avatar(
            self.avatars.as_ref(),
            &url,
            self.config.avatar_retry,
            &self.logs,
            &cancel,
        )
        .await
        else {
            debug!(bot_id, "Session ended before the avatar was loaded");
            return;
        };
        info!(bot_id, "Status notification refresh started");

        while !cancel.is_cancelled() {
            let count = self.counter.take();
            let rate = per_minute(count, self.config.interval);
            let notification = Notification::status(&self.config.console_name, rate, avatar.clone());
            if let Err(e) = self.notifier.notify(notification) {
                warn!(bot_id, error = %e, "Status notification publish failed");
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!(bot_id, "Status notification refresh stopped");
    }
}

/// Build and start a refresh loop for `session`.
pub fn spawn_refresh_loop(
    session: Arc<dyn BotSession>,
    notifier: Arc<dyn Notifier>,
    avatars: Arc<dyn AvatarFetcher>,
    logs: LogBuffer,
    config: RefreshLoopConfig,
) -> JoinHandle<()> {
    RefreshLoop::new(session, notifier, avatars, logs, config).start()
}
