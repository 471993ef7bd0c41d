//! Notification model and the host notification seam.
//!
//! The console publishes three kinds of notifications: the ongoing status
//! notification carrying the message rate, the offline alert, and the captcha
//! alert. Presentation (icons, styling, intents) belongs to the [`Notifier`]
//! implementation; this module only describes what to show.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

/// Stable identifier of a published notification, used to replace or cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(pub i32);

impl NotificationId {
    /// Ongoing status notification.
    pub const STATUS: Self = Self(1);
    /// Captcha alert.
    pub const CAPTCHA: Self = Self(2);
    /// Offline alert.
    pub const OFFLINE: Self = Self(3);
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Logical channel a notification is posted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationChannel {
    /// General running status.
    Status,
    /// Offline alerts.
    Offline,
    /// Captcha requests.
    Captcha,
}

impl NotificationChannel {
    /// Channel identifier registered with the host notification service.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Status => "service",
            Self::Offline => "offline",
            Self::Captcha => "captcha",
        }
    }
}

/// What tapping the notification should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    /// The main console screen.
    OpenConsole,
    /// The captcha input surface.
    OpenCaptchaInput,
}

/// Raw image bytes of the bot's avatar, as downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    /// Where the image was fetched from.
    pub url: String,
    /// Encoded image data.
    pub bytes: Bytes,
}

/// A notification to publish through a [`Notifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Identifier; publishing with an existing id replaces that notification.
    pub id: NotificationId,
    /// Channel to post on.
    pub channel: NotificationChannel,
    /// Title line.
    pub title: String,
    /// Body text.
    pub text: String,
    /// Render the body as expandable long text.
    pub big_text: bool,
    /// Large icon shown next to the text.
    pub large_icon: Option<Avatar>,
    /// Action performed on tap.
    pub tap_action: Option<TapAction>,
    /// Persistent: the user cannot swipe it away.
    pub ongoing: bool,
    /// Dismiss automatically once tapped.
    pub auto_cancel: bool,
    /// Only alert (sound, vibration) the first time this id is posted.
    pub only_alert_once: bool,
    /// Time shown next to the notification.
    pub posted_at: DateTime<Utc>,
}

impl Notification {
    /// Create a plain, dismissible notification.
    #[must_use]
    pub fn new(
        id: NotificationId,
        channel: NotificationChannel,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            channel,
            title: title.into(),
            text: text.into(),
            big_text: false,
            large_icon: None,
            tap_action: None,
            ongoing: false,
            auto_cancel: false,
            only_alert_once: false,
            posted_at: Utc::now(),
        }
    }

    /// Attach a large icon.
    #[must_use]
    pub fn with_large_icon(mut self, avatar: Avatar) -> Self {
        self.large_icon = Some(avatar);
        self
    }

    /// Attach a tap action.
    #[must_use]
    pub const fn with_tap_action(mut self, action: TapAction) -> Self {
        self.tap_action = Some(action);
        self
    }

    /// Mark as persistent.
    #[must_use]
    pub const fn ongoing(mut self, ongoing: bool) -> Self {
        self.ongoing = ongoing;
        self
    }

    /// Dismiss on tap.
    #[must_use]
    pub const fn auto_cancel(mut self, auto_cancel: bool) -> Self {
        self.auto_cancel = auto_cancel;
        self
    }

    /// Alert only on first post.
    #[must_use]
    pub const fn only_alert_once(mut self, only_alert_once: bool) -> Self {
        self.only_alert_once = only_alert_once;
        self
    }

    /// Use the long-text style.
    #[must_use]
    pub const fn big_text(mut self, big_text: bool) -> Self {
        self.big_text = big_text;
        self
    }

    /// Ongoing status notification showing the current message rate.
    #[must_use]
    pub fn status(console_name: &str, rate_per_minute: u64, avatar: Avatar) -> Self {
        Self::new(
            NotificationId::STATUS,
            NotificationChannel::Status,
            format!("{console_name} is running"),
            format!("Message rate {rate_per_minute}/min"),
        )
        .with_large_icon(avatar)
        .with_tap_action(TapAction::OpenConsole)
        .ongoing(true)
        .only_alert_once(true)
    }

    /// Offline alert after a transient connection drop.
    #[must_use]
    pub fn offline_dropped(console_name: &str) -> Self {
        Self::new(
            NotificationId::OFFLINE,
            NotificationChannel::Offline,
            format!("{console_name} offline"),
            "Please check your network connection",
        )
    }

    /// Offline alert after the server forced a disconnect; `reason` is shown verbatim.
    #[must_use]
    pub fn offline_forced(console_name: &str, reason: &str) -> Self {
        Self::new(
            NotificationId::OFFLINE,
            NotificationChannel::Offline,
            format!("{console_name} offline"),
            reason,
        )
        .big_text(true)
    }

    /// Alert asking the user to open the captcha input surface.
    #[must_use]
    pub fn captcha_alert() -> Self {
        Self::new(
            NotificationId::CAPTCHA,
            NotificationChannel::Captcha,
            "Login requires a captcha",
            "Tap here to enter the captcha",
        )
        .with_tap_action(TapAction::OpenCaptchaInput)
        .ongoing(true)
        .auto_cancel(true)
    }
}

/// Host notification service.
///
/// Implementations are called from any runtime worker thread and must not block
/// for long.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Publish or replace the notification with `notification.id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejected the notification.
    fn notify(&self, notification: Notification) -> anyhow::Result<()>;

    /// Remove the notification with `id`, if shown.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejected the request.
    fn cancel(&self, id: NotificationId) -> anyhow::Result<()>;
}
