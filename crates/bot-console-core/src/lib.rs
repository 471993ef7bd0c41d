#![deny(missing_docs)]
//! Bot console core library.
//!
//! Domain types and leaf mechanisms shared by the console runtime and host:
//! the bounded log buffer, the message rate counter, the captcha handshake,
//! the notification model and the bot engine collaborator seams.

/// Version banner formatting.
pub mod banner;
/// Captcha handshake and login solver.
pub mod captcha;
/// Configuration management.
pub mod config;
/// Bot engine collaborator traits and lifecycle events.
pub mod engine;
/// Bounded log buffer.
pub mod log_buffer;
/// Notification model and publisher seam.
pub mod notification;
/// Inbound message rate counter.
pub mod rate;

pub use captcha::{CaptchaError, CaptchaSolver, LoginSolver};
pub use config::{AvatarRetryPolicy, ConsoleSettings, SettingsError};
pub use engine::{
    BotEvent, BotEventHandler, BotSession, DeviceInfo, EventDispatcher, LogPriority, OfflineKind,
    ScriptHost,
};
pub use log_buffer::LogBuffer;
pub use notification::{
    Avatar, Notification, NotificationChannel, NotificationId, Notifier, TapAction,
};
pub use rate::RateCounter;
