//! Bot engine collaborator seams.
//!
//! The console never talks to the bot protocol directly. A bot engine exposes
//! sessions through [`BotSession`], delivers lifecycle events to registered
//! [`BotEventHandler`]s and scopes background work to the session's
//! cancellation token. [`EventDispatcher`] is a ready-made typed dispatcher a
//! session implementation can embed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

/// Why the bot went offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineKind {
    /// Transient connection loss.
    Dropped,
    /// Disconnected by the server, with its reason.
    Force {
        /// Reason supplied by the engine.
        message: String,
    },
    /// Signed out on purpose.
    Active,
    /// The engine asked for a reconnect without a user-facing cause.
    RequireReconnect,
}

/// Lifecycle event delivered by the bot engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotEvent {
    /// The bot lost its connection.
    Offline(OfflineKind),
    /// The bot logged in again after going offline.
    Relogin,
    /// An inbound message arrived.
    MessageReceived {
        /// Sender identifier.
        from: u64,
    },
}

/// Callback invoked for every lifecycle event of a session.
///
/// Handlers run on the engine's threads and must return quickly.
pub trait BotEventHandler: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &BotEvent);
}

impl<F> BotEventHandler for F
where
    F: Fn(&BotEvent) + Send + Sync,
{
    fn on_event(&self, event: &BotEvent) {
        self(event);
    }
}

/// A signed-in bot as seen by the console.
pub trait BotSession: Send + Sync {
    /// Account identifier.
    fn id(&self) -> u64;

    /// URL of the bot's own avatar image.
    fn avatar_url(&self) -> String;

    /// Register a handler for every subsequent lifecycle event.
    fn register_handler(&self, handler: Arc<dyn BotEventHandler>);

    /// Token cancelled when the session ends; background work stops with it.
    fn cancellation_token(&self) -> CancellationToken;
}

/// Typed in-process event dispatcher.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<Vec<Arc<dyn BotEventHandler>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler.
    pub fn register(&self, handler: Arc<dyn BotEventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Deliver `event` to every handler in registration order.
    pub fn dispatch(&self, event: &BotEvent) {
        // Handlers may register further handlers, so do not hold the lock while calling them.
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler.on_event(event);
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Scripting subsystem enabled for each signed-in bot.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Start scripts for `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scripts could not be loaded.
    async fn enable(&self, session: Arc<dyn BotSession>) -> anyhow::Result<()>;

    /// Stop all scripts.
    fn disable(&self);
}

/// Device facts shown in the version banner.
pub trait DeviceInfo: Send + Sync {
    /// Operating system name and version.
    fn os_version(&self) -> String;
    /// Human-readable available memory.
    fn available_memory(&self) -> String;
    /// Active network type or interface.
    fn network_type(&self) -> String;
}

/// Severity attached to engine log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogPriority {
    /// Very detailed output.
    Verbose,
    /// Debug output.
    Debug,
    /// Informational output.
    Info,
    /// Something unexpected but recoverable.
    Warning,
    /// A failure.
    Error,
}

impl fmt::Display for LogPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}
