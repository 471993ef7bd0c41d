//! Local bot session and scripting host for the terminal.

use async_trait::async_trait;
use bot_console_core::{BotEvent, BotEventHandler, BotSession, EventDispatcher, ScriptHost};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Session whose lifecycle events are fed in by the terminal.
#[derive(Debug)]
pub struct LocalSession {
    id: u64,
    avatar_url: String,
    dispatcher: EventDispatcher,
    token: CancellationToken,
}

impl LocalSession {
    pub fn new(id: u64, avatar_url: impl Into<String>) -> Self {
        Self {
            id,
            avatar_url: avatar_url.into(),
            dispatcher: EventDispatcher::new(),
            token: CancellationToken::new(),
        }
    }

    /// Deliver `event` to every registered handler.
    pub fn emit(&self, event: &BotEvent) {
        self.dispatcher.dispatch(event);
    }

    /// End the session, stopping its background work.
    pub fn close(&self) {
        self.token.cancel();
    }
}

impl BotSession for LocalSession {
    fn id(&self) -> u64 {
        self.id
    }

    fn avatar_url(&self) -> String {
        self.avatar_url.clone()
    }

    fn register_handler(&self, handler: Arc<dyn BotEventHandler>) {
        self.dispatcher.register(handler);
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Scripting host that only records enable/disable in the log.
pub struct LoggingScriptHost;

#[async_trait]
impl ScriptHost for LoggingScriptHost {
    async fn enable(&self, session: Arc<dyn BotSession>) -> anyhow::Result<()> {
        info!(bot_id = session.id(), "Scripts enabled");
        Ok(())
    }

    fn disable(&self) {
        info!("Scripts disabled");
    }
}
