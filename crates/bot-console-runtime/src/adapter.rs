//! Console adapter: the composition root between the bot engine and the host.
//!
//! The engine calls into [`ConsoleAdapter`] for log lines, version announcements
//! and new sessions. For each session the adapter enables scripting, registers
//! the lifecycle handler and starts the status refresh loop; all of that work is
//! scoped to the session's cancellation token.

use crate::avatar::AvatarFetcher;
use crate::lifecycle::LifecycleNotifier;
use crate::refresh::{spawn_refresh_loop, RefreshLoopConfig};
use bot_console_core::banner::VersionInfo;
use bot_console_core::{
    BotSession, CaptchaSolver, ConsoleSettings, DeviceInfo, LogBuffer, LogPriority, Notifier,
    ScriptHost,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// External services the adapter drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Host notification service.
    pub notifier: Arc<dyn Notifier>,
    /// Scripting subsystem.
    pub scripts: Arc<dyn ScriptHost>,
    /// Avatar downloader.
    pub avatars: Arc<dyn AvatarFetcher>,
    /// Device facts for the version banner.
    pub device: Arc<dyn DeviceInfo>,
}

/// Background tasks started for one session.
pub struct SessionTasks {
    /// Scripting startup.
    pub scripts: JoinHandle<()>,
    /// Status refresh loop.
    pub refresh: JoinHandle<()>,
}

/// Bridges bot engine callbacks to the log buffer, notifications and captcha handshake.
pub struct ConsoleAdapter {
    settings: ConsoleSettings,
    logs: LogBuffer,
    solver: Arc<CaptchaSolver>,
    collaborators: Collaborators,
}

impl ConsoleAdapter {
    /// Create an adapter with an empty log buffer sized from `settings`.
    #[must_use]
    pub fn new(settings: ConsoleSettings, collaborators: Collaborators) -> Self {
        let logs = LogBuffer::new(settings.log_capacity);
        let solver = Arc::new(CaptchaSolver::new(Arc::clone(&collaborators.notifier)));
        Self {
            settings,
            logs,
            solver,
            collaborators,
        }
    }

    /// Login solver handed to the bot engine.
    #[must_use]
    pub fn login_solver(&self) -> Arc<CaptchaSolver> {
        Arc::clone(&self.solver)
    }

    /// Shared handle to the log buffer, for UI consumers.
    #[must_use]
    pub fn logs(&self) -> LogBuffer {
        self.logs.clone()
    }

    /// Called before a bot starts logging in. Nothing to prepare.
    pub fn pre_push_bot(&self, _bot_id: u64) {}

    /// Wire a signed-in session: scripting, lifecycle alerts and the refresh loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push_bot(&self, session: Arc<dyn BotSession>) -> SessionTasks {
        let bot_id = session.id();
        info!(bot_id, "Bot session attached");

        let scripts = {
            let host = Arc::clone(&self.collaborators.scripts);
            let session = Arc::clone(&session);
            let logs = self.logs.clone();
            let cancel = session.cancellation_token();
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    result = host.enable(session) => {
                        if let Err(e) = result {
                            warn!(bot_id, error = %e, "Failed to enable scripts");
                            logs.push(format!("[ERROR] Failed to enable scripts: {e}"));
                        }
                    }
                }
            })
        };

        session.register_handler(Arc::new(LifecycleNotifier::new(
            self.settings.console_name.clone(),
            self.logs.clone(),
            Arc::clone(&self.collaborators.notifier),
        )));

        let refresh = spawn_refresh_loop(
            session,
            Arc::clone(&self.collaborators.notifier),
            Arc::clone(&self.collaborators.avatars),
            self.logs.clone(),
            RefreshLoopConfig::from_settings(&self.settings),
        );

        SessionTasks { scripts, refresh }
    }

    /// Admin list updates are not shown by this console.
    pub fn push_bot_admin_status(&self, _bot_id: u64, _admins: &[u64]) {}

    /// Append an engine log line.
    pub fn push_log(&self, _bot_id: u64, message: &str) {
        self.logs.push(message);
    }

    /// Append an engine log line prefixed with its priority.
    pub fn push_log_with_priority(
        &self,
        priority: LogPriority,
        _identity: &str,
        _bot_id: u64,
        message: &str,
    ) {
        self.logs.push(format!("[{priority}] {message}"));
    }

    /// Append the version banner as a single log line.
    pub fn push_version(&self, console_version: &str, console_build: &str, core_version: &str) {
        let info = VersionInfo {
            console_name: self.settings.console_name.clone(),
            console_version: console_version.to_string(),
            console_build: console_build.to_string(),
            core_version: core_version.to_string(),
        };
        self.logs
            .push(info.render(self.collaborators.device.as_ref()));
    }

    /// Free-form input requests from the engine are not supported; always answers empty.
    pub async fn request_input(&self, _hint: &str) -> String {
        String::new()
    }

    /// Disable scripting and release any captcha request still waiting.
    pub fn stop(&self) {
        self.collaborators.scripts.disable();
        self.solver.abandon();
        info!("Console adapter stopped");
    }
}
