#![allow(dead_code)]

use async_trait::async_trait;
use bot_console_core::{
    BotEvent, BotEventHandler, BotSession, DeviceInfo, EventDispatcher, Notification,
    NotificationId, Notifier, ScriptHost,
};
use bot_console_runtime::{AvatarError, AvatarFetcher};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const AVATAR_URL: &str = "https://example.com/avatar.png";

/// In-process session driven by the test.
#[derive(Default)]
pub struct TestSession {
    pub dispatcher: EventDispatcher,
    pub token: CancellationToken,
}

impl TestSession {
    pub fn emit(&self, event: BotEvent) {
        self.dispatcher.dispatch(&event);
    }
}

impl BotSession for TestSession {
    fn id(&self) -> u64 {
        10_001
    }

    fn avatar_url(&self) -> String {
        AVATAR_URL.to_string()
    }

    fn register_handler(&self, handler: Arc<dyn BotEventHandler>) {
        self.dispatcher.register(handler);
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Notify(Notification),
    Cancel(NotificationId),
}

/// Notifier recording every call and waking waiters on each one.
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<Call>>,
    pub changed: Notify,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn published(&self) -> Vec<Notification> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Notify(n) => Some(n),
                Call::Cancel(_) => None,
            })
            .collect()
    }

    /// Wait until at least `count` notifications were published.
    pub async fn wait_for_published(&self, count: usize) -> Vec<Notification> {
        loop {
            let notified = self.changed.notified();
            let published = self.published();
            if published.len() >= count {
                return published;
            }
            notified.await;
        }
    }

    fn record(&self, call: Call) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        self.changed.notify_waiters();
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("simulated notification failure");
        }
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        self.record(Call::Notify(notification))
    }

    fn cancel(&self, id: NotificationId) -> anyhow::Result<()> {
        self.record(Call::Cancel(id))
    }
}

/// Fetcher failing `failures` times before returning a fixed image.
pub struct ScriptedFetcher {
    pub failures: usize,
    pub attempts: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AvatarFetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str) -> Result<Bytes, AvatarError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            Err(AvatarError::Request("connection refused".to_string()))
        } else {
            Ok(Bytes::from_static(b"avatar"))
        }
    }
}

#[derive(Default)]
pub struct RecordingScripts {
    pub enabled: AtomicUsize,
    pub disabled: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl ScriptHost for RecordingScripts {
    async fn enable(&self, _session: Arc<dyn BotSession>) -> anyhow::Result<()> {
        self.enabled.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("script directory missing");
        }
        Ok(())
    }

    fn disable(&self) {
        self.disabled.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FixedDevice;

impl DeviceInfo for FixedDevice {
    fn os_version(&self) -> String {
        "Linux 6.8".to_string()
    }

    fn available_memory(&self) -> String {
        "2048 MB".to_string()
    }

    fn network_type(&self) -> String {
        "eth0".to_string()
    }
}
