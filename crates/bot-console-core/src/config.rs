//! Configuration and settings management
//!
//! Loads console settings from config files and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default number of lines kept by the console log buffer.
pub const DEFAULT_LOG_CAPACITY: usize = 300;
/// Default period between status notification refreshes, in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 10;
/// Default delay between avatar download attempts, in milliseconds.
pub const DEFAULT_AVATAR_RETRY_DELAY_MS: u64 = 200;
/// Default HTTP timeout for a single avatar download, in seconds.
pub const DEFAULT_AVATAR_FETCH_TIMEOUT_SECS: u64 = 10;

/// Errors produced while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The underlying config sources could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A value was readable but semantically unusable.
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Delay policy applied between avatar download attempts.
///
/// Both variants retry forever; they only differ in how long they wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarRetryPolicy {
    /// Wait the same delay after every failure.
    Fixed(Duration),
    /// Double the delay after every failure, never exceeding `max`.
    Exponential {
        /// Delay after the first failure.
        initial: Duration,
        /// Ceiling for the delay.
        max: Duration,
    },
}

/// Console settings loaded from config files and environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConsoleSettings {
    /// Number of lines kept by the log buffer
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Seconds between status notification refreshes
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Delay after a failed avatar download, in milliseconds
    #[serde(default = "default_avatar_retry_delay_ms")]
    pub avatar_retry_delay_ms: u64,

    /// Optional backoff ceiling; when set the avatar retry delay doubles up to this value
    pub avatar_retry_max_delay_ms: Option<u64>,

    /// HTTP timeout for one avatar download, in seconds
    #[serde(default = "default_avatar_fetch_timeout_secs")]
    pub avatar_fetch_timeout_secs: u64,

    /// Name shown in notification titles and the version banner
    #[serde(default = "default_console_name")]
    pub console_name: String,
}

const fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

const fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

const fn default_avatar_retry_delay_ms() -> u64 {
    DEFAULT_AVATAR_RETRY_DELAY_MS
}

const fn default_avatar_fetch_timeout_secs() -> u64 {
    DEFAULT_AVATAR_FETCH_TIMEOUT_SECS
}

fn default_console_name() -> String {
    "BotConsole".to_string()
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            avatar_retry_delay_ms: DEFAULT_AVATAR_RETRY_DELAY_MS,
            avatar_retry_max_delay_ms: None,
            avatar_fetch_timeout_secs: DEFAULT_AVATAR_FETCH_TIMEOUT_SECS,
            console_name: default_console_name(),
        }
    }
}

/// Build the layered configuration shared by every crate of the console.
///
/// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` variables, then plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Empty variables count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl ConsoleSettings {
    /// Load settings from files and the environment.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if loading fails or a value is invalid.
    pub fn new() -> Result<Self, SettingsError> {
        Self::from_config(build_config()?)
    }

    /// Deserialize and validate settings from an already built `Config`.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if deserialization fails or a value is invalid.
    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Self = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check semantic constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` for a zero refresh interval, avatar retry delay or log capacity.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.refresh_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.avatar_retry_delay_ms == 0 {
            return Err(SettingsError::Invalid(
                "avatar_retry_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.log_capacity == 0 {
            return Err(SettingsError::Invalid(
                "log_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Period between status notification refreshes.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Timeout applied to one avatar download attempt.
    #[must_use]
    pub const fn avatar_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.avatar_fetch_timeout_secs)
    }

    /// Retry policy for avatar downloads.
    #[must_use]
    pub fn avatar_retry_policy(&self) -> AvatarRetryPolicy {
        let initial = Duration::from_millis(self.avatar_retry_delay_ms);
        match self.avatar_retry_max_delay_ms {
            Some(max_ms) => AvatarRetryPolicy::Exponential {
                initial,
                max: Duration::from_millis(max_ms).max(initial),
            },
            None => AvatarRetryPolicy::Fixed(initial),
        }
    }
}
