//! Host settings.

use bot_console_core::config::build_config;
use bot_console_core::SettingsError;
use serde::{Deserialize, Serialize};

/// Settings of the local terminal host, loaded from the same sources as the console settings.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HostSettings {
    /// Account id reported by the local session.
    #[serde(default)]
    pub bot_id: u64,
    /// Avatar URL reported by the local session.
    #[serde(default)]
    pub avatar_url: String,
}

impl HostSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if loading fails or the avatar URL is missing.
    pub fn new() -> Result<Self, SettingsError> {
        let settings: Self = build_config()?.try_deserialize()?;
        if settings.avatar_url.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "avatar_url must be set (AVATAR_URL)".to_string(),
            ));
        }
        Ok(settings)
    }
}
