//! Version banner pushed to the console log when the engine announces itself.

use crate::engine::DeviceInfo;

/// Versions announced by the bot engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Console name, from settings.
    pub console_name: String,
    /// Console version string.
    pub console_version: String,
    /// Console build identifier.
    pub console_build: String,
    /// Bot engine core version.
    pub core_version: String,
}

impl VersionInfo {
    /// Render the multi-line banner, one fact per line.
    #[must_use]
    pub fn render(&self, device: &dyn DeviceInfo) -> String {
        format!(
            "{name} v{version} ({build})\nCore v{core}\nOS {os}\nAvailable memory {memory}\nNetwork {network}",
            name = self.console_name,
            version = self.console_version,
            build = self.console_build,
            core = self.core_version,
            os = device.os_version(),
            memory = device.available_memory(),
            network = device.network_type(),
        )
    }
}
