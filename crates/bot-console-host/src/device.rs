//! Device facts read from the running system.

use bot_console_core::DeviceInfo;
use sysinfo::{Networks, System};

/// [`DeviceInfo`] backed by `sysinfo`.
pub struct SystemDeviceInfo;

impl DeviceInfo for SystemDeviceInfo {
    fn os_version(&self) -> String {
        let os = System::long_os_version().unwrap_or_else(|| "unknown".to_string());
        match System::kernel_version() {
            Some(kernel) => format!("{os} kernel {kernel}"),
            None => os,
        }
    }

    fn available_memory(&self) -> String {
        let mut system = System::new();
        system.refresh_memory();
        format_megabytes(system.available_memory())
    }

    fn network_type(&self) -> String {
        let networks = Networks::new_with_refreshed_list();
        let mut active: Vec<&str> = networks
            .list()
            .iter()
            .filter(|(name, data)| name.as_str() != "lo" && data.total_received() > 0)
            .map(|(name, _)| name.as_str())
            .collect();
        active.sort_unstable();
        active
            .first()
            .map_or_else(|| "none".to_string(), |name| (*name).to_string())
    }
}

fn format_megabytes(bytes: u64) -> String {
    format!("{} MB", bytes / (1024 * 1024))
}
