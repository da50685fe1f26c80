mod types;

pub use types::DeviceSnapshot;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use crate::session::SessionContext;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Reads OS, memory and CPU facts about the host through `sysinfo`.
pub struct DeviceProbe {
    system: System,
}

impl DeviceProbe {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_memory(MemoryRefreshKind::everything())
                .with_cpu(CpuRefreshKind::everything()),
        );
        Self { system }
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let cpus = self.system.cpus();
        let first = cpus.first();
        DeviceSnapshot {
            os: System::long_os_version().or_else(System::name),
            memory_mb: self.system.total_memory() / 1024 / 1024,
            cpu: first
                .map(|cpu| cpu.brand().trim().to_string())
                .filter(|brand| !brand.is_empty()),
            cpu_cores: cpus.len(),
            cpu_vendor: first
                .map(|cpu| cpu.vendor_id().trim().to_string())
                .filter(|vendor| !vendor.is_empty()),
        }
    }

    /// Store the snapshot on the session as `cvr.device.*` properties.
    pub async fn apply(&self, session: &SessionContext) -> DeviceSnapshot {
        let snapshot = self.snapshot();
        for (property, value) in snapshot.properties() {
            session.set_device_property_typed(property, value).await;
        }
        log_info!(
            "Device probe: os={:?} memory={}MB cores={}",
            snapshot.os,
            snapshot.memory_mb,
            snapshot.cpu_cores
        );
        snapshot
    }
}

impl Default for DeviceProbe {
    fn default() -> Self {
        Self::new()
    }
}
