use serde::{Deserialize, Serialize};

use crate::models::{DeviceProperty, PropertyValue};

/// Host facts gathered once at session start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub os: Option<String>,
    pub memory_mb: u64,
    pub cpu: Option<String>,
    pub cpu_cores: usize,
    pub cpu_vendor: Option<String>,
}

impl DeviceSnapshot {
    /// Device properties worth reporting; unknown or zero readings are left out.
    pub fn properties(&self) -> Vec<(DeviceProperty, PropertyValue)> {
        let mut properties = Vec::new();
        if let Some(os) = &self.os {
            properties.push((DeviceProperty::DeviceOs, os.clone().into()));
        }
        if self.memory_mb > 0 {
            properties.push((DeviceProperty::DeviceMemory, self.memory_mb.into()));
        }
        if let Some(cpu) = &self.cpu {
            properties.push((DeviceProperty::DeviceCpu, cpu.clone().into()));
        }
        if self.cpu_cores > 0 {
            properties.push((DeviceProperty::DeviceCpuCores, (self.cpu_cores as u64).into()));
        }
        if let Some(vendor) = &self.cpu_vendor {
            properties.push((DeviceProperty::DeviceCpuVendor, vendor.clone().into()));
        }
        properties
    }
}
