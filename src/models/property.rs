use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value stored in a property bag or attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Number(f64::from(value))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Wire key used for device properties the table below does not know.
pub const UNKNOWN_PROPERTY_KEY: &str = "unknown.property";

/// Well-known device properties and their `cvr.*` wire keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    AppName,
    AppVersion,
    AppEngine,
    AppEngineVersion,
    DeviceType,
    DeviceModel,
    DeviceMemory,
    DeviceOs,
    DeviceCpu,
    DeviceCpuCores,
    DeviceCpuVendor,
    DeviceGpu,
    DeviceGpuDriver,
    DeviceGpuVendor,
    DeviceGpuMemory,
    VrModel,
    VrVendor,
}

impl DeviceProperty {
    /// Resolve a host-facing property name. Matching ignores case.
    pub fn from_name(name: &str) -> Option<Self> {
        let property = match name.to_ascii_lowercase().as_str() {
            "appname" => DeviceProperty::AppName,
            "appversion" => DeviceProperty::AppVersion,
            "appengine" => DeviceProperty::AppEngine,
            "appengineversion" => DeviceProperty::AppEngineVersion,
            "devicetype" => DeviceProperty::DeviceType,
            "devicemodel" => DeviceProperty::DeviceModel,
            "devicememory" => DeviceProperty::DeviceMemory,
            "deviceos" => DeviceProperty::DeviceOs,
            "devicecpu" => DeviceProperty::DeviceCpu,
            "devicecpucores" => DeviceProperty::DeviceCpuCores,
            "devicecpuvendor" => DeviceProperty::DeviceCpuVendor,
            "devicegpu" => DeviceProperty::DeviceGpu,
            "devicegpudriver" => DeviceProperty::DeviceGpuDriver,
            "devicegpuvendor" => DeviceProperty::DeviceGpuVendor,
            "devicegpumemory" => DeviceProperty::DeviceGpuMemory,
            "vrmodel" => DeviceProperty::VrModel,
            "vrvendor" => DeviceProperty::VrVendor,
            _ => return None,
        };
        Some(property)
    }

    pub fn wire_key(&self) -> &'static str {
        match self {
            DeviceProperty::AppName => "cvr.app.name",
            DeviceProperty::AppVersion => "cvr.app.version",
            DeviceProperty::AppEngine => "cvr.app.engine",
            DeviceProperty::AppEngineVersion => "cvr.app.engine.version",
            DeviceProperty::DeviceType => "cvr.device.type",
            DeviceProperty::DeviceModel => "cvr.device.model",
            DeviceProperty::DeviceMemory => "cvr.device.memory",
            DeviceProperty::DeviceOs => "cvr.device.os",
            DeviceProperty::DeviceCpu => "cvr.device.cpu",
            DeviceProperty::DeviceCpuCores => "cvr.device.cpu.cores",
            DeviceProperty::DeviceCpuVendor => "cvr.device.cpu.vendor",
            DeviceProperty::DeviceGpu => "cvr.device.gpu",
            DeviceProperty::DeviceGpuDriver => "cvr.device.gpu.driver",
            DeviceProperty::DeviceGpuVendor => "cvr.device.gpu.vendor",
            DeviceProperty::DeviceGpuMemory => "cvr.device.gpu.memory",
            DeviceProperty::VrModel => "cvr.vr.model",
            DeviceProperty::VrVendor => "cvr.vr.vendor",
        }
    }
}

/// Translate a device property name to its wire key, falling back to
/// [`UNKNOWN_PROPERTY_KEY`].
pub fn device_wire_key(name: &str) -> &'static str {
    DeviceProperty::from_name(name)
        .map(|p| p.wire_key())
        .unwrap_or(UNKNOWN_PROPERTY_KEY)
}
