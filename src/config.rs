use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::SceneDescriptor;

/// Construction-time settings for the analytics client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Application key sent as `Authorization: APIKEY:DATA {api_key}`.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_network_host")]
    pub network_host: String,

    /// Collector protocol version, rendered as `/v{network_version}/`.
    #[serde(default = "default_network_version")]
    pub network_version: String,

    #[serde(default = "default_batch_size")]
    pub gaze_batch_size: usize,

    #[serde(default = "default_batch_size")]
    pub event_batch_size: usize,

    /// Threshold counts samples across every sensor name.
    #[serde(default = "default_batch_size")]
    pub sensor_batch_size: usize,

    #[serde(default = "default_batch_size")]
    pub dynamic_batch_size: usize,

    /// Head-pose sampling period.
    #[serde(default = "default_gaze_interval_ms")]
    pub gaze_interval_ms: u64,

    /// Headset label sent with every gaze batch.
    #[serde(default)]
    pub hmd_type: String,

    /// Fixed user id; when empty the session id falls back to the device id.
    #[serde(default)]
    pub user_id: String,

    /// Fixed device id; a random one is generated when empty.
    #[serde(default)]
    pub device_id: String,

    #[serde(default)]
    pub scenes: Vec<SceneDescriptor>,

    /// Scene selected at construction, by name.
    #[serde(default)]
    pub default_scene: Option<String>,

    /// Probe the host with `sysinfo` at session start.
    #[serde(default = "default_true")]
    pub collect_device_properties: bool,
}

fn default_network_host() -> String {
    "data.cognitive3d.com".to_string()
}

fn default_network_version() -> String {
    "0".to_string()
}

fn default_batch_size() -> usize {
    64
}

fn default_gaze_interval_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            network_host: default_network_host(),
            network_version: default_network_version(),
            gaze_batch_size: default_batch_size(),
            event_batch_size: default_batch_size(),
            sensor_batch_size: default_batch_size(),
            dynamic_batch_size: default_batch_size(),
            gaze_interval_ms: default_gaze_interval_ms(),
            hmd_type: String::new(),
            user_id: String::new(),
            device_id: String::new(),
            scenes: Vec::new(),
            default_scene: None,
            collect_device_properties: default_true(),
        }
    }
}

impl AnalyticsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analytics config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse analytics config {}", path.display()))
    }

    pub fn find_scene(&self, name: &str) -> Option<&SceneDescriptor> {
        self.scenes.iter().find(|scene| scene.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let config: AnalyticsConfig = serde_json::from_str(r#"{"api_key": "abc"}"#).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.network_host, "data.cognitive3d.com");
        assert_eq!(config.network_version, "0");
        assert_eq!(config.gaze_batch_size, 64);
        assert_eq!(config.gaze_interval_ms, 100);
        assert!(config.collect_device_properties);
        assert!(config.scenes.is_empty());
    }

    #[test]
    fn loads_scene_registry_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "api_key": "key",
                "scenes": [{{"name": "Lobby", "id": "scene-1", "versionNumber": "3"}}],
                "default_scene": "Lobby"
            }}"#
        )
        .unwrap();

        let config = AnalyticsConfig::load(file.path()).unwrap();
        let scene = config.find_scene("Lobby").unwrap();
        assert_eq!(scene.id, "scene-1");
        assert_eq!(scene.version_number, "3");
        assert!(config.find_scene("Garden").is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AnalyticsConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read analytics config"));
    }
}
