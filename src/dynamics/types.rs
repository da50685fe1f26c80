use serde::Serialize;

use crate::models::{PropertyMap, Quat, Vec3};

use super::engagement::EngagementSummary;

pub const MESH_FILE_TYPE: &str = "gltf";

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    pub mesh: String,
}

/// Manifest value as keyed by object id in the dynamics payload.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestWire {
    pub name: String,
    pub mesh: String,
    #[serde(rename = "fileType")]
    pub file_type: &'static str,
}

impl From<ManifestEntry> for ManifestWire {
    fn from(entry: ManifestEntry) -> Self {
        Self {
            name: entry.name,
            mesh: entry.mesh,
            file_type: MESH_FILE_TYPE,
        }
    }
}

/// Id bookkeeping. Removed objects are marked unused, never forgotten.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectIdRecord {
    pub id: String,
    pub mesh: String,
    pub used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicObjectSnapshot {
    pub id: String,
    pub time: f64,
    #[serde(rename = "p")]
    pub position: Vec3,
    #[serde(rename = "r")]
    pub rotation: Quat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagements: Option<Vec<EngagementSummary>>,
}

impl DynamicObjectSnapshot {
    pub fn enabled(&self) -> Option<bool> {
        match self.properties.as_ref()?.get("enabled")? {
            crate::models::PropertyValue::Bool(enabled) => Some(*enabled),
            _ => None,
        }
    }
}
