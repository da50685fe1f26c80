use serde::{Deserialize, Serialize};

/// Identifies the scene (and its published version) the collector files data under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescriptor {
    pub name: String,
    pub id: String,
    pub version_number: String,
}

impl SceneDescriptor {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        version_number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            version_number: version_number.into(),
        }
    }

    /// A descriptor without an id or version cannot address a collector URL.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.version_number.is_empty()
    }
}
