use chrono::{DateTime, Utc};

use crate::models::{PropertyMap, PropertyValue, SceneDescriptor};

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user_id: String,
    pub device_id: String,
    pub is_active: bool,
    pub scene: SceneDescriptor,
    pub user_properties: PropertyMap,
    pub device_properties: PropertyMap,
    /// Properties written since the last batch that carried them, keyed by wire key.
    pub pending_properties: PropertyMap,
    pub started_at: Option<DateTime<Utc>>,
    session_timestamp: Option<i64>,
    session_id: Option<String>,
}

impl SessionState {
    pub fn new(user_id: String, device_id: String) -> Self {
        Self {
            user_id,
            device_id,
            ..Self::default()
        }
    }

    /// Epoch seconds of the session, generated on first use.
    pub fn session_timestamp(&mut self) -> i64 {
        *self
            .session_timestamp
            .get_or_insert_with(|| Utc::now().timestamp())
    }

    /// `{timestamp}_{user or device id}`, fixed once computed.
    pub fn session_id(&mut self) -> String {
        if let Some(id) = &self.session_id {
            return id.clone();
        }
        let id = format!("{}_{}", self.session_timestamp(), self.participant_id());
        self.session_id = Some(id.clone());
        id
    }

    pub fn participant_id(&self) -> &str {
        if self.user_id.is_empty() {
            &self.device_id
        } else {
            &self.user_id
        }
    }

    pub fn begin(&mut self) -> bool {
        if self.is_active {
            return false;
        }
        self.is_active = true;
        self.started_at = Some(Utc::now());
        self.session_timestamp();
        self.session_id();
        true
    }

    pub fn end(&mut self) {
        self.session_timestamp = None;
        self.session_id = None;
        self.is_active = false;
        self.started_at = None;
        self.user_properties.clear();
        self.device_properties.clear();
        self.pending_properties.clear();
    }

    pub fn set_user_property(&mut self, key: String, value: PropertyValue) {
        self.pending_properties.insert(key.clone(), value.clone());
        self.user_properties.insert(key, value);
    }

    pub fn set_device_property(&mut self, wire_key: &str, value: PropertyValue) {
        self.pending_properties
            .insert(wire_key.to_string(), value.clone());
        self.device_properties.insert(wire_key.to_string(), value);
    }

    /// Device properties overlaid with user properties.
    pub fn merged_properties(&self) -> PropertyMap {
        let mut merged = self.device_properties.clone();
        merged.extend(
            self.user_properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_prefers_user_id() {
        let mut state = SessionState::new("alice".into(), "dev-1".into());
        assert!(state.begin());
        let id = state.session_id();
        assert!(id.ends_with("_alice"));
        assert!(id.starts_with(&state.session_timestamp().to_string()));
    }

    #[test]
    fn session_id_falls_back_to_device_id() {
        let mut state = SessionState::new(String::new(), "dev-1".into());
        state.begin();
        assert!(state.session_id().ends_with("_dev-1"));
    }

    #[test]
    fn session_id_is_memoized_across_user_changes() {
        let mut state = SessionState::new("alice".into(), "dev-1".into());
        state.begin();
        let first = state.session_id();
        state.user_id = "bob".into();
        assert_eq!(state.session_id(), first);
    }

    #[test]
    fn begin_twice_is_rejected() {
        let mut state = SessionState::new("alice".into(), "dev-1".into());
        assert!(state.begin());
        assert!(!state.begin());
    }

    #[test]
    fn end_clears_identity_and_bags() {
        let mut state = SessionState::new("alice".into(), "dev-1".into());
        state.begin();
        state.set_user_property("team".into(), "blue".into());
        state.set_device_property("cvr.device.type", "headset".into());
        state.end();

        assert!(!state.is_active);
        assert!(state.user_properties.is_empty());
        assert!(state.device_properties.is_empty());
        assert!(state.pending_properties.is_empty());
        assert!(state.started_at.is_none());
    }

    #[test]
    fn last_write_wins_per_key() {
        let mut state = SessionState::new("alice".into(), "dev-1".into());
        state.set_user_property("level".into(), 1.into());
        state.set_user_property("level".into(), 2.into());
        assert_eq!(state.user_properties["level"], PropertyValue::Number(2.0));
    }
}
