use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{device_wire_key, DeviceProperty, PropertyMap, PropertyValue, SceneDescriptor};

use super::SessionState;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Identity stamped on every outgoing batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub session_id: String,
}

/// Shared handle to the session state; cloning shares the same session.
#[derive(Clone)]
pub struct SessionContext {
    state: Arc<Mutex<SessionState>>,
}

impl SessionContext {
    /// An empty `device_id` is replaced by a random one.
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        let mut device_id = device_id.into();
        if device_id.is_empty() {
            device_id = Uuid::new_v4().to_string();
        }
        Self {
            state: Arc::new(Mutex::new(SessionState::new(user_id.into(), device_id))),
        }
    }

    pub async fn start_session(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.begin() {
            log_warn!("start_session ignored: session {} already active", state.session_id());
            return false;
        }
        log_info!("Session {} started", state.session_id());
        true
    }

    pub async fn end_session(&self) {
        let mut state = self.state.lock().await;
        if state.is_active {
            log_info!("Session {} ended", state.session_id());
        }
        state.end();
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.is_active
    }

    /// `None` while no session is active.
    pub async fn identity(&self) -> Option<SessionIdentity> {
        let mut state = self.state.lock().await;
        if !state.is_active {
            return None;
        }
        Some(SessionIdentity {
            user_id: state.participant_id().to_string(),
            session_id: state.session_id(),
        })
    }

    pub async fn session_id(&self) -> Option<String> {
        self.identity().await.map(|identity| identity.session_id)
    }

    pub async fn session_timestamp(&self) -> Option<i64> {
        let mut state = self.state.lock().await;
        if !state.is_active {
            return None;
        }
        Some(state.session_timestamp())
    }

    /// Seconds since the session started, zero when inactive.
    pub async fn session_length_secs(&self) -> f64 {
        let state = self.state.lock().await;
        state
            .started_at
            .map(|started| (Utc::now() - started).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }

    pub async fn started_at(&self) -> Option<chrono::DateTime<Utc>> {
        self.state.lock().await.started_at
    }

    pub async fn user_id(&self) -> String {
        self.state.lock().await.user_id.clone()
    }

    pub async fn device_id(&self) -> String {
        self.state.lock().await.device_id.clone()
    }

    /// Does not change an already derived session id.
    pub async fn set_user_id(&self, user_id: impl Into<String>) {
        self.state.lock().await.user_id = user_id.into();
    }

    pub async fn set_device_id(&self, device_id: impl Into<String>) {
        self.state.lock().await.device_id = device_id.into();
    }

    pub async fn set_user_name(&self, name: impl Into<String>) {
        self.set_user_property("cvr.name", name.into()).await;
    }

    pub async fn scene(&self) -> SceneDescriptor {
        self.state.lock().await.scene.clone()
    }

    pub async fn set_scene(&self, scene: SceneDescriptor) {
        log_info!("Scene set to '{}' ({} v{})", scene.name, scene.id, scene.version_number);
        self.state.lock().await.scene = scene;
    }

    pub async fn set_user_property(&self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.state
            .lock()
            .await
            .set_user_property(key.into(), value.into());
    }

    /// Names outside the [`DeviceProperty`] table are stored under `unknown.property`.
    pub async fn set_device_property(&self, name: &str, value: impl Into<PropertyValue>) {
        let wire_key = device_wire_key(name);
        if DeviceProperty::from_name(name).is_none() {
            log_warn!("Unknown device property '{}', storing as {}", name, wire_key);
        }
        self.state
            .lock()
            .await
            .set_device_property(wire_key, value.into());
    }

    pub async fn set_device_property_typed(
        &self,
        property: DeviceProperty,
        value: impl Into<PropertyValue>,
    ) {
        self.state
            .lock()
            .await
            .set_device_property(property.wire_key(), value.into());
    }

    pub async fn user_properties(&self) -> PropertyMap {
        self.state.lock().await.user_properties.clone()
    }

    pub async fn device_properties(&self) -> PropertyMap {
        self.state.lock().await.device_properties.clone()
    }

    pub async fn merged_properties(&self) -> PropertyMap {
        self.state.lock().await.merged_properties()
    }

    pub async fn has_pending_properties(&self) -> bool {
        !self.state.lock().await.pending_properties.is_empty()
    }

    /// Drain properties written since the last batch that carried them.
    pub async fn take_pending_properties(&self) -> PropertyMap {
        std::mem::take(&mut self.state.lock().await.pending_properties)
    }
}
