use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result, Stream};
use crate::models::{PropertyMap, PropertyValue, Quat, Vec3};
use crate::network::NetworkClient;
use crate::recorders::batch::{settle, Batch, FlushOutcome};
use crate::session::SessionContext;
use crate::utils::now_secs;

use super::engagement::{EngagementBook, EngagementEnd, EngagementRecord};
use super::types::{DynamicObjectSnapshot, ManifestEntry, ManifestWire, ObjectIdRecord};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

const FORMAT_VERSION: &str = "1.0";
const FIRST_GENERATED_ID: u64 = 1000;

#[derive(Debug, Serialize)]
struct DynamicsPayload<'a> {
    userid: &'a str,
    timestamp: f64,
    sessionid: &'a str,
    part: u32,
    formatversion: &'static str,
    manifest: BTreeMap<String, ManifestWire>,
    data: Vec<DynamicObjectSnapshot>,
}

#[derive(Debug)]
struct TrackerState {
    pending_manifest: Vec<ManifestEntry>,
    /// Every entry registered this session, kept for re-broadcast after a scene change.
    full_manifest: Vec<ManifestEntry>,
    ids: Vec<ObjectIdRecord>,
    snapshots: Batch<DynamicObjectSnapshot>,
    engagements: EngagementBook,
    next_id: u64,
}

impl TrackerState {
    fn new() -> Self {
        Self {
            pending_manifest: Vec::new(),
            full_manifest: Vec::new(),
            ids: Vec::new(),
            snapshots: Batch::new(),
            engagements: EngagementBook::new(),
            next_id: FIRST_GENERATED_ID,
        }
    }

    fn is_known(&self, id: &str) -> bool {
        self.ids.iter().any(|record| record.id == id)
    }

    fn generate_id(&mut self) -> String {
        loop {
            let candidate = self.next_id.to_string();
            self.next_id += 1;
            if !self.is_known(&candidate) {
                return candidate;
            }
        }
    }

    fn add_manifest(&mut self, entry: ManifestEntry) {
        self.pending_manifest.push(entry.clone());
        self.full_manifest.push(entry);
    }

    /// Queue a snapshot carrying the object's pending engagements; returns the buffer length.
    fn push_snapshot(
        &mut self,
        id: &str,
        position: Vec3,
        rotation: Quat,
        properties: Option<PropertyMap>,
    ) -> usize {
        let now = now_secs();
        let summaries = self.engagements.summarize(id, now);
        let snapshot = DynamicObjectSnapshot {
            id: id.to_string(),
            time: now,
            position,
            rotation,
            properties: properties.filter(|props| !props.is_empty()),
            engagements: (!summaries.is_empty()).then_some(summaries),
        };
        self.snapshots.push(snapshot)
    }
}

fn enabled_property(enabled: bool) -> Option<PropertyMap> {
    let mut properties = PropertyMap::new();
    properties.insert("enabled".to_string(), PropertyValue::Bool(enabled));
    Some(properties)
}

/// Registry, snapshot buffer and engagement tracking for dynamic objects.
#[derive(Clone)]
pub struct DynamicObjectTracker {
    session: SessionContext,
    network: NetworkClient,
    state: Arc<Mutex<TrackerState>>,
    batch_size: usize,
}

impl DynamicObjectTracker {
    pub fn new(config: &AnalyticsConfig, session: SessionContext, network: NetworkClient) -> Self {
        Self {
            session,
            network,
            state: Arc::new(Mutex::new(TrackerState::new())),
            batch_size: config.dynamic_batch_size.max(1),
        }
    }

    async fn require_session(&self) -> Result<()> {
        if self.session.is_active().await {
            Ok(())
        } else {
            Err(AnalyticsError::NoActiveSession(Stream::Dynamics))
        }
    }

    /// Register an object under a generated id, reusing a released id with the
    /// same mesh when one exists.
    pub async fn register_object(
        &self,
        name: &str,
        mesh: &str,
        position: Vec3,
        rotation: Quat,
    ) -> Result<String> {
        self.require_session().await?;

        let (id, len) = {
            let mut state = self.state.lock().await;
            let reused = state
                .ids
                .iter_mut()
                .find(|record| !record.used && record.mesh == mesh)
                .map(|record| {
                    record.used = true;
                    record.id.clone()
                });

            let id = match reused {
                Some(id) => {
                    log_debug!("Reusing dynamic object id {} for mesh {}", id, mesh);
                    id
                }
                None => {
                    let id = state.generate_id();
                    state.ids.push(ObjectIdRecord {
                        id: id.clone(),
                        mesh: mesh.to_string(),
                        used: true,
                    });
                    state.add_manifest(ManifestEntry {
                        id: id.clone(),
                        name: name.to_string(),
                        mesh: mesh.to_string(),
                    });
                    id
                }
            };
            let len = state.push_snapshot(&id, position, rotation, enabled_property(true));
            (id, len)
        };

        self.flush_if_full(len).await;
        Ok(id)
    }

    pub async fn register_object_custom_id(
        &self,
        name: &str,
        mesh: &str,
        custom_id: &str,
        position: Vec3,
        rotation: Quat,
    ) -> Result<()> {
        self.require_session().await?;

        let len = {
            let mut state = self.state.lock().await;
            match state.ids.iter().position(|record| record.id == custom_id) {
                Some(index) => {
                    if state.ids[index].used {
                        log_warn!("Dynamic object id {} registered twice", custom_id);
                    }
                    state.ids[index].used = true;
                }
                None => {
                    state.ids.push(ObjectIdRecord {
                        id: custom_id.to_string(),
                        mesh: mesh.to_string(),
                        used: true,
                    });
                    state.add_manifest(ManifestEntry {
                        id: custom_id.to_string(),
                        name: name.to_string(),
                        mesh: mesh.to_string(),
                    });
                }
            }
            state.push_snapshot(custom_id, position, rotation, enabled_property(true))
        };

        self.flush_if_full(len).await;
        Ok(())
    }

    /// Unknown ids are logged and recorded anyway.
    pub async fn add_snapshot(
        &self,
        object_id: &str,
        position: Vec3,
        rotation: Quat,
        properties: Option<PropertyMap>,
    ) -> Result<Option<FlushOutcome>> {
        self.require_session().await?;

        let len = {
            let mut state = self.state.lock().await;
            if !state.is_known(object_id) {
                log_warn!("Snapshot for unregistered dynamic object {}", object_id);
            }
            state.push_snapshot(object_id, position, rotation, properties)
        };

        if len >= self.batch_size {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Ends active engagements, records a final disabled snapshot and releases the id.
    pub async fn remove_object(&self, object_id: &str, position: Vec3, rotation: Quat) -> Result<()> {
        self.require_session().await?;

        let len = {
            let mut state = self.state.lock().await;
            let closed = state.engagements.end_all(object_id, now_secs());
            if closed > 0 {
                log_debug!("Closed {} engagements on removed object {}", closed, object_id);
            }
            let len = state.push_snapshot(object_id, position, rotation, enabled_property(false));
            if let Some(record) = state.ids.iter_mut().find(|record| record.id == object_id) {
                record.used = false;
            }
            len
        };

        self.flush_if_full(len).await;
        Ok(())
    }

    /// Returns the occurrence number of the new engagement.
    pub async fn begin_engagement(&self, object_id: &str, name: &str, instance_id: Option<&str>) -> u32 {
        self.state
            .lock()
            .await
            .engagements
            .begin(object_id, name, instance_id, now_secs())
    }

    pub async fn end_engagement(
        &self,
        object_id: &str,
        name: &str,
        instance_id: Option<&str>,
    ) -> EngagementEnd {
        self.state
            .lock()
            .await
            .engagements
            .end(object_id, name, instance_id, now_secs())
    }

    /// Queue the complete manifest again, e.g. after switching scenes.
    pub async fn refresh_object_manifest(&self) {
        let mut state = self.state.lock().await;
        state.pending_manifest = state.full_manifest.clone();
    }

    pub async fn flush(&self) -> Result<FlushOutcome> {
        let identity = self
            .session
            .identity()
            .await
            .ok_or(AnalyticsError::NoActiveSession(Stream::Dynamics))?;

        let (manifest, data, part) = {
            let mut state = self.state.lock().await;
            if state.pending_manifest.is_empty() && state.snapshots.is_empty() {
                return Ok(FlushOutcome::Empty);
            }
            let manifest = std::mem::take(&mut state.pending_manifest);
            let (data, part) = state.snapshots.drain();
            (manifest, data, part)
        };

        let count = data.len();
        let payload = DynamicsPayload {
            userid: &identity.user_id,
            timestamp: now_secs(),
            sessionid: &identity.session_id,
            part,
            formatversion: FORMAT_VERSION,
            manifest: manifest
                .into_iter()
                .map(|entry| (entry.id.clone(), ManifestWire::from(entry)))
                .collect(),
            data,
        };
        let outcome = self.network.post("dynamics", &payload).await?;
        settle(Stream::Dynamics, outcome, part, count)
    }

    /// Reset buffers and engagements; registered objects stay known and their
    /// manifest is queued for the next session.
    pub async fn end_session(&self) {
        let mut state = self.state.lock().await;
        state.snapshots.reset();
        state.engagements.clear();
        state.pending_manifest = state.full_manifest.clone();
    }

    async fn flush_if_full(&self, len: usize) {
        if len < self.batch_size {
            return;
        }
        if let Err(err) = self.flush().await {
            log_error!("Dynamic object auto-flush failed: {}", err);
        }
    }

    pub async fn is_known_id(&self, object_id: &str) -> bool {
        self.state.lock().await.is_known(object_id)
    }

    pub async fn is_id_used(&self, object_id: &str) -> Option<bool> {
        self.state
            .lock()
            .await
            .ids
            .iter()
            .find(|record| record.id == object_id)
            .map(|record| record.used)
    }

    pub async fn buffered_snapshots(&self) -> Vec<DynamicObjectSnapshot> {
        self.state.lock().await.snapshots.entries().to_vec()
    }

    pub async fn pending_manifest_len(&self) -> usize {
        self.state.lock().await.pending_manifest.len()
    }

    pub async fn full_manifest_len(&self) -> usize {
        self.state.lock().await.full_manifest.len()
    }

    pub async fn engagement_history(&self, object_id: &str) -> Vec<EngagementRecord> {
        self.state.lock().await.engagements.history(object_id).to_vec()
    }

    pub async fn next_part(&self) -> u32 {
        self.state.lock().await.snapshots.part()
    }
}
