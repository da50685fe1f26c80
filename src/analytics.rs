use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::config::AnalyticsConfig;
use crate::device::DeviceProbe;
use crate::dynamics::DynamicObjectTracker;
use crate::error::{AnalyticsError, Result};
use crate::exitpoll::ExitPollClient;
use crate::models::{DeviceProperty, PropertyMap, SessionInfo};
use crate::network::{HttpTransport, NetworkClient, ReqwestTransport};
use crate::recorders::{CustomEventRecorder, FlushOutcome, GazeRecorder, SensorRecorder};
use crate::sensing::{GazeSampler, HeadPoseSource};
use crate::session::SessionContext;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const SESSION_START_EVENT: &str = "Session Start";
pub const SESSION_END_EVENT: &str = "Session End";

/// Per-stream results of one [`Analytics::send_data`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    pub events: FlushOutcome,
    pub gaze: FlushOutcome,
    pub sensors: FlushOutcome,
    pub dynamics: FlushOutcome,
}

/// Entry point wiring the session, the stream recorders and exit polls
/// around one shared [`SessionContext`].
#[derive(Clone)]
pub struct Analytics {
    config: Arc<AnalyticsConfig>,
    session: SessionContext,
    network: NetworkClient,
    gaze: GazeRecorder,
    events: CustomEventRecorder,
    sensors: SensorRecorder,
    dynamics: DynamicObjectTracker,
    exit_poll: ExitPollClient,
    sampler: Arc<Mutex<GazeSampler>>,
}

impl Analytics {
    /// Build every component over `transport` and select `default_scene`
    /// when the config names one.
    pub async fn new(config: AnalyticsConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let session = SessionContext::new(config.user_id.clone(), config.device_id.clone());
        let network = NetworkClient::new(&config, session.clone(), transport);

        let gaze = GazeRecorder::new(&config, session.clone(), network.clone());
        let events = CustomEventRecorder::new(&config, session.clone(), network.clone());
        let sensors = SensorRecorder::new(&config, session.clone(), network.clone());
        let dynamics = DynamicObjectTracker::new(&config, session.clone(), network.clone());
        let exit_poll = ExitPollClient::new(session.clone(), network.clone(), events.clone());

        let analytics = Self {
            config: Arc::new(config),
            session,
            network,
            gaze,
            events,
            sensors,
            dynamics,
            exit_poll,
            sampler: Arc::new(Mutex::new(GazeSampler::new())),
        };

        if let Some(scene) = analytics.config.default_scene.clone() {
            analytics.set_scene(&scene).await?;
        }
        Ok(analytics)
    }

    pub async fn with_reqwest(config: AnalyticsConfig) -> Result<Self> {
        Self::new(config, Arc::new(ReqwestTransport::new())).await
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Shared session handle for identity and properties.
    ///
    /// Start and end sessions through [`Analytics::start_session`] and
    /// [`Analytics::end_session`]: ending directly on the context leaves the
    /// recorders' buffers and part counters untouched.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn network(&self) -> &NetworkClient {
        &self.network
    }

    pub fn gaze(&self) -> &GazeRecorder {
        &self.gaze
    }

    pub fn events(&self) -> &CustomEventRecorder {
        &self.events
    }

    pub fn sensors(&self) -> &SensorRecorder {
        &self.sensors
    }

    pub fn dynamics(&self) -> &DynamicObjectTracker {
        &self.dynamics
    }

    pub fn exit_poll(&self) -> &ExitPollClient {
        &self.exit_poll
    }

    /// Returns `Ok(false)` when a session is already running. Once the session
    /// is active this succeeds; a failed auto-flush of the start event is logged.
    pub async fn start_session(&self) -> Result<bool> {
        if !self.session.start_session().await {
            return Ok(false);
        }

        if !self.config.hmd_type.is_empty() {
            self.session
                .set_device_property_typed(DeviceProperty::VrModel, self.config.hmd_type.clone())
                .await;
        }
        if self.config.collect_device_properties {
            DeviceProbe::new().apply(&self.session).await;
        }

        if let Err(err) = self.events.record(SESSION_START_EVENT, [0.0; 3], None).await {
            log_error!("Session start event flush failed: {}", err);
        }
        Ok(true)
    }

    /// Log the end event, ship every buffer and reset all components.
    ///
    /// Components are reset even when the final upload fails; the upload error
    /// is returned afterwards.
    pub async fn end_session(&self) -> Result<SessionInfo> {
        let started_at = self
            .session
            .started_at()
            .await
            .ok_or(AnalyticsError::NoSession)?;
        let session_id = self.session.session_id().await.unwrap_or_default();

        if let Err(err) = self.stop_gaze_sampling().await {
            log_error!("Failed to stop gaze sampling: {err:#}");
        }

        let length_secs = self.session.session_length_secs().await;
        let mut properties = PropertyMap::new();
        properties.insert("sessionlength".to_string(), length_secs.into());
        let recorded = self
            .events
            .record(SESSION_END_EVENT, [0.0; 3], Some(properties))
            .await;

        let sent = self.send_data().await;

        self.gaze.end_session().await;
        self.events.end_session().await;
        self.sensors.end_session().await;
        self.dynamics.end_session().await;
        self.session.end_session().await;

        recorded?;
        sent?;
        Ok(SessionInfo {
            id: session_id,
            started_at,
            stopped_at: Utc::now(),
            length_secs,
        })
    }

    /// Flush every stream concurrently.
    ///
    /// All four flushes run to completion; the first failure is then reported
    /// even though sibling streams have already delivered their batches.
    pub async fn send_data(&self) -> Result<SendReport> {
        let (events, gaze, sensors, dynamics) = tokio::join!(
            self.events.flush(),
            self.gaze.flush(),
            self.sensors.flush(),
            self.dynamics.flush(),
        );

        let report = SendReport {
            events: events?,
            gaze: gaze?,
            sensors: sensors?,
            dynamics: dynamics?,
        };
        for outcome in [&report.events, &report.gaze, &report.sensors, &report.dynamics] {
            if let FlushOutcome::Offline(message) = outcome {
                log_warn!("Batch dropped while offline: {}", message);
            }
        }
        Ok(report)
    }

    /// Switch to a scene from the configured registry.
    ///
    /// Mid-session, buffered data is sent to the previous scene first and the
    /// dynamic object manifest is queued again for the new one.
    pub async fn set_scene(&self, name: &str) -> Result<()> {
        let scene = self
            .config
            .find_scene(name)
            .cloned()
            .ok_or_else(|| AnalyticsError::UnknownScene(name.to_string()))?;

        let active = self.session.is_active().await;
        if active {
            if let Err(err) = self.send_data().await {
                log_error!("Failed to send data before switching to scene '{}': {}", name, err);
            }
        }

        log_info!("Scene set to '{}' ({} v{})", scene.name, scene.id, scene.version_number);
        self.session.set_scene(scene).await;
        if active {
            self.dynamics.refresh_object_manifest().await;
        }
        Ok(())
    }

    pub async fn start_gaze_sampling(&self, source: Arc<dyn HeadPoseSource>) -> anyhow::Result<()> {
        let interval = Duration::from_millis(self.config.gaze_interval_ms.max(1));
        self.sampler
            .lock()
            .await
            .start(self.gaze.clone(), source, interval)
    }

    pub async fn stop_gaze_sampling(&self) -> anyhow::Result<()> {
        self.sampler.lock().await.stop().await
    }

    pub async fn is_sampling(&self) -> bool {
        self.sampler.lock().await.is_running()
    }
}
