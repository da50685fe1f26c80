use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result, Stream};
use crate::models::{Quat, Vec3};
use crate::network::NetworkClient;
use crate::session::SessionContext;
use crate::utils::now_secs;

use super::batch::{settle, Batch, FlushOutcome};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GazeSample {
    pub time: f64,
    #[serde(rename = "p")]
    pub position: Vec3,
    #[serde(rename = "r")]
    pub rotation: Quat,
    #[serde(rename = "g", skip_serializing_if = "Option::is_none")]
    pub gaze_point: Option<Vec3>,
    #[serde(rename = "o", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct GazePayload<'a> {
    userid: &'a str,
    timestamp: f64,
    sessionid: &'a str,
    part: u32,
    hmdtype: &'a str,
    interval: f64,
    data: Vec<GazeSample>,
}

#[derive(Clone)]
pub struct GazeRecorder {
    session: SessionContext,
    network: NetworkClient,
    batch: Arc<Mutex<Batch<GazeSample>>>,
    batch_size: usize,
    hmd_type: String,
    interval_secs: f64,
}

impl GazeRecorder {
    pub fn new(config: &AnalyticsConfig, session: SessionContext, network: NetworkClient) -> Self {
        Self {
            session,
            network,
            batch: Arc::new(Mutex::new(Batch::new())),
            batch_size: config.gaze_batch_size.max(1),
            hmd_type: config.hmd_type.clone(),
            interval_secs: config.gaze_interval_ms as f64 / 1000.0,
        }
    }

    /// Append one head-pose sample; returns the flush result when this sample
    /// filled the batch.
    pub async fn record(
        &self,
        position: Vec3,
        rotation: Quat,
        gaze_point: Option<Vec3>,
        object_id: Option<String>,
    ) -> Result<Option<FlushOutcome>> {
        if !self.session.is_active().await {
            return Err(AnalyticsError::NoActiveSession(Stream::Gaze));
        }

        let sample = GazeSample {
            time: now_secs(),
            position,
            rotation,
            gaze_point,
            object_id,
        };
        let len = self.batch.lock().await.push(sample);
        if len >= self.batch_size {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    pub async fn flush(&self) -> Result<FlushOutcome> {
        let identity = self
            .session
            .identity()
            .await
            .ok_or(AnalyticsError::NoActiveSession(Stream::Gaze))?;

        let (data, part) = {
            let mut batch = self.batch.lock().await;
            if batch.is_empty() {
                return Ok(FlushOutcome::Empty);
            }
            batch.drain()
        };

        let count = data.len();
        let payload = GazePayload {
            userid: &identity.user_id,
            timestamp: now_secs(),
            sessionid: &identity.session_id,
            part,
            hmdtype: &self.hmd_type,
            interval: self.interval_secs,
            data,
        };
        log_debug!("Sending {} gaze samples as part {}", count, part);
        let outcome = self.network.post("gaze", &payload).await?;
        settle(Stream::Gaze, outcome, part, count)
    }

    pub async fn end_session(&self) {
        self.batch.lock().await.reset();
    }

    pub async fn buffered(&self) -> usize {
        self.batch.lock().await.len()
    }

    pub async fn next_part(&self) -> u32 {
        self.batch.lock().await.part()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SceneDescriptor;
    use crate::network::{HttpRequest, HttpResponse, HttpTransport, InMemoryTransport};
    use crate::test_support::Harness;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    /// Holds every request until `release` is notified.
    #[derive(Default)]
    struct GatedTransport {
        inner: InMemoryTransport,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl HttpTransport for GatedTransport {
        fn is_online(&self) -> bool {
            true
        }

        async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, String> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.send(request).await
        }
    }

    const POS: Vec3 = [0.0, 1.6, 0.0];
    const ROT: Quat = [0.0, 0.0, 0.0, 1.0];

    #[tokio::test]
    async fn batch_size_triggers_single_flush() {
        let harness = Harness::active(AnalyticsConfig {
            gaze_batch_size: 2,
            hmd_type: "quest".into(),
            ..AnalyticsConfig::default()
        })
        .await;
        let gaze = GazeRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());

        assert_eq!(gaze.record(POS, ROT, None, None).await.unwrap(), None);
        let flushed = gaze
            .record(POS, ROT, Some([1.0, 1.0, 1.0]), Some("7".into()))
            .await
            .unwrap();
        assert_eq!(flushed, Some(FlushOutcome::Sent { part: 1, count: 2 }));
        assert_eq!(gaze.buffered().await, 0);
        assert_eq!(gaze.next_part().await, 2);

        let requests = harness.transport.requests_to("/gaze/");
        assert_eq!(requests.len(), 1);
        let body = requests[0].body.clone().unwrap();
        assert_eq!(body["part"], json!(1));
        assert_eq!(body["hmdtype"], json!("quest"));
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][0]["p"], json!([0.0, 1.6, 0.0]));
        assert!(body["data"][0].get("g").is_none());
        assert_eq!(body["data"][1]["o"], json!("7"));
    }

    #[tokio::test]
    async fn record_without_session_is_rejected() {
        let harness = Harness::inactive(AnalyticsConfig::default()).await;
        let gaze = GazeRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());

        let err = gaze.record(POS, ROT, None, None).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::NoActiveSession(Stream::Gaze)));
        assert!(matches!(
            gaze.flush().await,
            Err(AnalyticsError::NoActiveSession(Stream::Gaze))
        ));
        assert_eq!(harness.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn empty_flush_is_noop() {
        let harness = Harness::active(AnalyticsConfig::default()).await;
        let gaze = GazeRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());

        assert_eq!(gaze.flush().await.unwrap(), FlushOutcome::Empty);
        assert_eq!(gaze.next_part().await, 1);
        assert_eq!(harness.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_status_still_consumes_part() {
        let harness = Harness::active(AnalyticsConfig::default()).await;
        harness.transport.set_status(503);
        let gaze = GazeRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());

        gaze.record(POS, ROT, None, None).await.unwrap();
        let err = gaze.flush().await.unwrap_err();
        assert!(matches!(err, AnalyticsError::HttpStatus(503)));
        assert_eq!(gaze.buffered().await, 0);
        assert_eq!(gaze.next_part().await, 2);
    }

    #[tokio::test]
    async fn end_session_resets_part() {
        let harness = Harness::active(AnalyticsConfig::default()).await;
        let gaze = GazeRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());

        gaze.record(POS, ROT, None, None).await.unwrap();
        gaze.flush().await.unwrap();
        gaze.record(POS, ROT, None, None).await.unwrap();
        gaze.end_session().await;

        assert_eq!(gaze.buffered().await, 0);
        assert_eq!(gaze.next_part().await, 1);
    }

    #[tokio::test]
    async fn samples_recorded_during_flush_go_to_next_part() {
        let config = AnalyticsConfig::default();
        let session = SessionContext::new("tester", "device-1");
        session
            .set_scene(SceneDescriptor::new("Lobby", "scene-1", "1"))
            .await;
        session.start_session().await;
        let transport = Arc::new(GatedTransport::default());
        let network = NetworkClient::new(&config, session.clone(), transport.clone());
        let gaze = GazeRecorder::new(&config, session, network);

        gaze.record([1.0, 0.0, 0.0], ROT, None, None).await.unwrap();
        let in_flight = tokio::spawn({
            let gaze = gaze.clone();
            async move { gaze.flush().await }
        });
        transport.entered.notified().await;

        gaze.record([2.0, 0.0, 0.0], ROT, None, None).await.unwrap();
        assert_eq!(gaze.buffered().await, 1);
        assert_eq!(gaze.next_part().await, 2);

        transport.release.notify_one();
        let first = in_flight.await.unwrap().unwrap();
        assert_eq!(first, FlushOutcome::Sent { part: 1, count: 1 });

        transport.release.notify_one();
        let second = gaze.flush().await.unwrap();
        assert_eq!(second, FlushOutcome::Sent { part: 2, count: 1 });

        let requests = transport.inner.requests();
        assert_eq!(requests.len(), 2);
        let first_body = requests[0].body.clone().unwrap();
        let second_body = requests[1].body.clone().unwrap();
        assert_eq!(first_body["data"][0]["p"], json!([1.0, 0.0, 0.0]));
        assert_eq!(second_body["part"], json!(2));
        assert_eq!(second_body["data"][0]["p"], json!([2.0, 0.0, 0.0]));
    }
}
