use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result, Stream};
use crate::models::{PropertyMap, Vec3};
use crate::network::NetworkClient;
use crate::session::SessionContext;
use crate::utils::now_secs;

use super::batch::{settle, Batch, FlushOutcome};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomEventEntry {
    pub name: String,
    pub time: f64,
    pub point: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
}

#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    userid: &'a str,
    timestamp: f64,
    sessionid: &'a str,
    part: u32,
    data: Vec<CustomEventEntry>,
    #[serde(skip_serializing_if = "PropertyMap::is_empty")]
    properties: PropertyMap,
}

#[derive(Clone)]
pub struct CustomEventRecorder {
    session: SessionContext,
    network: NetworkClient,
    batch: Arc<Mutex<Batch<CustomEventEntry>>>,
    batch_size: usize,
}

impl CustomEventRecorder {
    pub fn new(config: &AnalyticsConfig, session: SessionContext, network: NetworkClient) -> Self {
        Self {
            session,
            network,
            batch: Arc::new(Mutex::new(Batch::new())),
            batch_size: config.event_batch_size.max(1),
        }
    }

    pub async fn record(
        &self,
        name: impl Into<String>,
        point: Vec3,
        properties: Option<PropertyMap>,
    ) -> Result<Option<FlushOutcome>> {
        if !self.session.is_active().await {
            return Err(AnalyticsError::NoActiveSession(Stream::CustomEvents));
        }

        let entry = CustomEventEntry {
            name: name.into(),
            time: now_secs(),
            point,
            properties: properties.filter(|props| !props.is_empty()),
        };
        let len = self.batch.lock().await.push(entry);
        if len >= self.batch_size {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Ships buffered events together with session properties written since
    /// the previous batch.
    pub async fn flush(&self) -> Result<FlushOutcome> {
        let identity = self
            .session
            .identity()
            .await
            .ok_or(AnalyticsError::NoActiveSession(Stream::CustomEvents))?;

        let (data, part, properties) = {
            let mut batch = self.batch.lock().await;
            if batch.is_empty() && !self.session.has_pending_properties().await {
                return Ok(FlushOutcome::Empty);
            }
            let (data, part) = batch.drain();
            (data, part, self.session.take_pending_properties().await)
        };

        let count = data.len();
        let payload = EventPayload {
            userid: &identity.user_id,
            timestamp: now_secs(),
            sessionid: &identity.session_id,
            part,
            data,
            properties,
        };
        let outcome = self.network.post("events", &payload).await?;
        settle(Stream::CustomEvents, outcome, part, count)
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
    use crate::test_support::Harness;
    use serde_json::json;

    fn recorder(harness: &Harness) -> CustomEventRecorder {
        CustomEventRecorder::new(&harness.config, harness.session.clone(), harness.network.clone())
    }

    #[tokio::test]
    async fn threshold_flush_sends_events_in_order() {
        let harness = Harness::active(AnalyticsConfig {
            event_batch_size: 2,
            ..AnalyticsConfig::default()
        })
        .await;
        let events = recorder(&harness);

        let mut props = PropertyMap::new();
        props.insert("score".into(), 10.into());
        events.record("a", [0.0; 3], Some(props)).await.unwrap();
        let outcome = events.record("b", [1.0, 2.0, 3.0], None).await.unwrap();
        assert_eq!(outcome, Some(FlushOutcome::Sent { part: 1, count: 2 }));

        let sent = harness.transport.requests_to("/events/");
        assert_eq!(sent.len(), 1);
        let body = sent[0].body.clone().unwrap();
        assert_eq!(body["data"][0]["name"], json!("a"));
        assert_eq!(body["data"][0]["properties"]["score"], json!(10.0));
        assert_eq!(body["data"][1]["name"], json!("b"));
        assert!(body["data"][1].get("properties").is_none());
        assert_eq!(events.next_part().await, 2);
    }

    #[tokio::test]
    async fn pending_properties_alone_force_a_send() {
        let harness = Harness::active(AnalyticsConfig::default()).await;
        let events = recorder(&harness);
        harness.session.set_device_property("DeviceOS", "linux").await;

        let outcome = events.flush().await.unwrap();
        assert_eq!(outcome, FlushOutcome::Sent { part: 1, count: 0 });
        let body = harness.transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["properties"]["cvr.device.os"], json!("linux"));

        // Delivered once; nothing left to send.
        assert_eq!(events.flush().await.unwrap(), FlushOutcome::Empty);
    }

    #[tokio::test]
    async fn rejects_without_session() {
        let harness = Harness::inactive(AnalyticsConfig::default()).await;
        let events = recorder(&harness);

        assert!(events.record("a", [0.0; 3], None).await.unwrap_err().is_no_session());
        assert!(events.flush().await.unwrap_err().is_no_session());
        assert_eq!(harness.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn parts_restart_after_new_session() {
        let harness = Harness::active(AnalyticsConfig::default()).await;
        let events = recorder(&harness);

        events.record("a", [0.0; 3], None).await.unwrap();
        events.flush().await.unwrap();
        events.record("b", [0.0; 3], None).await.unwrap();
        events.flush().await.unwrap();
        assert_eq!(events.next_part().await, 3);

        events.end_session().await;
        harness.session.end_session().await;
        harness.session.start_session().await;
        events.record("c", [0.0; 3], None).await.unwrap();
        assert_eq!(
            events.flush().await.unwrap(),
            FlushOutcome::Sent { part: 1, count: 1 }
        );
    }
}
