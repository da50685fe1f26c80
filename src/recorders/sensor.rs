use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result, Stream};
use crate::models::PropertyMap;
use crate::network::NetworkClient;
use crate::session::SessionContext;
use crate::utils::now_secs;

use super::batch::{settle, Batch, FlushOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSample {
    pub name: String,
    pub timestamp: f64,
    pub value: f64,
}

/// One sensor's time series as sent on the wire: `[[time, value], ...]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSeries {
    pub name: String,
    pub data: Vec<[f64; 2]>,
}

#[derive(Debug, Serialize)]
struct SensorPayload<'a> {
    userid: &'a str,
    timestamp: f64,
    sessionid: &'a str,
    part: u32,
    data: Vec<SensorSeries>,
    #[serde(skip_serializing_if = "PropertyMap::is_empty")]
    properties: PropertyMap,
}

/// Group samples by sensor name, keeping first-seen name order and sample order.
pub fn group_series(samples: Vec<SensorSample>) -> Vec<SensorSeries> {
    let mut series: Vec<SensorSeries> = Vec::new();
    for sample in samples {
        match series.iter_mut().find(|s| s.name == sample.name) {
            Some(existing) => existing.data.push([sample.timestamp, sample.value]),
            None => series.push(SensorSeries {
                name: sample.name,
                data: vec![[sample.timestamp, sample.value]],
            }),
        }
    }
    series
}

#[derive(Clone)]
pub struct SensorRecorder {
    session: SessionContext,
    network: NetworkClient,
    batch: Arc<Mutex<Batch<SensorSample>>>,
    batch_size: usize,
}

impl SensorRecorder {
    pub fn new(config: &AnalyticsConfig, session: SessionContext, network: NetworkClient) -> Self {
        Self {
            session,
            network,
            batch: Arc::new(Mutex::new(Batch::new())),
            batch_size: config.sensor_batch_size.max(1),
        }
    }

    /// The batch threshold counts samples across all sensor names.
    pub async fn record(&self, name: impl Into<String>, value: f64) -> Result<Option<FlushOutcome>> {
        if !self.session.is_active().await {
            return Err(AnalyticsError::NoActiveSession(Stream::Sensors));
        }

        let sample = SensorSample {
            name: name.into(),
            timestamp: now_secs(),
            value,
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
            .ok_or(AnalyticsError::NoActiveSession(Stream::Sensors))?;

        let (samples, part) = {
            let mut batch = self.batch.lock().await;
            if batch.is_empty() {
                return Ok(FlushOutcome::Empty);
            }
            batch.drain()
        };

        let count = samples.len();
        let payload = SensorPayload {
            userid: &identity.user_id,
            timestamp: now_secs(),
            sessionid: &identity.session_id,
            part,
            data: group_series(samples),
            properties: self.session.merged_properties().await,
        };
        let outcome = self.network.post("sensors", &payload).await?;
        settle(Stream::Sensors, outcome, part, count)
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

    #[test]
    fn grouping_keeps_name_and_sample_order() {
        let samples = vec![
            SensorSample { name: "hr".into(), timestamp: 1.0, value: 60.0 },
            SensorSample { name: "fps".into(), timestamp: 1.5, value: 72.0 },
            SensorSample { name: "hr".into(), timestamp: 2.0, value: 62.0 },
        ];
        let series = group_series(samples);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "hr");
        assert_eq!(series[0].data, vec![[1.0, 60.0], [2.0, 62.0]]);
        assert_eq!(series[1].name, "fps");
    }

    #[tokio::test]
    async fn threshold_counts_across_names() {
        let harness = Harness::active(AnalyticsConfig {
            sensor_batch_size: 3,
            ..AnalyticsConfig::default()
        })
        .await;
        let sensors =
            SensorRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());
        harness.session.set_user_property("cohort", "beta").await;

        assert!(sensors.record("hr", 60.0).await.unwrap().is_none());
        assert!(sensors.record("fps", 72.0).await.unwrap().is_none());
        let flushed = sensors.record("hr", 61.0).await.unwrap();
        assert_eq!(flushed, Some(FlushOutcome::Sent { part: 1, count: 3 }));

        let body = harness.transport.requests_to("/sensors/")[0].body.clone().unwrap();
        assert_eq!(body["data"][0]["name"], json!("hr"));
        assert_eq!(body["data"][0]["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][1]["data"][0][1], json!(72.0));
        assert_eq!(body["properties"]["cohort"], json!("beta"));
    }

    #[tokio::test]
    async fn rejects_without_session() {
        let harness = Harness::inactive(AnalyticsConfig::default()).await;
        let sensors =
            SensorRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());

        assert!(matches!(
            sensors.record("hr", 1.0).await,
            Err(AnalyticsError::NoActiveSession(Stream::Sensors))
        ));
        assert!(sensors.flush().await.unwrap_err().is_no_session());
        assert_eq!(harness.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn offline_flush_drops_batch() {
        let harness = Harness::active(AnalyticsConfig::default()).await;
        harness.transport.set_online(false);
        let sensors =
            SensorRecorder::new(&harness.config, harness.session.clone(), harness.network.clone());

        sensors.record("hr", 60.0).await.unwrap();
        assert!(matches!(sensors.flush().await.unwrap(), FlushOutcome::Offline(_)));
        assert_eq!(sensors.buffered().await, 0);
        assert_eq!(sensors.next_part().await, 2);
        assert_eq!(harness.transport.request_count(), 0);
    }
}
