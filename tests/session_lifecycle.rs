use std::sync::Arc;

use cvr_telemetry_lib::dynamics::EngagementEnd;
use cvr_telemetry_lib::{
    Analytics, AnalyticsConfig, AnalyticsError, FlushOutcome, InMemoryTransport, SceneDescriptor,
    Stream,
};
use serde_json::json;

fn config(batch_size: usize) -> AnalyticsConfig {
    AnalyticsConfig {
        api_key: "test-key".into(),
        user_id: "player-1".into(),
        device_id: "headset-9".into(),
        gaze_batch_size: batch_size,
        event_batch_size: batch_size,
        sensor_batch_size: batch_size,
        dynamic_batch_size: batch_size,
        collect_device_properties: false,
        scenes: vec![SceneDescriptor::new("Gallery", "gallery-id", "3")],
        default_scene: Some("Gallery".into()),
        ..AnalyticsConfig::default()
    }
}

async fn setup(config: AnalyticsConfig) -> (Analytics, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let analytics = Analytics::new(config, transport.clone())
        .await
        .expect("analytics should build");
    (analytics, transport)
}

#[tokio::test]
async fn batch_of_two_flushes_once_and_advances_part() {
    let (analytics, transport) = setup(config(2)).await;
    analytics.start_session().await.unwrap();

    let rotation = [0.0, 0.0, 0.0, 1.0];
    let first = analytics.gaze().record([0.0, 1.0, 0.0], rotation, None, None).await.unwrap();
    assert!(first.is_none());
    let second = analytics.gaze().record([0.0, 1.1, 0.0], rotation, None, None).await.unwrap();
    assert_eq!(second, Some(FlushOutcome::Sent { part: 1, count: 2 }));

    let posted = transport.requests_to("/gaze/gallery-id?version=3");
    assert_eq!(posted.len(), 1);
    let body = posted[0].body.clone().unwrap();
    assert_eq!(body["part"], json!(1));
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][1]["p"], json!([0.0, 1.1, 0.0]));
    assert_eq!(
        posted[0].header("authorization"),
        Some("APIKEY:DATA test-key")
    );

    assert_eq!(analytics.gaze().buffered().await, 0);
    assert_eq!(analytics.gaze().next_part().await, 2);
}

#[tokio::test]
async fn part_counters_restart_with_each_session() {
    let (analytics, _transport) = setup(config(64)).await;

    analytics.start_session().await.unwrap();
    analytics.sensors().record("fps", 72.0).await.unwrap();
    analytics.send_data().await.unwrap();
    analytics.sensors().record("fps", 71.0).await.unwrap();
    analytics.send_data().await.unwrap();
    assert_eq!(analytics.sensors().next_part().await, 3);
    let first_id = analytics.session().session_id().await.unwrap();

    analytics.end_session().await.unwrap();
    assert_eq!(analytics.sensors().next_part().await, 1);

    analytics.start_session().await.unwrap();
    assert_eq!(analytics.sensors().next_part().await, 1);
    assert!(analytics.session().session_id().await.unwrap().ends_with("_player-1"));
    assert!(first_id.ends_with("_player-1"));
}

#[tokio::test]
async fn inactive_session_rejects_without_network() {
    let (analytics, transport) = setup(config(64)).await;

    let err = analytics.events().record("jump", [0.0; 3], None).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::NoActiveSession(Stream::CustomEvents)));
    let err = analytics.gaze().flush().await.unwrap_err();
    assert!(matches!(err, AnalyticsError::NoActiveSession(Stream::Gaze)));
    assert!(analytics.send_data().await.unwrap_err().is_no_session());

    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn missing_scene_fails_fast() {
    let mut config = config(64);
    config.default_scene = None;
    let (analytics, transport) = setup(config).await;
    analytics.start_session().await.unwrap();

    let err = analytics.events().flush().await.unwrap_err();
    assert!(matches!(err, AnalyticsError::NoSceneSelected));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn offline_flush_resolves_without_sending() {
    let (analytics, transport) = setup(config(64)).await;
    analytics.start_session().await.unwrap();
    transport.set_online(false);

    analytics.sensors().record("battery", 0.8).await.unwrap();
    let outcome = analytics.sensors().flush().await.unwrap();
    assert!(matches!(outcome, FlushOutcome::Offline(_)));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(analytics.sensors().buffered().await, 0);
}

#[tokio::test]
async fn engagement_and_removal_reach_the_collector() {
    let (analytics, transport) = setup(config(64)).await;
    analytics.start_session().await.unwrap();
    let dynamics = analytics.dynamics();
    let rotation = [0.0, 0.0, 0.0, 1.0];

    let lamp = dynamics
        .register_object("Lamp", "lamp_mesh", [1.0, 0.0, 1.0], rotation)
        .await
        .unwrap();
    let ended = dynamics.end_engagement(&lamp, "grab", None).await;
    assert!(matches!(ended, EngagementEnd::SelfHealed { number: 1, .. }));

    dynamics.add_snapshot(&lamp, [1.0, 0.5, 1.0], rotation, None).await.unwrap();
    dynamics.remove_object(&lamp, [1.0, 0.5, 1.0], rotation).await.unwrap();
    assert!(dynamics.is_known_id(&lamp).await);
    dynamics.add_snapshot(&lamp, [1.0, 0.5, 1.0], rotation, None).await.unwrap();

    analytics.send_data().await.unwrap();
    let posted = transport.requests_to("/dynamics/gallery-id");
    assert_eq!(posted.len(), 1);
    let body = posted[0].body.clone().unwrap();

    assert_eq!(body["manifest"][&lamp]["name"], json!("Lamp"));
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 4);
    assert_eq!(data[0]["properties"]["enabled"], json!(true));
    assert_eq!(data[1]["engagements"][0]["engagementtype"], json!("grab"));
    assert_eq!(data[1]["engagements"][0]["engagement_count"], json!(1));
    assert!(data[2].get("engagements").is_none());
    assert_eq!(data[2]["properties"]["enabled"], json!(false));
}
