use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;

use crate::analytics::Analytics;
use crate::config::AnalyticsConfig;
use crate::models::PropertyMap;
use crate::sensing::{HeadPose, HeadPoseSource};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const DEMO_SECONDS: u64 = 3;

/// Standing head with a little tracking noise.
struct JitteredHead;

impl HeadPoseSource for JitteredHead {
    fn head_pose(&self) -> Option<HeadPose> {
        let mut rng = rand::thread_rng();
        Some(HeadPose {
            position: [
                rng.gen_range(-0.02..0.02),
                1.6 + rng.gen_range(-0.01..0.01),
                rng.gen_range(-0.02..0.02),
            ],
            rotation: [0.0, rng.gen_range(-0.05..0.05), 0.0, 1.0],
            gaze_point: Some([0.0, 1.5, 3.0]),
            object_id: None,
        })
    }
}

pub fn run_demo(config_path: Option<String>) -> Result<()> {
    let config = match config_path {
        Some(path) => AnalyticsConfig::load(&path)?,
        None => {
            log_warn!("No config file given, running with defaults and no scene");
            AnalyticsConfig::default()
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(demo_session(config))
}

async fn demo_session(config: AnalyticsConfig) -> Result<()> {
    let analytics = Analytics::with_reqwest(config)
        .await
        .context("failed to set up analytics")?;

    analytics.start_session().await?;
    analytics
        .session()
        .set_user_property("demo.build", env!("CARGO_PKG_VERSION"))
        .await;
    analytics
        .start_gaze_sampling(Arc::new(JitteredHead))
        .await?;

    let door = analytics
        .dynamics()
        .register_object("Door", "door_mesh", [2.0, 0.0, 3.0], [0.0, 0.0, 0.0, 1.0])
        .await?;
    analytics.dynamics().begin_engagement(&door, "gaze", None).await;

    let mut heart_rate: f64 = rand::thread_rng().gen_range(60.0..80.0);
    for second in 0..DEMO_SECONDS {
        tokio::time::sleep(Duration::from_secs(1)).await;
        heart_rate += 1.5;
        analytics.sensors().record("c3d.heartrate", heart_rate).await?;
        analytics
            .dynamics()
            .add_snapshot(&door, [2.0, 0.0, 3.0], [0.0, 0.0, 0.0, 1.0], None)
            .await?;
        log_info!("Demo second {} recorded", second + 1);
    }

    analytics.dynamics().end_engagement(&door, "gaze", None).await;
    let mut properties = PropertyMap::new();
    properties.insert("door".to_string(), door.clone().into());
    analytics
        .events()
        .record("Door Looked At", [2.0, 1.0, 3.0], Some(properties))
        .await?;

    let info = analytics.end_session().await?;
    log_info!(
        "Session {} finished after {:.1}s",
        info.id,
        info.length_secs
    );
    Ok(())
}
