use std::sync::Arc;

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::{Quat, Vec3};
use crate::recorders::{FlushOutcome, GazeRecorder};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// One head-pose reading from the host's tracking system.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub gaze_point: Option<Vec3>,
    pub object_id: Option<String>,
}

/// Supplies head poses to the gaze sampler; `None` skips the tick.
pub trait HeadPoseSource: Send + Sync {
    fn head_pose(&self) -> Option<HeadPose>;
}

pub async fn gaze_loop(
    recorder: GazeRecorder,
    source: Arc<dyn HeadPoseSource>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(pose) = source.head_pose() else {
                    log_debug!("no head pose this tick");
                    continue;
                };

                match recorder
                    .record(pose.position, pose.rotation, pose.gaze_point, pose.object_id)
                    .await
                {
                    Ok(Some(FlushOutcome::Offline(message))) => log_warn!("gaze batch dropped: {}", message),
                    Ok(_) => {}
                    Err(err) if err.is_no_session() => {
                        log_info!("gaze sampling stopped: session ended");
                        break;
                    }
                    Err(err) => log_error!("gaze sample failed: {err}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("gaze sampling loop shutting down");
                break;
            }
        }
    }
}
