use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::recorders::GazeRecorder;

use super::loop_worker::{gaze_loop, HeadPoseSource};

/// Owns the background task that feeds head poses into a [`GazeRecorder`].
pub struct GazeSampler {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl GazeSampler {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    /// True while the sampling task has been started and has not exited.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn start(
        &mut self,
        recorder: GazeRecorder,
        source: Arc<dyn HeadPoseSource>,
        interval: Duration,
    ) -> Result<()> {
        if self.is_running() {
            bail!("gaze sampling already active");
        }
        // A task that exited on its own still leaves a handle behind.
        self.handle = None;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(gaze_loop(recorder, source, interval, cancel_token.clone()));

        info!("Gaze sampling started every {:?}", interval);
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("gaze sampling task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for GazeSampler {
    fn default() -> Self {
        Self::new()
    }
}
