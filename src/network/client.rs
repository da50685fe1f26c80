use std::sync::Arc;

use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::session::SessionContext;

use super::transport::{HttpMethod, HttpRequest, HttpTransport};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Result of a request that did not fail.
///
/// `Offline` is a success: nothing was sent and the payload is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Sent(u16),
    Offline(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Received { status: u16, body: String },
    Offline(String),
}

#[derive(Clone)]
pub struct NetworkClient {
    transport: Arc<dyn HttpTransport>,
    session: SessionContext,
    host: String,
    version: String,
    api_key: String,
}

impl NetworkClient {
    pub fn new(
        config: &AnalyticsConfig,
        session: SessionContext,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            session,
            host: config.network_host.clone(),
            version: config.network_version.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn base_url(&self) -> String {
        format!("https://{}/v{}", self.host, self.version)
    }

    /// `https://{host}/v{version}/{endpoint}/{sceneId}?version={sceneVersion}`,
    /// or `NoSceneSelected` when the current scene cannot address one.
    pub async fn endpoint_url(&self, endpoint: &str) -> Result<String> {
        let scene = self.session.scene().await;
        if !scene.is_complete() {
            return Err(AnalyticsError::NoSceneSelected);
        }
        Ok(format!(
            "{}/{}/{}?version={}",
            self.base_url(),
            endpoint,
            scene.id,
            scene.version_number
        ))
    }

    pub fn question_set_url(&self, hook: &str) -> String {
        format!("{}/questionSetHooks/{}/questionSet", self.base_url(), hook)
    }

    pub fn exit_poll_response_url(&self, name: &str, version: &str) -> String {
        format!(
            "{}/questionSets/{}/{}/responses",
            self.base_url(),
            name,
            version
        )
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("APIKEY:DATA {}", self.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }

    /// POST a batch to a scene-scoped endpoint (`events`, `gaze`, `sensors`, `dynamics`).
    pub async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<PostOutcome> {
        let url = self.endpoint_url(endpoint).await?;
        self.send_post(url, body).await
    }

    pub async fn post_exit_poll<T: Serialize + ?Sized>(
        &self,
        name: &str,
        version: &str,
        body: &T,
    ) -> Result<PostOutcome> {
        self.require_scene().await?;
        let url = self.exit_poll_response_url(name, version);
        self.send_post(url, body).await
    }

    pub async fn get_question_set(&self, hook: &str) -> Result<FetchOutcome> {
        self.require_scene().await?;
        let url = self.question_set_url(hook);
        if !self.transport.is_online() {
            return Ok(FetchOutcome::Offline(offline_message(&url)));
        }

        let request = HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: self.headers(),
            body: None,
        };
        let response = self
            .transport
            .send(request)
            .await
            .map_err(AnalyticsError::Transport)?;
        Ok(FetchOutcome::Received {
            status: response.status,
            body: response.body,
        })
    }

    async fn require_scene(&self) -> Result<()> {
        if self.session.scene().await.is_complete() {
            Ok(())
        } else {
            Err(AnalyticsError::NoSceneSelected)
        }
    }

    async fn send_post<T: Serialize + ?Sized>(&self, url: String, body: &T) -> Result<PostOutcome> {
        let body = serde_json::to_value(body)?;

        if !self.transport.is_online() {
            let message = offline_message(&url);
            log_warn!("{}", message);
            return Ok(PostOutcome::Offline(message));
        }

        log_debug!("POST {}", url);
        let request = HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: self.headers(),
            body: Some(body),
        };
        let response = self
            .transport
            .send(request)
            .await
            .map_err(AnalyticsError::Transport)?;
        Ok(PostOutcome::Sent(response.status))
    }
}

fn offline_message(url: &str) -> String {
    format!("offline: request to {} was not sent", url)
}
