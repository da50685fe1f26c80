use std::sync::Arc;

use crate::config::AnalyticsConfig;
use crate::models::SceneDescriptor;
use crate::network::{InMemoryTransport, NetworkClient};
use crate::session::SessionContext;

pub(crate) struct Harness {
    pub config: AnalyticsConfig,
    pub session: SessionContext,
    pub network: NetworkClient,
    pub transport: Arc<InMemoryTransport>,
}

impl Harness {
    pub async fn inactive(config: AnalyticsConfig) -> Self {
        let session = SessionContext::new("tester", "device-1");
        session
            .set_scene(SceneDescriptor::new("Lobby", "scene-1", "1"))
            .await;
        let transport = Arc::new(InMemoryTransport::new());
        let network = NetworkClient::new(&config, session.clone(), transport.clone());
        Self {
            config,
            session,
            network,
            transport,
        }
    }

    pub async fn active(config: AnalyticsConfig) -> Self {
        let harness = Self::inactive(config).await;
        harness.session.start_session().await;
        harness
    }
}
