pub mod analytics;
pub mod config;
mod demo;
pub mod device;
pub mod dynamics;
pub mod error;
pub mod exitpoll;
pub mod models;
pub mod network;
pub mod recorders;
pub mod sensing;
pub mod session;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use analytics::{Analytics, SendReport};
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, Result, Stream};
pub use models::{PropertyMap, PropertyValue, Quat, SceneDescriptor, Vec3};
pub use network::{HttpTransport, InMemoryTransport, ReqwestTransport};
pub use recorders::FlushOutcome;
pub use sensing::{HeadPose, HeadPoseSource};
pub use session::SessionContext;

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV: &str = "CVR_CONFIG";

pub fn run() {
    utils::logging::init();

    log::info!("cvr-telemetry starting up...");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok());

    if let Err(err) = demo::run_demo(config_path) {
        log::error!("Demo session failed: {err:#}");
        std::process::exit(1);
    }
}
