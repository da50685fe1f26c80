pub mod engagement;
pub mod tracker;
pub mod types;

pub use engagement::{EngagementEnd, EngagementPhase, EngagementRecord, EngagementSummary};
pub use tracker::DynamicObjectTracker;
pub use types::{DynamicObjectSnapshot, ManifestEntry};
