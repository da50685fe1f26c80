pub mod context;
pub mod state;

pub use context::{SessionContext, SessionIdentity};
pub use state::SessionState;
