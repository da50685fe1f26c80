pub mod property;
pub mod scene;
pub mod session;

pub use property::{device_wire_key, DeviceProperty, PropertyMap, PropertyValue};
pub use scene::SceneDescriptor;
pub use session::SessionInfo;

/// Position in world space.
pub type Vec3 = [f64; 3];
/// Orientation quaternion `[x, y, z, w]`.
pub type Quat = [f64; 4];
