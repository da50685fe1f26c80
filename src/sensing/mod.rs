mod controller;
mod loop_worker;

pub use controller::GazeSampler;
pub use loop_worker::{HeadPose, HeadPoseSource};
