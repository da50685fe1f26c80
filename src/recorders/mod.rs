pub mod batch;
pub mod custom_event;
pub mod gaze;
pub mod sensor;

pub use batch::{Batch, FlushOutcome};
pub use custom_event::{CustomEventEntry, CustomEventRecorder};
pub use gaze::{GazeRecorder, GazeSample};
pub use sensor::{SensorRecorder, SensorSample, SensorSeries};
