pub mod env;
pub mod flight;
pub mod observation;
pub mod policy;
pub mod progress;
pub mod race_loop;
pub mod race_state;
pub mod ranking;
pub mod reward;
pub mod sensors;
pub mod session;
pub mod telemetry;
pub mod track;

pub use env::{BatchEnv, StepResult, TrainingEnv};
pub use policy::*;
pub use race_loop::*;
pub use session::*;
pub use track::{CheckpointTrack, TrackGeometry, WaypointPath};
