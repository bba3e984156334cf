// aracna_rs: host-side motion engine for serial servo-bus walking robots
//
// A caller-supplied motion function is sampled on a fixed-rate tick loop,
// blended between phase endpoints, cropped to servo limits and sent to the
// controller one POSITION command at a time.

pub mod channel;
pub mod clock;
pub mod config;
pub mod keyframes;
pub mod limits;
pub mod protocol;
pub mod runner;
pub mod serial;
pub mod session;
pub mod sim;
pub mod tick_log;
pub mod trajectory;

pub use channel::{ChannelError, CommandChannel, CommandStats};
pub use clock::Clock;
pub use config::{load_config, Config, ConfigError};
pub use keyframes::{Keyframe, KeyframeMotion};
pub use limits::{CropPolicy, ServoLimits};
pub use protocol::{Command, Protocol};
pub use runner::{RunOptions, RunSummary};
pub use session::{RobotError, RobotSession};
pub use tick_log::{TickLog, TickSink};
pub use trajectory::{interpolate, time_scaled, Endpoint, Position};
