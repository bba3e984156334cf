//! # Robot Host Configuration
//!
//! Serial link, robot geometry, wire constants, run defaults and an optional
//! keyframe motion, all loaded from one TOML file.
//!
//! ## Example
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud = 38400
//!
//! [robot]
//! expected_ids = [0, 1, 2, 3, 4, 5, 6, 7]
//! command_rate = 40.0
//! ready_pose = [512, 512, 512, 512, 512, 512, 512, 512]
//!
//! [run]
//! run_seconds = 10.0
//! interp_begin = 2.0
//! ```
//!
//! Every field has a default, so an empty file describes an eight-servo robot
//! with 0..=1023 limits on `/dev/ttyUSB0`.

// src/config.rs - Single configuration file
use crate::keyframes::KeyframeMotion;
use crate::limits::{CropPolicy, ServoLimits};
use crate::protocol::Protocol;
use crate::runner::RunOptions;
use crate::trajectory::Position;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("expected position vector of length {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub motion: Option<KeyframeMotion>,
}

/// Serial link to the servo-bus controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Milliseconds to wait for each reply; 0 waits forever.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

impl SerialConfig {
    pub fn reply_timeout(&self) -> Option<Duration> {
        match self.reply_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Servo layout, limits and reference poses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RobotConfig {
    #[serde(default = "default_expected_ids")]
    pub expected_ids: Vec<u8>,
    /// Target command rate in Hz. Transport latency usually keeps the
    /// achieved rate below this.
    #[serde(default = "default_command_rate")]
    pub command_rate: f64,
    #[serde(default = "default_min_position")]
    pub min_position: i32,
    #[serde(default = "default_max_position")]
    pub max_position: i32,
    /// Per-axis `[min, max]`, overriding `min_position`/`max_position`.
    #[serde(default)]
    pub axis_limits: Option<Vec<[i32; 2]>>,
    #[serde(default)]
    pub flat_pose: Option<Position>,
    #[serde(default)]
    pub ready_pose: Option<Position>,
    /// Seconds spent on each leg of the reset move.
    #[serde(default = "default_reset_duration")]
    pub reset_duration: f64,
    #[serde(default)]
    pub crop_warning: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            expected_ids: default_expected_ids(),
            command_rate: default_command_rate(),
            min_position: default_min_position(),
            max_position: default_max_position(),
            axis_limits: None,
            flat_pose: None,
            ready_pose: None,
            reset_duration: default_reset_duration(),
            crop_warning: false,
        }
    }
}

impl RobotConfig {
    pub fn servo_count(&self) -> usize {
        self.expected_ids.len()
    }

    pub fn limits(&self) -> Result<ServoLimits, ConfigError> {
        match &self.axis_limits {
            Some(bounds) => ServoLimits::per_axis(bounds),
            None => ServoLimits::per_axis(&vec![[self.min_position, self.max_position]; self.servo_count()]),
        }
    }

    pub fn flat_pose(&self) -> Result<Position, ConfigError> {
        Ok(self.flat_pose.clone().unwrap_or(self.limits()?.center()))
    }

    pub fn ready_pose(&self) -> Result<Position, ConfigError> {
        Ok(self.ready_pose.clone().unwrap_or(self.limits()?.center()))
    }

    pub fn command_period(&self) -> Duration {
        Duration::from_nanos((1e9 / self.command_rate).round() as u64)
    }

    pub fn crop_policy(&self) -> CropPolicy {
        if self.crop_warning {
            CropPolicy::Warn
        } else {
            CropPolicy::Silent
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let servo_count = self.servo_count();
        if servo_count == 0 {
            return Err(ConfigError::Invalid("expected_ids must name at least one servo".to_string()));
        }
        let mut ids = self.expected_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != servo_count {
            return Err(ConfigError::Invalid("expected_ids must be unique".to_string()));
        }
        if !(self.command_rate > 0.0 && self.command_rate.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "command_rate must be > 0, got {}",
                self.command_rate
            )));
        }
        if !(self.reset_duration >= 0.0 && self.reset_duration.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "reset_duration must be a non-negative number of seconds, got {}",
                self.reset_duration
            )));
        }

        let limits = self.limits()?;
        if limits.servo_count() != servo_count {
            return Err(ConfigError::Invalid(format!(
                "axis_limits has {} entries for {} servos",
                limits.servo_count(),
                servo_count
            )));
        }
        for (name, pose) in [("flat_pose", &self.flat_pose), ("ready_pose", &self.ready_pose)] {
            if let Some(pose) = pose {
                if pose.len() != servo_count {
                    return Err(ConfigError::Invalid(format!(
                        "{} has {} entries for {} servos",
                        name,
                        pose.len(),
                        servo_count
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Run defaults; the CLI may override any of them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(flatten)]
    pub options: RunOptions,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.robot.validate()?;
        self.protocol.validate()?;
        self.run.options.validate()?;
        if let Some(motion) = &self.motion {
            motion.validate(self.robot.servo_count())?;
        }
        Ok(())
    }
}

// Default value functions
fn default_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud() -> u32 { 38400 }
fn default_reply_timeout_ms() -> u64 { 1000 }
fn default_expected_ids() -> Vec<u8> { (0..8).collect() }
fn default_command_rate() -> f64 { 40.0 }
fn default_min_position() -> i32 { 0 }
fn default_max_position() -> i32 { 1023 }
fn default_reset_duration() -> f64 { 3.0 }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path.display(), e);
        ConfigError::Io(e)
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.serial.baud, 38400);
        assert_eq!(config.robot.expected_ids, (0..8).collect::<Vec<u8>>());
        assert_eq!(config.robot.command_rate, 40.0);
        assert_eq!(config.robot.command_period(), Duration::from_millis(25));
        assert_eq!(config.robot.ready_pose().unwrap(), vec![512; 8]);
        assert_eq!(config.run.options.run_seconds, 10.0);
        assert!(config.run.options.reset_first);
        assert_eq!(config.run.options.interp_begin, None);
        assert_eq!(config.run.options.time_scale, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.reply_timeout(), Some(Duration::from_millis(1000)));
        assert_eq!(config.protocol, Protocol::default());
        assert!(config.motion.is_none());
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("robot.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "[robot]\nexpected_ids = [0, 1, 2]\ncommand_rate = 10.0\nready_pose = [100, 200, 300]\n\n[run]\nrun_seconds = 2.5\nreset_first = false\ninterp_end = 1.0\nlog_file = 'run.log'"
        )
        .unwrap();
        file.flush().unwrap();
        let config = load_config(&file_path).unwrap();
        assert_eq!(config.robot.servo_count(), 3);
        assert_eq!(config.robot.ready_pose().unwrap(), vec![100, 200, 300]);
        assert_eq!(config.robot.flat_pose().unwrap(), vec![512, 512, 512]);
        assert_eq!(config.run.options.run_seconds, 2.5);
        assert!(!config.run.options.reset_first);
        assert_eq!(config.run.options.interp_end, Some(1.0));
        assert_eq!(config.run.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent_file.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "not a valid toml").unwrap();
        file.flush().unwrap();
        let result = load_config(&file_path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_pose_length_is_validated() {
        let config: Config = toml::from_str("[robot]\nexpected_ids = [0, 1]\nready_pose = [1, 2, 3]").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_axis_limits_override() {
        let config: Config =
            toml::from_str("[robot]\nexpected_ids = [4, 5]\naxis_limits = [[100, 200], [0, 50]]").unwrap();
        let limits = config.robot.limits().unwrap();
        assert_eq!(limits.min(), &[100, 0]);
        assert_eq!(limits.max(), &[200, 50]);
        assert!(config.validate().is_ok());

        let config: Config = toml::from_str("[robot]\nexpected_ids = [4, 5]\naxis_limits = [[100, 200]]").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_rate_and_ids() {
        let config: Config = toml::from_str("[robot]\ncommand_rate = 0.0").unwrap();
        assert!(config.validate().is_err());
        let config: Config = toml::from_str("[robot]\nexpected_ids = []").unwrap();
        assert!(config.validate().is_err());
        let config: Config = toml::from_str("[robot]\nexpected_ids = [1, 1]").unwrap();
        assert!(config.validate().is_err());
        let config: Config = toml::from_str("[robot]\nreset_duration = inf").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        let config: Config = toml::from_str("[robot]\nreset_duration = -1.0").unwrap();
        assert!(config.validate().is_err());
    }
}
