// src/session.rs - One robot on one controller link
use crate::channel::{ChannelError, CommandChannel, CommandStats};
use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::limits::{CropPolicy, ServoLimits};
use crate::trajectory::Position;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;

/// Everything a session operation can fail with.
#[derive(Debug, Error)]
pub enum RobotError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("tick log write failed: {0}")]
    Log(std::io::Error),
}

impl RobotError {
    /// Configuration errors are programming bugs; retrying cannot help.
    /// Channel and log errors may clear after a re-handshake or retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RobotError::Config(_))
    }
}

/// Owns the controller link, the session clock and the last known servo
/// state. Commands go out strictly one at a time.
pub struct RobotSession<S> {
    pub(crate) channel: CommandChannel<S>,
    pub(crate) clock: Clock,
    expected_ids: Vec<u8>,
    limits: ServoLimits,
    pub(crate) period: Duration,
    pub(crate) crop_policy: CropPolicy,
    pub(crate) flat_pose: Position,
    pub(crate) ready_pose: Position,
    pub(crate) reset_duration: f64,
    pub(crate) current_pos: Option<Position>,
}

impl<S> RobotSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Build a session over an already opened stream.
    pub fn new(stream: S, config: &Config) -> Result<Self, ConfigError> {
        config.robot.validate()?;
        config.protocol.validate()?;

        let robot = &config.robot;
        let channel = CommandChannel::new(stream, config.protocol.clone(), config.serial.reply_timeout());
        Ok(Self {
            channel,
            clock: Clock::new(),
            expected_ids: robot.expected_ids.clone(),
            limits: robot.limits()?,
            period: robot.command_period(),
            crop_policy: robot.crop_policy(),
            flat_pose: robot.flat_pose()?,
            ready_pose: robot.ready_pose()?,
            reset_duration: robot.reset_duration,
            current_pos: None,
        })
    }

    pub fn servo_count(&self) -> usize {
        self.expected_ids.len()
    }

    pub fn expected_ids(&self) -> &[u8] {
        &self.expected_ids
    }

    pub fn limits(&self) -> &ServoLimits {
        &self.limits
    }

    pub fn ready_pose(&self) -> &[i32] {
        &self.ready_pose
    }

    pub fn flat_pose(&self) -> &[i32] {
        &self.flat_pose
    }

    pub fn command_period(&self) -> Duration {
        self.period
    }

    /// Last position reported by the controller, if any.
    pub fn current_position(&self) -> Option<&[i32]> {
        self.current_pos.as_deref()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn stats(&self) -> &CommandStats {
        self.channel.stats()
    }

    pub fn into_inner(self) -> S {
        self.channel.into_inner()
    }

    /// Block until the controller answers the handshake.
    pub async fn hello(&mut self) -> Result<u32, RobotError> {
        Ok(self.channel.hello().await?)
    }

    /// Read and cache current servo positions.
    pub async fn query(&mut self) -> Result<Position, RobotError> {
        let position = self.channel.query(self.servo_count()).await?;
        self.current_pos = Some(position.clone());
        Ok(position)
    }

    /// Validate, crop according to `policy` and send a goal vector.
    ///
    /// Returns the vector actually commanded. The controller's echo becomes
    /// the cached current position.
    pub async fn command_position(&mut self, position: &[i32], policy: CropPolicy) -> Result<Position, RobotError> {
        let goal = self.limits.apply(position, policy)?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            let rendered = goal.iter().map(|p| format!("{:4}", p)).collect::<Vec<_>>().join(", ");
            tracing::debug!("{:.2}s -> {}", self.clock.time(), rendered);
        }
        let echoed = self.channel.position(&goal).await?;
        self.current_pos = Some(echoed);
        Ok(goal)
    }

    /// Move to the ready pose and wait two seconds. With `persist`, keep
    /// re-sending it every 100 ms for those two seconds.
    pub async fn hold_ready(&mut self, persist: bool) -> Result<(), RobotError> {
        let ready = self.ready_pose.clone();
        if persist {
            self.clock.reset();
            while self.clock.time() < 2.0 {
                self.command_position(&ready, self.crop_policy).await?;
                sleep(Duration::from_millis(100)).await;
                self.clock.update();
            }
        } else {
            self.command_position(&ready, self.crop_policy).await?;
            sleep(Duration::from_secs(2)).await;
        }
        Ok(())
    }

    /// Query the controller and render `Positions: id:pos ...`.
    pub async fn status_line(&mut self) -> Result<String, RobotError> {
        let position = self.query().await?;
        let pairs = self
            .expected_ids
            .iter()
            .zip(&position)
            .map(|(id, pos)| format!("{}:{}", id, pos))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(format!("Positions: {}", pairs))
    }
}

impl<S> std::fmt::Debug for RobotSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotSession")
            .field("expected_ids", &self.expected_ids)
            .field("period", &self.period)
            .field("current_pos", &self.current_pos)
            .field("channel", &self.channel)
            .finish()
    }
}
