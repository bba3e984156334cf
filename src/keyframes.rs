// src/keyframes.rs - Piecewise-linear motion from a keyframe table
use crate::config::ConfigError;
use crate::trajectory::{interpolate, Position};
use serde::{Deserialize, Serialize};

/// A pose the motion passes through at time `t` (seconds).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Keyframe {
    pub t: f64,
    pub pose: Position,
}

/// Motion function defined by keyframes, linearly interpolated between them.
///
/// Before the first keyframe the first pose is held; after the last one the
/// last pose is held. With `looped` set, time wraps over the span from the
/// first keyframe to the last, so the table repeats without a hold at the
/// seam.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KeyframeMotion {
    pub keyframes: Vec<Keyframe>,
    #[serde(default)]
    pub looped: bool,
}

impl KeyframeMotion {
    pub fn new(keyframes: Vec<Keyframe>, looped: bool) -> Self {
        Self { keyframes, looped }
    }

    /// Time of the last keyframe.
    pub fn duration(&self) -> f64 {
        self.keyframes.last().map_or(0.0, |k| k.t)
    }

    /// Length of one loop: last keyframe time minus first.
    pub fn period(&self) -> f64 {
        match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => last.t - first.t,
            _ => 0.0,
        }
    }

    pub fn validate(&self, servo_count: usize) -> Result<(), ConfigError> {
        let Some(first) = self.keyframes.first() else {
            return Err(ConfigError::Invalid("motion needs at least one keyframe".to_string()));
        };
        if !(first.t >= 0.0) {
            return Err(ConfigError::Invalid("keyframe times must start at or after 0".to_string()));
        }
        if self.keyframes.windows(2).any(|pair| !(pair[0].t < pair[1].t)) {
            return Err(ConfigError::Invalid("keyframe times must be strictly increasing".to_string()));
        }
        if let Some(frame) = self.keyframes.iter().find(|k| k.pose.len() != servo_count) {
            return Err(ConfigError::LengthMismatch {
                expected: servo_count,
                got: frame.pose.len(),
            });
        }
        Ok(())
    }

    /// Pose at time `t`.
    pub fn sample(&self, t: f64) -> Position {
        let frames = &self.keyframes;
        let (Some(first), Some(last)) = (frames.first(), frames.last()) else {
            return Position::new();
        };

        let period = self.period();
        let t = if self.looped && period > 0.0 {
            first.t + (t - first.t).rem_euclid(period)
        } else {
            t
        };

        if t <= first.t {
            return first.pose.clone();
        }
        if t >= last.t {
            return last.pose.clone();
        }
        // first.t < t < last.t, so 1 <= next < len
        let next = frames.partition_point(|k| k.t <= t);
        let (a, b) = (&frames[next - 1], &frames[next]);
        interpolate(t, (a.t, b.t), &a.pose, &b.pose)
    }

    /// Borrow as a motion function for `RobotSession::run`.
    pub fn as_motion(&self) -> impl Fn(f64) -> Position + '_ {
        move |t| self.sample(t)
    }
}
