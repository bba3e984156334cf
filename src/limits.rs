// src/limits.rs - Per-axis position limits and cropping
use crate::config::ConfigError;
use crate::trajectory::Position;

/// How out-of-range goals are handled before they reach the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPolicy {
    /// Send the goal as-is.
    Disabled,
    /// Clamp to the limits without reporting.
    Silent,
    /// Clamp and emit a warning when anything changed.
    Warn,
}

/// Inclusive `[min, max]` bounds for every servo, in controller units.
#[derive(Debug, Clone, PartialEq)]
pub struct ServoLimits {
    min: Vec<i32>,
    max: Vec<i32>,
}

impl ServoLimits {
    /// Same bounds on every axis.
    pub fn uniform(servo_count: usize, min: i32, max: i32) -> Self {
        Self {
            min: vec![min; servo_count],
            max: vec![max; servo_count],
        }
    }

    /// Individual bounds per axis, given as `[min, max]` pairs.
    pub fn per_axis(bounds: &[[i32; 2]]) -> Result<Self, ConfigError> {
        if let Some((axis, [lo, hi])) = bounds.iter().enumerate().find(|(_, [lo, hi])| lo > hi) {
            return Err(ConfigError::Invalid(format!(
                "axis {} has min {} above max {}",
                axis, lo, hi
            )));
        }
        Ok(Self {
            min: bounds.iter().map(|b| b[0]).collect(),
            max: bounds.iter().map(|b| b[1]).collect(),
        })
    }

    pub fn servo_count(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self) -> &[i32] {
        &self.min
    }

    pub fn max(&self) -> &[i32] {
        &self.max
    }

    /// Middle of each axis range.
    pub fn center(&self) -> Position {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| lo + (hi - lo + 1) / 2)
            .collect()
    }

    /// Whether every axis of `position` is already within bounds.
    pub fn contains(&self, position: &[i32]) -> bool {
        position.len() == self.servo_count()
            && position
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(p, (lo, hi))| lo <= p && p <= hi)
    }

    /// Clamp every axis to its bounds and report whether anything changed.
    pub fn crop(&self, position: &[i32]) -> Result<(Position, bool), ConfigError> {
        if position.len() != self.servo_count() {
            return Err(ConfigError::LengthMismatch {
                expected: self.servo_count(),
                got: position.len(),
            });
        }

        let cropped: Position = position
            .iter()
            .zip(self.min.iter().zip(&self.max))
            .map(|(&p, (&lo, &hi))| p.clamp(lo, hi))
            .collect();
        let changed = cropped != position;
        Ok((cropped, changed))
    }

    /// Apply `policy` to `position`.
    pub fn apply(&self, position: &[i32], policy: CropPolicy) -> Result<Position, ConfigError> {
        if position.len() != self.servo_count() {
            return Err(ConfigError::LengthMismatch {
                expected: self.servo_count(),
                got: position.len(),
            });
        }
        match policy {
            CropPolicy::Disabled => Ok(position.to_vec()),
            CropPolicy::Silent => self.crop(position).map(|(cropped, _)| cropped),
            CropPolicy::Warn => {
                let (cropped, changed) = self.crop(position)?;
                if changed {
                    tracing::warn!("Cropped {:?} to {:?}", position, cropped);
                }
                Ok(cropped)
            }
        }
    }
}
