// src/runner.rs - Phased motion runner driving the command loop
//
// A run is a sequence of blocking interpolation segments: an optional reset
// (current -> flat -> ready), an optional pre-roll blending into the motion
// function, the steady-state segment tracking it, and an optional post-roll
// blending back to ready. Each segment ticks at the session command period.
use crate::config::ConfigError;
use crate::session::{RobotError, RobotSession};
use crate::tick_log::TickSink;
use crate::trajectory::{interpolate, time_scaled, Endpoint, Position};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;

/// Phase parameters for one run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RunOptions {
    /// Steady-state seconds, before time scaling.
    #[serde(default = "default_run_seconds")]
    pub run_seconds: f64,
    /// Move current -> flat -> ready before starting.
    #[serde(default = "default_reset_first")]
    pub reset_first: bool,
    /// Seconds of blending from the last position into the motion.
    #[serde(default)]
    pub interp_begin: Option<f64>,
    /// Seconds of blending from the motion back to the ready pose.
    #[serde(default)]
    pub interp_end: Option<f64>,
    /// Higher is slower; scales every phase and the motion itself.
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_seconds: default_run_seconds(),
            reset_first: default_reset_first(),
            interp_begin: None,
            interp_end: None,
            time_scale: default_time_scale(),
        }
    }
}

fn default_run_seconds() -> f64 { 10.0 }
fn default_reset_first() -> bool { true }
fn default_time_scale() -> f64 { 1.0 }

impl RunOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_scale > 0.0 && self.time_scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "time_scale must be > 0, got {}",
                self.time_scale
            )));
        }
        let durations = [
            ("run_seconds", Some(self.run_seconds)),
            ("interp_begin", self.interp_begin),
            ("interp_end", self.interp_end),
        ];
        for (name, value) in durations {
            if let Some(seconds) = value {
                if !(seconds >= 0.0 && seconds.is_finite()) {
                    return Err(ConfigError::Invalid(format!(
                        "{} must be a non-negative number of seconds, got {}",
                        name, seconds
                    )));
                }
            }
        }
        Ok(())
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// POSITION commands sent across all phases, reset included.
    pub ticks: usize,
    /// Session time when the last phase ended.
    pub elapsed: f64,
}

impl<S> RobotSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Run `motion` through the reset, pre-roll, steady-state and post-roll
    /// phases. `motion` maps session seconds to a servo vector and may be
    /// called any number of times per tick.
    ///
    /// Any channel or configuration error stops the run and is returned as
    /// is; the robot is left at its last commanded position.
    pub async fn run<F>(
        &mut self,
        motion: F,
        options: &RunOptions,
        mut sink: Option<&mut (dyn TickSink + '_)>,
    ) -> Result<RunSummary, RobotError>
    where
        F: Fn(f64) -> Position,
    {
        options.validate()?;
        tracing::info!("Starting motion");

        if let Some(sink) = sink.as_deref_mut() {
            sink.begin(self.servo_count()).await.map_err(RobotError::Log)?;
        }
        let result = self.run_phases(motion, options, sink.as_deref_mut()).await;
        if let Some(sink) = sink {
            let flushed = sink.finish().await.map_err(RobotError::Log);
            if result.is_ok() {
                flushed?;
            }
        }

        let summary = result?;
        tracing::info!(
            "Motion finished: {} ticks in {:.2}s ({:.1} Hz achieved)",
            summary.ticks,
            summary.elapsed,
            if summary.elapsed > 0.0 { summary.ticks as f64 / summary.elapsed } else { 0.0 }
        );
        Ok(summary)
    }

    async fn run_phases<F>(
        &mut self,
        motion: F,
        options: &RunOptions,
        mut sink: Option<&mut (dyn TickSink + '_)>,
    ) -> Result<RunSummary, RobotError>
    where
        F: Fn(f64) -> Position,
    {
        let scale = options.time_scale;
        let mut ticks = 0;

        self.clock.reset();
        let mut last = self.query().await?;

        if options.reset_first {
            tracing::info!("Resetting to flat, then ready");
            let flat = self.flat_pose.clone();
            let ready = self.ready_pose.clone();
            ticks += self
                .interp_move(Endpoint::Constant(last), Endpoint::Constant(flat.clone()), self.reset_duration, None)
                .await?;
            ticks += self
                .interp_move(Endpoint::Constant(flat), Endpoint::Constant(ready.clone()), self.reset_duration, None)
                .await?;
            last = ready;
            self.clock.reset();
        }

        let scaled = time_scaled(&motion, scale);

        if let Some(begin) = options.interp_begin {
            tracing::debug!("Pre-roll over {:.2}s", begin * scale);
            ticks += self
                .interp_move(
                    Endpoint::Constant(last),
                    Endpoint::TimeVarying(&scaled),
                    begin * scale,
                    sink.as_deref_mut(),
                )
                .await?;
        }

        tracing::debug!("Steady state over {:.2}s", options.run_seconds * scale);
        ticks += self
            .interp_move(
                Endpoint::TimeVarying(&scaled),
                Endpoint::TimeVarying(&scaled),
                options.run_seconds * scale,
                sink.as_deref_mut(),
            )
            .await?;

        if let Some(end) = options.interp_end {
            tracing::debug!("Post-roll over {:.2}s", end * scale);
            let ready = self.ready_pose.clone();
            ticks += self
                .interp_move(
                    Endpoint::TimeVarying(&scaled),
                    Endpoint::Constant(ready),
                    end * scale,
                    sink.as_deref_mut(),
                )
                .await?;
        }

        Ok(RunSummary {
            ticks,
            elapsed: self.clock.time(),
        })
    }

    /// Move from `start` to `end` over `seconds` of session time, sending one
    /// POSITION command per tick. Returns the number of ticks.
    ///
    /// A tick that overruns the command period is followed immediately by
    /// the next one; ticks are never skipped. Either endpoint sampling to a
    /// vector that is not servo-count long stops the move before anything
    /// is sent for that tick.
    pub async fn interp_move(
        &mut self,
        start: Endpoint<'_>,
        end: Endpoint<'_>,
        seconds: f64,
        mut sink: Option<&mut (dyn TickSink + '_)>,
    ) -> Result<usize, RobotError> {
        let t_start = self.clock.update();
        let t_end = t_start + seconds;
        let period = self.period.as_secs_f64();
        let mut ticks = 0;

        let mut now = t_start;
        while now < t_end {
            let from = start.sample(now);
            let to = end.sample(now);
            for sampled in [&from, &to] {
                if sampled.len() != self.servo_count() {
                    return Err(ConfigError::LengthMismatch {
                        expected: self.servo_count(),
                        got: sampled.len(),
                    }
                    .into());
                }
            }
            let goal = interpolate(now, (t_start, t_end), &from, &to);
            let commanded = self.command_position(&goal, self.crop_policy).await?;
            if let Some(sink) = sink.as_deref_mut() {
                sink.record(now, &commanded).await.map_err(RobotError::Log)?;
            }
            ticks += 1;

            let spent = self.clock.update() - now;
            let remaining = period - spent;
            if remaining > 0.0 {
                sleep(Duration::from_secs_f64(remaining)).await;
            } else {
                tracing::trace!("Tick overran the command period by {:.4}s", -remaining);
            }
            now = self.clock.update();
        }
        Ok(ticks)
    }
}
