// src/trajectory.rs - Trajectory sampling and linear interpolation
//
// A motion segment blends between two endpoints. Either endpoint can be a
// fixed servo vector or a function of session time; the runner samples both
// at every tick and interpolates between them.

/// One commanded or observed position per servo, in controller units.
pub type Position = Vec<i32>;

/// One end of an interpolation segment.
pub enum Endpoint<'a> {
    /// A fixed servo vector.
    Constant(Position),
    /// A pure function from session time (seconds) to a servo vector.
    TimeVarying(&'a dyn Fn(f64) -> Position),
}

impl Endpoint<'_> {
    /// Evaluate the endpoint at time `t`.
    pub fn sample(&self, t: f64) -> Position {
        match self {
            Endpoint::Constant(position) => position.clone(),
            Endpoint::TimeVarying(motion) => motion(t),
        }
    }
}

impl std::fmt::Debug for Endpoint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Constant(position) => f.debug_tuple("Constant").field(position).finish(),
            Endpoint::TimeVarying(_) => f.write_str("TimeVarying(..)"),
        }
    }
}

/// Linearly interpolate between `from` and `to` for time `t` within `span`.
///
/// The blend fraction is clamped to `[0, 1]`, each axis is rounded once at
/// the end, and a zero-length span resolves to `to`. Both vectors must have
/// the same length; callers check them against the servo count first.
pub fn interpolate(t: f64, span: (f64, f64), from: &[i32], to: &[i32]) -> Position {
    let (t0, t1) = span;
    let fraction = if t1 <= t0 {
        1.0
    } else {
        ((t - t0) / (t1 - t0)).clamp(0.0, 1.0)
    };

    from.iter()
        .zip(to)
        .map(|(&a, &b)| {
            let a = a as f64;
            let b = b as f64;
            (a + (b - a) * fraction).round() as i32
        })
        .collect()
}

/// Wrap a motion function so that its time argument is divided by `scale`.
///
/// A scale of 2 plays the trajectory at half speed.
pub fn time_scaled<F>(motion: F, scale: f64) -> impl Fn(f64) -> Position
where
    F: Fn(f64) -> Position,
{
    move |t| motion(t / scale)
}
