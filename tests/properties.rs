// Property tests for interpolation, cropping and keyframe sampling

use aracna_rs::{interpolate, time_scaled, Keyframe, KeyframeMotion, Position, ServoLimits};
use proptest::prelude::*;

fn pair_of_vectors(len: usize) -> impl Strategy<Value = (Vec<i32>, Vec<i32>)> {
    (
        prop::collection::vec(-5000..5000i32, len),
        prop::collection::vec(-5000..5000i32, len),
    )
}

fn vectors() -> impl Strategy<Value = (Vec<i32>, Vec<i32>)> {
    (1usize..12).prop_flat_map(pair_of_vectors)
}

proptest! {
    /// The blend starts exactly on `from` and ends exactly on `to`
    #[test]
    fn interpolation_hits_endpoints((a, b) in vectors(), t0 in -100.0..100.0f64, span in 0.01..50.0f64) {
        let t1 = t0 + span;
        prop_assert_eq!(interpolate(t0, (t0, t1), &a, &b), a.clone());
        prop_assert_eq!(interpolate(t1, (t0, t1), &a, &b), b.clone());
        // outside the span the fraction is clamped
        prop_assert_eq!(interpolate(t0 - 1.0, (t0, t1), &a, &b), a.clone());
        prop_assert_eq!(interpolate(t1 + 1.0, (t0, t1), &a, &b), b);
    }

    /// A zero-length span jumps straight to the target
    #[test]
    fn degenerate_span_resolves_to_target((a, b) in vectors(), t in -100.0..100.0f64, t0 in -100.0..100.0f64) {
        prop_assert_eq!(interpolate(t, (t0, t0), &a, &b), b);
    }

    /// Every axis of a blend stays between its two endpoints
    #[test]
    fn interpolation_is_bounded((a, b) in vectors(), fraction in 0.0..=1.0f64) {
        let blended = interpolate(fraction, (0.0, 1.0), &a, &b);
        prop_assert_eq!(blended.len(), a.len());
        for ((p, lo), hi) in blended.iter().zip(&a).zip(&b) {
            prop_assert!(*p >= (*lo).min(*hi) && *p <= (*lo).max(*hi));
        }
    }

    /// Cropping twice is the same as cropping once
    #[test]
    fn crop_is_idempotent(position in prop::collection::vec(-3000..3000i32, 8), min in -500..500i32, width in 0..2000i32) {
        let limits = ServoLimits::uniform(8, min, min + width);
        let (once, _) = limits.crop(&position).unwrap();
        let (twice, changed) = limits.crop(&once).unwrap();
        prop_assert_eq!(once.clone(), twice);
        prop_assert!(!changed);
        prop_assert!(limits.contains(&once));
    }

    /// In-range vectors pass through untouched
    #[test]
    fn crop_keeps_in_range_vectors(position in prop::collection::vec(0..=1023i32, 8)) {
        let limits = ServoLimits::uniform(8, 0, 1023);
        let (cropped, changed) = limits.crop(&position).unwrap();
        prop_assert_eq!(cropped, position);
        prop_assert!(!changed);
    }

    /// Scaling by `s` evaluates the motion at `t / s`
    #[test]
    fn time_scaling_divides_time(t in 0.0..100.0f64, scale in 0.1..10.0f64) {
        let motion = |t: f64| vec![(t * 1000.0).round() as i32, (t * -7.0).round() as i32];
        let scaled = time_scaled(motion, scale);
        prop_assert_eq!(scaled(t), motion(t / scale));
    }

    /// Sampling a keyframe table at a keyframe time returns that pose
    #[test]
    fn keyframes_sample_exactly_at_keyframes(
        gaps in prop::collection::vec(0.05..2.0f64, 1..8),
        poses in prop::collection::vec(prop::collection::vec(0..1024i32, 4), 8),
    ) {
        let mut t = 0.0;
        let mut keyframes = Vec::new();
        for (gap, pose) in gaps.iter().zip(&poses) {
            keyframes.push(Keyframe { t, pose: pose.clone() });
            t += gap;
        }
        let motion = KeyframeMotion::new(keyframes.clone(), false);
        prop_assert!(motion.validate(4).is_ok());
        for frame in &keyframes {
            let sampled: Position = motion.sample(frame.t);
            prop_assert_eq!(sampled, frame.pose.clone());
        }
    }
}
