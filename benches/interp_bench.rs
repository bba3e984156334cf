// Benchmark for per-tick work: interpolation, keyframe sampling and wire codec
// Run with: cargo bench

use aracna_rs::{interpolate, Command, Keyframe, KeyframeMotion, Protocol};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn bench_interpolate(c: &mut Criterion) {
    let from = vec![100; 18];
    let to = vec![900; 18];
    c.bench_function("interpolate 18 servos x 1k ticks", |b| {
        b.iter(|| {
            for i in 0..1000 {
                let t = i as f64 / 1000.0;
                black_box(interpolate(t, (0.0, 1.0), black_box(&from), black_box(&to)));
            }
        });
    });
}

fn bench_keyframes(c: &mut Criterion) {
    let keyframes = (0..64)
        .map(|i| Keyframe {
            t: i as f64 * 0.25,
            pose: vec![(i * 13 % 1024) as i32; 8],
        })
        .collect();
    let motion = KeyframeMotion::new(keyframes, true);
    c.bench_function("sample 64-keyframe gait x 1k ticks", |b| {
        b.iter(|| {
            for i in 0..1000 {
                black_box(motion.sample(i as f64 * 0.025));
            }
        });
    });
}

fn bench_codec(c: &mut Criterion) {
    let protocol = Protocol::default();
    let goal = vec![512; 8];
    let reply = protocol.encode(Command::Position, Some(&goal));
    c.bench_function("encode POSITION", |b| {
        b.iter(|| black_box(protocol.encode(Command::Position, Some(black_box(&goal)))));
    });
    c.bench_function("decode POSITION reply", |b| {
        b.iter(|| {
            let echoed = protocol.decode(Command::Position, black_box(&reply), 8).unwrap();
            assert_eq!(echoed.len(), 8);
        });
    });
}

criterion_group!(benches, bench_interpolate, bench_keyframes, bench_codec);
criterion_main!(benches);
