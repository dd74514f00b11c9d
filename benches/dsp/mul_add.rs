//! Benchmarks for the scale/offset routines applied after generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_ugen::ugen::MulAdd;

use crate::BLOCK_SIZES;

pub fn bench_mul_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mul_add");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.5f32; size];
        let audio = vec![0.25f32; size];
        let control = [0.25f32];

        let cases: [(&str, MulAdd, Option<&[f32]>, Option<&[f32]>); 4] = [
            ("mul_control", MulAdd::MulControl, Some(&control[..]), None),
            ("mul_audio", MulAdd::MulAudio, Some(&audio[..]), None),
            (
                "mul_control_add_control",
                MulAdd::MulControlAddControl,
                Some(&control[..]),
                Some(&control[..]),
            ),
            (
                "mul_audio_add_audio",
                MulAdd::MulAudioAddAudio,
                Some(&audio[..]),
                Some(&audio[..]),
            ),
        ];

        for (name, routine, mul, add) in cases {
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| routine.apply(black_box(&mut buffer), mul, add))
            });
        }
    }

    group.finish();
}
