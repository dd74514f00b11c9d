//! Benchmarks for one segment of every shape.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_ugen::dsp::segment::{SegmentShape, SegmentState};

use crate::BLOCK_SIZES;

const SHAPES: &[(&str, SegmentShape)] = &[
    ("linear", SegmentShape::Linear),
    ("exponential", SegmentShape::Exponential),
    ("sine", SegmentShape::Sine),
    ("welsh", SegmentShape::Welsh),
    ("squared", SegmentShape::Squared),
    ("cubed", SegmentShape::Cubed),
    ("curve", SegmentShape::Curve(-4.0)),
];

pub fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/segment");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for &(name, shape) in SHAPES {
            // A fresh segment each block so every iteration covers the
            // whole ramp, 0.001 to 1.0
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                b.iter(|| {
                    let mut segment = SegmentState::new(shape, 0.001, 1.0, size);
                    segment.gen(size, 0, black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
