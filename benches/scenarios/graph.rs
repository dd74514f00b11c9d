//! Benchmarks for complete graphs.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_ugen::{EngineConfig, Graph, UGenDef};

use crate::BLOCK_SIZES;

/// Sine through an ADSR, the smallest useful voice.
const VOICE: &str = r#"{
    "type": "sinOsc",
    "inputs": {
        "freq": 220,
        "mul": {"type": "envGen", "options": {"envelope": {
            "type": "adsr", "attack": 0.01, "decay": 0.3, "sustain": 0.5, "release": 1.0
        }}}
    }
}"#;

/// Saw with a control-rate vibrato and a slow amplitude sweep.
const MODULATED: &str = r#"{
    "type": "lfSaw",
    "inputs": {
        "freq": {
            "type": "sinOsc", "rate": "control",
            "inputs": {"freq": 5, "mul": 4, "add": 110}
        },
        "mul": {"type": "line", "inputs": {"start": 1, "end": 0, "duration": 10}}
    }
}"#;

fn chord(voices: usize) -> UGenDef {
    let sources = (0..voices)
        .map(|i| {
            UGenDef::new("lfPulse")
                .input("freq", 110.0 * (i + 1) as f64)
                .input("mul", 1.0 / voices as f64)
        })
        .collect::<Vec<_>>();
    UGenDef::new("multiOut").input("sources", sources)
}

pub fn bench_graphs(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/graphs");

    for &size in BLOCK_SIZES {
        let mono = EngineConfig::new(48_000.0, size, 1);
        let stereo = EngineConfig::new(48_000.0, size, 2);

        // === SIMPLE VOICE ===
        // Baseline for one enveloped oscillator
        let voice = UGenDef::from_json(VOICE).unwrap();
        let mut graph = Graph::build(&voice, mono).unwrap();
        group.bench_with_input(BenchmarkId::new("voice", size), &size, |b, &n| {
            b.iter(|| {
                black_box(graph.generate(black_box(n)));
            })
        });

        // === MODULATED VOICE ===
        // Control-rate modulator feeding an audio-rate frequency input
        let modulated = UGenDef::from_json(MODULATED).unwrap();
        let mut graph = Graph::build(&modulated, mono).unwrap();
        group.bench_with_input(BenchmarkId::new("modulated", size), &size, |b, &n| {
            b.iter(|| {
                black_box(graph.generate(black_box(n)));
            })
        });

        // === STEREO CHORD ===
        // Eight voices routed across two channels
        let mut graph = Graph::build(&chord(8), stereo).unwrap();
        group.bench_with_input(BenchmarkId::new("chord_8", size), &size, |b, &n| {
            b.iter(|| {
                black_box(graph.generate(black_box(n)));
            })
        });
    }

    group.finish();
}
