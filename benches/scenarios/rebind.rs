//! Benchmarks for the control path: setting values and rebinding inputs.

use std::hint::black_box;

use criterion::Criterion;
use saavy_ugen::{EngineConfig, Graph, UGenDef};

fn voice() -> Graph {
    let def = UGenDef::new("sinOsc")
        .id("lead")
        .input("freq", UGenDef::new("value").id("pitch").input("value", 220.0))
        .input("mul", UGenDef::new("envGen").id("amp"));
    Graph::build(&def, EngineConfig::new(48_000.0, 128, 1)).unwrap()
}

pub fn bench_rebind(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/rebind");

    // In-place update of a value node, no reordering
    let mut graph = voice();
    group.bench_function("set_value", |b| {
        b.iter(|| graph.set_value(black_box("pitch"), black_box(330.0)).unwrap())
    });

    // New subtree, release of the old one and a fresh schedule
    let mut graph = voice();
    let glide = UGenDef::new("line").input("start", 220.0).input("end", 440.0);
    group.bench_function("rebind_subtree", |b| {
        b.iter(|| graph.set(black_box("lead.freq"), glide.clone()).unwrap())
    });

    let graph = voice();
    group.bench_function("get", |b| b.iter(|| graph.get(black_box("lead.freq")).unwrap()));

    group.finish();
}
