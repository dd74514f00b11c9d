//! End-to-end checks: JSON definitions through the public API.

use saavy_ugen::{
    registry::{BuildContext, Registry, UGenKind},
    ugen::{InputSpec, Inputs, Sample, UGen},
    EngineConfig, Graph, GraphError, InputValue, Rate, UGenDef,
};

fn build(json: &str, config: EngineConfig) -> Graph {
    Graph::build(&UGenDef::from_json(json).unwrap(), config).unwrap()
}

/// Render `seconds` of mono output.
fn render(graph: &mut Graph, seconds: f64) -> Vec<f32> {
    let config = *graph.config();
    let total = (seconds * config.sample_rate as f64).round() as usize;
    let mut out = Vec::with_capacity(total);
    while out.len() < total {
        let n = (total - out.len()).min(config.block_size);
        out.extend_from_slice(&graph.generate(n)[..n]);
    }
    out
}

#[test]
fn single_value_definition_builds_value_and_output() {
    let mut graph = build(
        r#"{"type": "value", "inputs": {"value": 0.25}}"#,
        EngineConfig::new(44_100.0, 64, 1),
    );
    assert_eq!(graph.node_count(), 2);
    assert!(graph.generate(64).iter().all(|&s| s == 0.25));
}

#[test]
fn adsr_holds_sustain_until_the_gate_closes() {
    let mut graph = build(
        r#"{
            "type": "envGen",
            "id": "env",
            "options": {"envelope": {
                "type": "adsr", "attack": 0.01, "decay": 0.3, "sustain": 0.5, "release": 1.0
            }},
            "inputs": {"gate": {"type": "value", "id": "gate", "inputs": {"value": 1}}}
        }"#,
        EngineConfig::new(44_100.0, 64, 1),
    );

    let attack = render(&mut graph, 0.005);
    assert!(attack.windows(2).all(|w| w[1] >= w[0]), "attack rises");

    let held = render(&mut graph, 0.5);
    let tail = &held[held.len() - 4_410..];
    assert!(tail.iter().all(|&s| s == 0.5), "sustain holds 0.5");

    graph.set("gate", 0.0).unwrap();
    let release = render(&mut graph, 1.1);
    assert!(release[0] < 0.5);
    assert!(release.windows(2).all(|w| w[1] <= w[0]), "release falls");
    assert_eq!(release.last().copied(), Some(0.0));
}

#[test]
fn sine_at_a_quarter_of_the_sample_rate() {
    let mut graph = build(
        r#"{"type": "sinOsc", "inputs": {"freq": 11025, "mul": 0.5}}"#,
        EngineConfig::new(44_100.0, 8, 1),
    );
    let expected = [0.0, 0.5, 0.0, -0.5, 0.0, 0.5, 0.0, -0.5];
    for (actual, expected) in graph.generate(8).iter().zip(expected) {
        assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
    }
}

#[test]
fn stereo_wrapping_duplicates_a_mono_source() {
    let mut graph = build(
        r#"{"type": "lfSaw", "inputs": {"freq": 100}}"#,
        EngineConfig::new(800.0, 8, 2),
    );
    graph.generate(8);
    assert_eq!(graph.output_kind(), "multiOut");
    assert_eq!(graph.channel(0), graph.channel(1));
}

#[test]
fn rebinding_a_named_input_changes_the_sound() {
    let mut graph = build(
        r#"{
            "type": "sum",
            "inputs": {"sources": [
                {"type": "lfPulse", "id": "lead", "inputs": {"freq": 100}},
                {"type": "value", "id": "offset", "inputs": {"value": 0}}
            ]}
        }"#,
        EngineConfig::new(800.0, 8, 1),
    );
    assert_eq!(graph.generate(8), &[1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);

    graph.set("lead.freq", 200.0).unwrap();
    graph.set("offset", 0.5).unwrap();
    assert_eq!(graph.get("lead.freq"), Ok(Some(InputValue::Scalar(200.0))));
    // phase carries over: 0 (wrapped after one cycle) at twice the rate
    assert_eq!(graph.generate(8), &[1.5, 1.5, -0.5, -0.5, 1.5, 1.5, -0.5, -0.5]);

    let glide = UGenDef::from_json(r#"{"type": "line", "id": "glide", "inputs": {"start": 0, "end": 0}}"#).unwrap();
    graph.set("lead.freq", glide).unwrap();
    assert!(matches!(graph.get("lead.freq"), Ok(Some(InputValue::Node(_)))));
    assert!(graph.named("glide").is_some());
}

#[test]
fn errors_leave_the_graph_usable() {
    let mut graph = build(
        r#"{"type": "sinOsc", "id": "osc", "inputs": {"freq": 440}}"#,
        EngineConfig::new(44_100.0, 64, 1),
    );
    let nodes = graph.node_count();

    assert_eq!(
        graph.set("osc.detune", 1.0),
        Err(GraphError::PathNotFound("osc.detune".into()))
    );
    assert_eq!(
        graph.set("osc.freq", UGenDef::new("chorus")),
        Err(GraphError::UnknownType("chorus".into()))
    );
    assert_eq!(graph.node_count(), nodes);
    assert_eq!(graph.generate(64).len(), 64);
}

/// Scales its source by a fixed factor.
struct Gain {
    factor: Sample,
}

impl Gain {
    const KIND: UGenKind = UGenKind {
        name: "gain",
        inputs: &[InputSpec::required("source")],
        mul_add: false,
        default_rate: Rate::Audio,
        rates: &[Rate::Audio],
        output: false,
        construct: Self::construct,
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        let factor: f64 = ctx.option("factor")?.unwrap_or(1.0);
        if factor < 0.0 {
            return Err(ctx.invalid_option("factor", "must not be negative"));
        }
        Ok(Box::new(Self {
            factor: factor as Sample,
        }))
    }
}

impl UGen for Gain {
    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        let Some(source) = inputs.signal(0) else {
            out[..n].fill(0.0);
            return;
        };
        for (i, sample) in out[..n].iter_mut().enumerate() {
            *sample = source.at(i) * self.factor;
        }
    }
}

#[test]
fn custom_kinds_build_through_their_registry() {
    let config = EngineConfig::new(100.0, 4, 1);
    let def = UGenDef::new("gain").id("g").input("source", 0.5).option("factor", 3.0);
    assert_eq!(
        Graph::build(&def, config).err(),
        Some(GraphError::UnknownType("gain".into()))
    );

    let mut registry = Registry::default();
    registry.register(Gain::KIND);
    let mut graph = Graph::build_with(&def, config, registry).unwrap();
    assert!(graph.registry().contains("gain"));
    assert!(graph.registry().contains("sinOsc"));
    assert_eq!(graph.generate(4), &[1.5; 4]);

    graph.set("g.source", 0.25).unwrap();
    assert_eq!(graph.generate(4), &[0.75; 4]);

    let mut registry = Registry::default();
    registry.register(Gain::KIND);
    let negative = UGenDef::new("gain").input("source", 1.0).option("factor", -1.0);
    assert_eq!(
        Graph::build_with(&negative, config, registry).err(),
        Some(GraphError::InvalidOption {
            kind: "gain".into(),
            option: "factor".into(),
            reason: "must not be negative".into(),
        })
    );
}

#[test]
fn malformed_json_is_reported() {
    assert!(matches!(
        UGenDef::from_json(r#"{"type": "sinOsc", "inputs": "#),
        Err(GraphError::Malformed(_))
    ));
}

#[test]
fn graphs_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<Graph>();

    let mut graph = build(
        r#"{"type": "whiteNoise", "options": {"seed": 7}}"#,
        EngineConfig::new(44_100.0, 64, 1),
    );
    let peak = std::thread::spawn(move || {
        render(&mut graph, 0.1)
            .iter()
            .fold(0.0f32, |peak, s| peak.max(s.abs()))
    })
    .join()
    .unwrap();
    assert!(peak > 0.0 && peak <= 1.0);
}
