use crate::{
    dsp::{
        envelope::{Envelope, EnvelopeDef},
        segment::SegmentState,
    },
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, UGenKind},
    ugen::{InputSpec, Inputs, Sample, UGen},
};

/*
Envelope Generator
==================

Plays an Envelope (see dsp/envelope.rs) one segment at a time, driven by a
gate. The gate is "open" while its value is above zero.

  gate ────┐ open                          ┌──── closed
           │                               │
  Idle ──► Segment(0) ─► Segment(1) ─► Sustain ─► Segment(sustain) ─► … ─► Done
           ▲                               │
           └──────── re-trigger ◄──────────┘ (any stage, on a rising edge)

Stages
------

  Idle        Before the first trigger. Outputs levels[0].
  Segment(i)  Ramping from wherever the output is towards levels[i + 1] over
              times[i] · timeScale seconds, using curves[i].
  Sustain     Arrived at levels[sustain_point] with the gate still open.
              Holds that level until the gate closes.
  Done        Past the last level. Holds it until re-triggered.

Transitions
-----------

  rising edge    Segment(0), starting from the current output value.
  falling edge   Segment(sustain_point), starting from the current output
                 value. Ignored with no sustain point, or once the envelope is
                 already at or past that segment.
  segment end    The output snaps to the segment's destination level. If that
                 level is the sustain point and the gate is open the stage
                 becomes Sustain; otherwise the next segment starts.

A re-trigger never jumps back to levels[0]: stage 0 ramps from the current
value, so re-triggering mid-release rises from the partial level without a
click. Segments shorter than one sample are passed through in a single step
(the output lands on their destination level and the next segment starts).

Gate Timing
-----------

An audio-rate gate is inspected on every sample, so an edge takes effect on
the exact sample it happens. A control or constant gate is read once per block
at the first sample. Between edges the stage machine renders whole runs of
samples through the segment generators, so the per-sample cost of the gate is
a single comparison.

The gate defaults to 1.0, so an envGen without a gate triggers on its first
sample and plays through to its sustain level.
*/

const GATE: usize = 0;
const TIME_SCALE: usize = 1;

/// Where the envelope generator is in its envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Segment(usize),
    Sustain,
    Done,
}

pub struct EnvGen {
    envelope: Envelope,
    sample_rate: f64,
    time_scale: f64,
    segment: SegmentState,
    remaining: usize,
    stage: Stage,
    gate_open: bool,
    gate_stride: usize,
}

impl EnvGen {
    pub const NAME: &'static str = "envGen";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[
            InputSpec::signal("gate", 1.0),
            InputSpec::signal("timeScale", 1.0),
        ],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: &[Rate::Audio, Rate::Control],
        output: false,
        construct: Self::construct,
    };

    pub fn new(envelope: Envelope, sample_rate: f64) -> Self {
        let start = envelope.levels[0];
        Self {
            envelope,
            sample_rate,
            time_scale: 1.0,
            segment: SegmentState::holding(start),
            remaining: 0,
            stage: Stage::Idle,
            gate_open: false,
            gate_stride: 0,
        }
    }

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        let def: EnvelopeDef = ctx.option("envelope")?.unwrap_or_default();
        let envelope = def.expand()?;
        Ok(Box::new(Self::new(envelope, ctx.sample_rate())))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn trigger(&mut self) {
        self.enter_level(0);
    }

    fn release(&mut self) {
        let Some(sustain) = self.envelope.sustain_point else {
            return;
        };
        let releasing = match self.stage {
            Stage::Segment(index) => index < sustain,
            Stage::Sustain => true,
            Stage::Idle | Stage::Done => false,
        };
        if releasing {
            self.enter_level(sustain);
        }
    }

    /// The output has arrived at `levels[level]`. Decide what plays next.
    fn enter_level(&mut self, mut level: usize) {
        loop {
            if self.gate_open && self.envelope.sustain_point == Some(level) {
                self.stage = Stage::Sustain;
                self.segment.hold();
                return;
            }
            if level >= self.envelope.num_segments() {
                self.stage = Stage::Done;
                self.segment.hold();
                return;
            }

            let seconds = self.envelope.times[level] * self.time_scale;
            let samples = (seconds.max(0.0) * self.sample_rate).round() as usize;
            let destination = self.envelope.levels[level + 1];

            if samples == 0 {
                self.segment = SegmentState::holding(destination);
                level += 1;
                continue;
            }

            let shape = self.envelope.curves[level].segment_shape();
            self.segment.retarget(shape, destination, samples);
            self.remaining = samples;
            self.stage = Stage::Segment(level);
            return;
        }
    }

    /// Fill `out[start..end]` with no gate change in between.
    fn render(&mut self, start: usize, end: usize, out: &mut [Sample]) {
        let mut pos = start;
        while pos < end {
            match self.stage {
                Stage::Segment(index) => {
                    let count = (end - pos).min(self.remaining);
                    self.segment.gen(count, pos, out);
                    pos += count;
                    self.remaining -= count;
                    if self.remaining == 0 {
                        self.segment = SegmentState::holding(self.segment.destination);
                        self.enter_level(index + 1);
                    }
                }
                Stage::Idle | Stage::Sustain | Stage::Done => {
                    self.segment.gen(end - pos, pos, out);
                    pos = end;
                }
            }
        }
    }

    fn gate_changed(&mut self, open: bool) {
        self.gate_open = open;
        if open {
            self.trigger();
        } else {
            self.release();
        }
    }
}

impl UGen for EnvGen {
    fn on_input_changed(&mut self, inputs: &Inputs<'_>, _name: Option<&str>) {
        self.gate_stride = inputs.stride(GATE);
    }

    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        self.time_scale = inputs
            .signal(TIME_SCALE)
            .map_or(1.0, |scale| scale.first() as f64);

        let Some(gate) = inputs.signal(GATE) else {
            self.render(0, n, out);
            return;
        };

        let mut i = 0;
        while i < n {
            let open = gate.buffer[i * self.gate_stride] > 0.0;
            if open != self.gate_open {
                self.gate_changed(open);
            }

            let mut end = n;
            if self.gate_stride == 1 {
                end = i + 1;
                while end < n && (gate.buffer[end] > 0.0) == open {
                    end += 1;
                }
            }

            self.render(i, end, out);
            i = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{config::EngineConfig, def::UGenDef, graph::Graph};

    // 8 samples per second, 4 per block: every half second is one block.
    fn config() -> EngineConfig {
        EngineConfig::new(8.0, 4, 1)
    }

    fn env_def(envelope: serde_json::Value) -> UGenDef {
        UGenDef::new("envGen").id("env").option("envelope", envelope)
    }

    fn breakpoints(levels: &[f64], times: &[f64], sustain: Option<usize>) -> serde_json::Value {
        json!({ "levels": levels, "times": times, "sustainPoint": sustain })
    }

    fn assert_block(graph: &mut Graph, expected: &[f32]) {
        let out = graph.generate(expected.len());
        for (i, (a, e)) in out.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < 1e-6, "sample {i}: {a} != {e} in {out:?}");
        }
    }

    #[test]
    fn plays_to_sustain_then_releases_on_gate_close() {
        let def = env_def(breakpoints(&[0.0, 1.0, 0.5, 0.0], &[0.5, 0.5, 0.5], Some(2)));
        let mut graph = Graph::build(&def, config()).unwrap();

        assert_block(&mut graph, &[0.25, 0.5, 0.75, 1.0]);
        assert_block(&mut graph, &[0.875, 0.75, 0.625, 0.5]);
        assert_block(&mut graph, &[0.5; 4]);
        assert_block(&mut graph, &[0.5; 4]);

        graph.set("env.gate", 0.0).unwrap();
        assert_block(&mut graph, &[0.375, 0.25, 0.125, 0.0]);
        assert_block(&mut graph, &[0.0; 4]);
    }

    #[test]
    fn release_during_attack_ramps_down_from_the_partial_level() {
        let def = env_def(breakpoints(&[0.0, 1.0, 0.5, 0.0], &[1.0, 1.0, 0.5], Some(2)));
        let mut graph = Graph::build(&def, config()).unwrap();

        assert_block(&mut graph, &[0.125, 0.25, 0.375, 0.5]);
        graph.set("env.gate", 0.0).unwrap();
        assert_block(&mut graph, &[0.375, 0.25, 0.125, 0.0]);
    }

    #[test]
    fn without_sustain_point_gate_close_is_ignored() {
        let def = env_def(breakpoints(&[0.0, 1.0, 0.0], &[1.0, 1.0], None));
        let mut graph = Graph::build(&def, config()).unwrap();

        assert_block(&mut graph, &[0.125, 0.25, 0.375, 0.5]);
        graph.set("env.gate", 0.0).unwrap();
        assert_block(&mut graph, &[0.625, 0.75, 0.875, 1.0]);
        assert_block(&mut graph, &[0.875, 0.75, 0.625, 0.5]);
    }

    // Known edge case: a re-trigger restarts stage 0 from the current output
    // value rather than from the first level.
    #[test]
    fn retrigger_restarts_from_the_current_value() {
        let def = env_def(breakpoints(&[0.0, 1.0, 0.0], &[1.0, 1.0], None));
        let mut graph = Graph::build(&def, config()).unwrap();

        graph.generate(4);
        graph.set("env.gate", 0.0).unwrap();
        graph.generate(4);
        assert_block(&mut graph, &[0.875, 0.75, 0.625, 0.5]);

        graph.set("env.gate", 1.0).unwrap();
        assert_block(&mut graph, &[0.5625, 0.625, 0.6875, 0.75]);
    }

    #[test]
    fn zero_length_segments_are_skipped() {
        let def = env_def(breakpoints(&[0.0, 1.0, 0.25], &[0.0, 0.5], None));
        let mut graph = Graph::build(&def, config()).unwrap();
        assert_block(&mut graph, &[0.8125, 0.625, 0.4375, 0.25]);
        assert_block(&mut graph, &[0.25; 4]);
    }

    #[test]
    fn audio_rate_gate_is_sample_accurate() {
        let config = EngineConfig::new(8.0, 8, 1);
        let def = UGenDef::new("envGen")
            .option(
                "envelope",
                json!({"type": "asr", "attack": 0.25, "sustain": 1.0, "release": 0.25}),
            )
            .input("gate", UGenDef::new("lfPulse").input("freq", 1.0));
        let mut graph = Graph::build(&def, config).unwrap();

        let out = graph.generate(8).to_vec();
        assert_eq!(out, vec![0.5, 1.0, 1.0, 1.0, 0.5, 0.0, 0.0, 0.0]);
        let out = graph.generate(8).to_vec();
        assert_eq!(out, vec![0.5, 1.0, 1.0, 1.0, 0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn time_scale_stretches_every_segment() {
        let def = env_def(breakpoints(&[0.0, 1.0], &[0.25], None)).input("timeScale", 2.0);
        let mut graph = Graph::build(&def, config()).unwrap();
        assert_block(&mut graph, &[0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn default_envelope_is_an_adsr() {
        let mut graph = Graph::build(&UGenDef::new("envGen"), EngineConfig::default()).unwrap();
        // attack 10 ms, decay 100 ms: well into sustain after half a second.
        for _ in 0..400 {
            graph.generate(64);
        }
        assert!(graph.output().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn invalid_envelopes_fail_construction() {
        let def = env_def(breakpoints(&[0.0, 1.0, 0.0], &[1.0], None));
        assert!(matches!(
            Graph::build(&def, config()).err(),
            Some(GraphError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn stage_machine_follows_the_gate() {
        let envelope = Envelope::adsr(0.5, 0.5, 0.5, 0.5, 1.0, 0.0).unwrap();
        let mut env = EnvGen::new(envelope, 8.0);
        let mut out = [0.0; 4];

        assert_eq!(env.stage(), Stage::Idle);
        env.gate_changed(true);
        assert_eq!(env.stage(), Stage::Segment(0));
        env.render(0, 4, &mut out);
        assert_eq!(env.stage(), Stage::Segment(1));
        env.render(0, 4, &mut out);
        assert_eq!(env.stage(), Stage::Sustain);
        env.gate_changed(false);
        assert_eq!(env.stage(), Stage::Segment(2));
        env.render(0, 4, &mut out);
        assert_eq!(env.stage(), Stage::Done);
    }
}
