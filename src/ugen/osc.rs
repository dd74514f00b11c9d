use std::f64::consts::TAU;

use crate::{
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, UGenKind},
    ugen::{InputSpec, Inputs, Sample, UGen},
};

/*
Phase-Accumulating Oscillators
==============================

Every oscillator here keeps one number of state: its phase, measured in
cycles (0.0 to 1.0 is one full period). Each sample the phase advances by

    increment = freq / sample_rate

and wraps back into [0, 1). The waveform is a pure function of the phase:

  sinOsc    sin(2π · (phase + offset))       offset = phase input, per sample
  lfSaw     2 · phase - 1                    ramps -1 → +1, snaps back
  lfPulse   +1 while phase < width, else -1
  impulse   1.0 on the sample the phase wraps, 0.0 otherwise

`sample_rate` is the clock of the node's own rate. A control-rate oscillator
ticks once per block, so its increment covers a whole block of audio time and
the same frequency input means the same pitch at either rate.

Frequency (and width, and the sinOsc phase offset) may be bound to anything.
The stride of each input is cached when inputs are bound, so the inner loop
reads `buffer[i * stride]` with no branching on rate.

The impulse checks for a wrap before it advances. Starting from phase 0 it
stays silent for the first period and fires at the end of it; starting from
phase 1.0 it fires on the very first sample.
*/

const FREQ: usize = 0;
const PHASE: usize = 1;
const WIDTH: usize = 2;

const FREQ_INPUT: InputSpec = InputSpec::signal("freq", 440.0);
const PHASE_INPUT: InputSpec = InputSpec::signal("phase", 0.0);

const OSC_RATES: &[Rate] = &[Rate::Audio, Rate::Control];

/// Running phase shared by the oscillator family.
#[derive(Debug, Clone, Copy)]
struct Phasor {
    phase: f64,
    sample_rate: f64,
    freq_stride: usize,
}

impl Phasor {
    fn new(sample_rate: f64) -> Self {
        Self {
            phase: 0.0,
            sample_rate,
            freq_stride: 0,
        }
    }

    #[inline]
    fn increment(&self, freq: Sample) -> f64 {
        freq as f64 / self.sample_rate
    }

    #[inline]
    fn advance(&mut self, freq: Sample) {
        self.phase += self.increment(freq);
        self.phase -= self.phase.floor();
    }

    /// Reset to the value bound to the phase input, wrapped into [0, 1).
    fn reset(&mut self, inputs: &Inputs<'_>) {
        let phase = inputs.signal(PHASE).map_or(0.0, |s| s.first() as f64);
        self.phase = phase - phase.floor();
    }
}

/// Sine oscillator with a per-sample phase offset.
pub struct SinOsc {
    phasor: Phasor,
    phase_stride: usize,
}

impl SinOsc {
    pub const NAME: &'static str = "sinOsc";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[FREQ_INPUT, PHASE_INPUT],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: OSC_RATES,
        output: false,
        construct: Self::construct,
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Self {
            phasor: Phasor::new(ctx.sample_rate()),
            phase_stride: 0,
        }))
    }
}

impl UGen for SinOsc {
    fn on_input_changed(&mut self, inputs: &Inputs<'_>, _name: Option<&str>) {
        self.phasor.freq_stride = inputs.stride(FREQ);
        self.phase_stride = inputs.stride(PHASE);
    }

    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        let (Some(freq), Some(offset)) = (inputs.signal(FREQ), inputs.signal(PHASE)) else {
            out[..n].fill(0.0);
            return;
        };

        for (i, sample) in out[..n].iter_mut().enumerate() {
            let shifted = self.phasor.phase + offset.buffer[i * self.phase_stride] as f64;
            *sample = (TAU * shifted).sin() as Sample;
            self.phasor.advance(freq.buffer[i * self.phasor.freq_stride]);
        }
    }
}

/// Non-band-limited sawtooth, -1 to +1.
pub struct LfSaw {
    phasor: Phasor,
}

impl LfSaw {
    pub const NAME: &'static str = "lfSaw";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[FREQ_INPUT, PHASE_INPUT],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: OSC_RATES,
        output: false,
        construct: Self::construct,
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Self {
            phasor: Phasor::new(ctx.sample_rate()),
        }))
    }
}

impl UGen for LfSaw {
    fn on_input_changed(&mut self, inputs: &Inputs<'_>, name: Option<&str>) {
        self.phasor.freq_stride = inputs.stride(FREQ);
        if matches!(name, None | Some("phase")) {
            self.phasor.reset(inputs);
        }
    }

    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        let Some(freq) = inputs.signal(FREQ) else {
            out[..n].fill(0.0);
            return;
        };

        for (i, sample) in out[..n].iter_mut().enumerate() {
            *sample = (2.0 * self.phasor.phase - 1.0) as Sample;
            self.phasor.advance(freq.buffer[i * self.phasor.freq_stride]);
        }
    }
}

/// Non-band-limited pulse, +1 for `width` of each cycle and -1 for the rest.
pub struct LfPulse {
    phasor: Phasor,
    width_stride: usize,
}

impl LfPulse {
    pub const NAME: &'static str = "lfPulse";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[FREQ_INPUT, PHASE_INPUT, InputSpec::signal("width", 0.5)],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: OSC_RATES,
        output: false,
        construct: Self::construct,
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Self {
            phasor: Phasor::new(ctx.sample_rate()),
            width_stride: 0,
        }))
    }
}

impl UGen for LfPulse {
    fn on_input_changed(&mut self, inputs: &Inputs<'_>, name: Option<&str>) {
        self.phasor.freq_stride = inputs.stride(FREQ);
        self.width_stride = inputs.stride(WIDTH);
        if matches!(name, None | Some("phase")) {
            self.phasor.reset(inputs);
        }
    }

    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        let (Some(freq), Some(width)) = (inputs.signal(FREQ), inputs.signal(WIDTH)) else {
            out[..n].fill(0.0);
            return;
        };

        for (i, sample) in out[..n].iter_mut().enumerate() {
            let high = self.phasor.phase < width.buffer[i * self.width_stride] as f64;
            *sample = if high { 1.0 } else { -1.0 };
            self.phasor.advance(freq.buffer[i * self.phasor.freq_stride]);
        }
    }
}

/// Single-sample clicks at `freq` per second.
pub struct Impulse {
    phasor: Phasor,
}

impl Impulse {
    pub const NAME: &'static str = "impulse";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[FREQ_INPUT, PHASE_INPUT],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: OSC_RATES,
        output: false,
        construct: Self::construct,
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Self {
            phasor: Phasor::new(ctx.sample_rate()),
        }))
    }
}

impl UGen for Impulse {
    fn on_input_changed(&mut self, inputs: &Inputs<'_>, name: Option<&str>) {
        self.phasor.freq_stride = inputs.stride(FREQ);
        if matches!(name, None | Some("phase")) {
            // Not wrapped: a phase of exactly 1.0 fires on the first sample.
            self.phasor.phase = inputs.signal(PHASE).map_or(0.0, |s| s.first() as f64);
        }
    }

    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        let Some(freq) = inputs.signal(FREQ) else {
            out[..n].fill(0.0);
            return;
        };

        for (i, sample) in out[..n].iter_mut().enumerate() {
            *sample = if self.phasor.phase >= 1.0 {
                self.phasor.phase -= 1.0;
                1.0
            } else {
                0.0
            };
            self.phasor.phase += self.phasor.increment(freq.buffer[i * self.phasor.freq_stride]);
        }
    }
}
