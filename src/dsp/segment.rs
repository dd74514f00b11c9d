use std::{
    f64::consts::{FRAC_PI_2, PI},
    fmt,
    str::FromStr,
};

use crate::{error::GraphError, ugen::Sample};

/*
Segment Generators
==================

A segment is one ramp from the current value to a destination over a fixed
number of samples. Lines, envelopes and parameter glides are all built from
segments, so every shape here shares one contract:

  init   precompute coefficients from (current_value, destination, samples)
  gen    write n samples into a buffer, advancing the recurrence

Each shape is a recurrence: the next value comes from the previous one (or from
one or two hidden registers) with a constant amount of work. No shape ever
recomputes from the sample index, which is what makes generation resumable:
calling gen(40) then gen(60) produces exactly the same samples as gen(100),
because all the state lives in the registers and nothing else.

Stepping Convention
-------------------

gen advances first and writes second. Sample k of the segment (1-based) holds
the value the curve reaches after k steps, so the final sample of a segment is
the destination itself and current_value always equals the last value written.

    current ──● step ● step ● step ●── destination
              (not      s1     s2    s3 = last sample
              written)

The Shapes
----------

  constant      value stays put (holds, sustains)
  linear        value += step                       step = (dest - start) / N
  exponential   value *= ratio                      ratio = (dest / start)^(1/N)
  curve         value = a2 - b1; b1 *= e^(c/N)      a1 = (dest - start) / (1 - e^c)
  sine          resonator: y0 = 2cos(w)·y1 - y2     w = π / N, half a cosine
  welsh         resonator over a quarter period     w = (π/2) / N
  squared       linear in sqrt space, squared back
  cubed         linear in cbrt space, cubed back

The sine and welsh shapes use the "digital resonator" trick: a cosine can be
generated without calling cos() per sample, since

    cos((k+1)w) = 2cos(w)·cos(kw) - cos((k-1)w)

so two registers (y1 = this sample, y2 = previous) plus one multiply-subtract
walk along the curve.

Numeric Guards
--------------

Segments are generated inside the audio callback, so nothing here may fail:

  - a segment of zero samples is treated as one sample long
  - exponential ramps cannot start or end at exactly zero (the ratio would be
    0 or infinite), so 1e-16 is substituted, keeping the sign of the other end
  - exponential ramps across zero (opposite signs) have no real ratio and fall
    back to linear
  - a curve with |curvature| < 0.001 is numerically a straight line and uses
    the linear recurrence (1 - e^c blows up as c approaches 0)
  - squared ramps take a signed square root so negative values stay finite
*/

/// Stand-in for zero when a geometric ratio needs a nonzero endpoint.
pub const EPSILON: f64 = 1e-16;

/// Curvatures smaller than this are generated as straight lines.
const CURVE_LINEAR_THRESHOLD: f64 = 0.001;

/// Shapes that can be looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveShape {
    Constant,
    Linear,
    Exponential,
    Sine,
    Welsh,
    Squared,
    Cubed,
}

impl CurveShape {
    pub fn as_str(self) -> &'static str {
        match self {
            CurveShape::Constant => "constant",
            CurveShape::Linear => "linear",
            CurveShape::Exponential => "exponential",
            CurveShape::Sine => "sine",
            CurveShape::Welsh => "welsh",
            CurveShape::Squared => "squared",
            CurveShape::Cubed => "cubed",
        }
    }
}

impl FromStr for CurveShape {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" | "step" | "hold" => Ok(CurveShape::Constant),
            "linear" | "lin" => Ok(CurveShape::Linear),
            "exponential" | "exp" => Ok(CurveShape::Exponential),
            "sine" | "sin" => Ok(CurveShape::Sine),
            "welsh" | "wel" => Ok(CurveShape::Welsh),
            "squared" | "sqr" => Ok(CurveShape::Squared),
            "cubed" | "cub" => Ok(CurveShape::Cubed),
            other => Err(GraphError::UnknownCurve(other.to_string())),
        }
    }
}

impl fmt::Display for CurveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The interpolation used for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentShape {
    Constant,
    Linear,
    Exponential,
    Sine,
    Welsh,
    Squared,
    Cubed,
    /// Exponential-decay curve with the given curvature. Positive values
    /// start slow and finish fast, negative values the reverse.
    Curve(f64),
}

impl From<CurveShape> for SegmentShape {
    fn from(shape: CurveShape) -> Self {
        match shape {
            CurveShape::Constant => SegmentShape::Constant,
            CurveShape::Linear => SegmentShape::Linear,
            CurveShape::Exponential => SegmentShape::Exponential,
            CurveShape::Sine => SegmentShape::Sine,
            CurveShape::Welsh => SegmentShape::Welsh,
            CurveShape::Squared => SegmentShape::Squared,
            CurveShape::Cubed => SegmentShape::Cubed,
        }
    }
}

/// Per-segment model: where we are, where we're going, and the recurrence
/// registers needed to get there.
#[derive(Debug, Clone)]
pub struct SegmentState {
    pub current_value: f64,
    pub destination: f64,
    pub num_segment_samples: usize,

    // Shape actually being generated (after any degradation in init)
    shape: SegmentShape,
    step: f64,
    a2: f64,
    b1: f64,
    y1: f64,
    y2: f64,
}

impl Default for SegmentState {
    fn default() -> Self {
        Self::holding(0.0)
    }
}

impl SegmentState {
    /// Start a segment of `shape` from `current` to `destination`.
    pub fn new(shape: SegmentShape, current: f64, destination: f64, samples: usize) -> Self {
        let mut state = Self {
            current_value: current,
            destination,
            num_segment_samples: samples,
            shape: SegmentShape::Constant,
            step: 0.0,
            a2: 0.0,
            b1: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        state.init(shape);
        state
    }

    /// A segment that holds `value` indefinitely.
    pub fn holding(value: f64) -> Self {
        Self::new(SegmentShape::Constant, value, value, 0)
    }

    /// Re-target the segment from wherever it currently is.
    pub fn retarget(&mut self, shape: SegmentShape, destination: f64, samples: usize) {
        self.destination = destination;
        self.num_segment_samples = samples;
        self.init(shape);
    }

    /// Stop moving and hold the current value.
    pub fn hold(&mut self) {
        self.destination = self.current_value;
        self.init(SegmentShape::Constant);
    }

    /// The shape `gen` will use. May differ from the requested shape when a
    /// numeric guard degraded it to linear.
    pub fn shape(&self) -> SegmentShape {
        self.shape
    }

    /// Precompute shape coefficients from current value, destination and
    /// segment length.
    pub fn init(&mut self, shape: SegmentShape) {
        let n = self.num_segment_samples.max(1) as f64;
        self.shape = shape;

        match shape {
            SegmentShape::Constant => {
                self.step = 0.0;
            }
            SegmentShape::Linear => self.init_linear(n),
            SegmentShape::Exponential => {
                let start = nonzero(self.current_value, self.destination);
                let end = nonzero(self.destination, start);
                if start.is_sign_negative() != end.is_sign_negative() {
                    log::warn!("exponential segment from {start} to {end} crosses zero, using linear");
                    self.init_linear(n);
                } else {
                    self.current_value = start;
                    self.step = (end / start).powf(1.0 / n);
                }
            }
            SegmentShape::Curve(curvature) => {
                if curvature.abs() < CURVE_LINEAR_THRESHOLD {
                    self.init_linear(n);
                } else {
                    let a1 = (self.destination - self.current_value) / (1.0 - curvature.exp());
                    self.a2 = self.current_value + a1;
                    self.b1 = a1;
                    self.step = (curvature / n).exp();
                }
            }
            SegmentShape::Sine => {
                let w = PI / n;
                self.a2 = (self.destination + self.current_value) * 0.5;
                self.b1 = 2.0 * w.cos();
                self.y1 = (self.destination - self.current_value) * 0.5;
                self.y2 = self.y1 * (FRAC_PI_2 - w).sin();
            }
            SegmentShape::Welsh => {
                let w = FRAC_PI_2 / n;
                let cos_w = w.cos();
                self.b1 = 2.0 * cos_w;
                if self.destination >= self.current_value {
                    self.a2 = self.current_value;
                    self.y1 = 0.0;
                    self.y2 = -w.sin() * (self.destination - self.current_value);
                } else {
                    self.a2 = self.destination;
                    self.y1 = self.current_value - self.destination;
                    self.y2 = cos_w * (self.current_value - self.destination);
                }
            }
            SegmentShape::Squared => {
                self.y1 = signed_sqrt(self.current_value);
                self.step = (signed_sqrt(self.destination) - self.y1) / n;
            }
            SegmentShape::Cubed => {
                self.y1 = self.current_value.cbrt();
                self.step = (self.destination.cbrt() - self.y1) / n;
            }
        }
    }

    fn init_linear(&mut self, n: f64) {
        self.shape = SegmentShape::Linear;
        self.step = (self.destination - self.current_value) / n;
    }

    /// Write `n` samples into `buffer[start..start + n]`.
    pub fn gen(&mut self, n: usize, start: usize, buffer: &mut [Sample]) {
        let out = &mut buffer[start..start + n];
        if out.is_empty() {
            return;
        }

        let mut value = self.current_value;
        match self.shape {
            SegmentShape::Constant => {
                out.fill(value as Sample);
            }
            SegmentShape::Linear => {
                for sample in out.iter_mut() {
                    value += self.step;
                    *sample = value as Sample;
                }
            }
            SegmentShape::Exponential => {
                for sample in out.iter_mut() {
                    value *= self.step;
                    *sample = value as Sample;
                }
            }
            SegmentShape::Curve(_) => {
                let mut b1 = self.b1;
                for sample in out.iter_mut() {
                    b1 *= self.step;
                    value = self.a2 - b1;
                    *sample = value as Sample;
                }
                self.b1 = b1;
            }
            SegmentShape::Sine => {
                let (mut y1, mut y2) = (self.y1, self.y2);
                for sample in out.iter_mut() {
                    let y0 = self.b1 * y1 - y2;
                    value = self.a2 - y0;
                    y2 = y1;
                    y1 = y0;
                    *sample = value as Sample;
                }
                self.y1 = y1;
                self.y2 = y2;
            }
            SegmentShape::Welsh => {
                let (mut y1, mut y2) = (self.y1, self.y2);
                for sample in out.iter_mut() {
                    let y0 = self.b1 * y1 - y2;
                    value = self.a2 + y0;
                    y2 = y1;
                    y1 = y0;
                    *sample = value as Sample;
                }
                self.y1 = y1;
                self.y2 = y2;
            }
            SegmentShape::Squared => {
                let mut y1 = self.y1;
                for sample in out.iter_mut() {
                    y1 += self.step;
                    value = y1 * y1.abs();
                    *sample = value as Sample;
                }
                self.y1 = y1;
            }
            SegmentShape::Cubed => {
                let mut y1 = self.y1;
                for sample in out.iter_mut() {
                    y1 += self.step;
                    value = y1 * y1 * y1;
                    *sample = value as Sample;
                }
                self.y1 = y1;
            }
        }
        self.current_value = value;
    }
}

/// Replace an exact zero with a tiny value carrying the sign of `other`.
fn nonzero(value: f64, other: f64) -> f64 {
    if value == 0.0 {
        EPSILON.copysign(other)
    } else {
        value
    }
}

fn signed_sqrt(value: f64) -> f64 {
    value.abs().sqrt().copysign(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &[SegmentShape] = &[
        SegmentShape::Linear,
        SegmentShape::Exponential,
        SegmentShape::Sine,
        SegmentShape::Welsh,
        SegmentShape::Squared,
        SegmentShape::Cubed,
        SegmentShape::Curve(-4.0),
        SegmentShape::Curve(3.0),
    ];

    fn render(shape: SegmentShape, from: f64, to: f64, chunks: &[usize]) -> Vec<Sample> {
        let total = chunks.iter().sum();
        let mut buffer = vec![0.0; total];
        let mut state = SegmentState::new(shape, from, to, total);
        let mut offset = 0;
        for &chunk in chunks {
            state.gen(chunk, offset, &mut buffer);
            offset += chunk;
        }
        buffer
    }

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= 1e-6 * expected.abs().max(1.0)
    }

    #[test]
    fn every_shape_lands_on_its_destination() {
        for &shape in SHAPES {
            for &(from, to) in &[(0.1, 1.0), (1.0, 0.25), (0.5, 0.5)] {
                let mut buffer = vec![0.0; 441];
                let mut state = SegmentState::new(shape, from, to, 441);
                state.gen(441, 0, &mut buffer);

                assert!(
                    close(state.current_value, to),
                    "{shape:?} {from}->{to} ended at {}",
                    state.current_value
                );
                assert!(close(buffer[440] as f64, to), "{shape:?} last sample");
            }
        }
    }

    #[test]
    fn chunked_generation_matches_a_single_call() {
        for &shape in SHAPES {
            let whole = render(shape, 0.2, 0.9, &[300]);
            let split = render(shape, 0.2, 0.9, &[1, 63, 64, 100, 72]);
            assert_eq!(whole, split, "{shape:?} is not resumable");
        }
    }

    #[test]
    fn linear_steps_evenly() {
        let buffer = render(SegmentShape::Linear, 0.0, 1.0, &[4]);
        assert_eq!(buffer, vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn constant_holds_the_current_value() {
        let mut state = SegmentState::holding(0.5);
        let mut buffer = vec![0.0; 8];
        state.gen(8, 0, &mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.5));
        assert_eq!(state.current_value, 0.5);
    }

    #[test]
    fn exponential_from_zero_stays_finite() {
        let mut state = SegmentState::new(SegmentShape::Exponential, 0.0, 1.0, 1000);
        let mut buffer = vec![0.0; 1000];
        state.gen(1000, 0, &mut buffer);

        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(close(state.current_value, 1.0));
        // Geometric growth: the second half covers most of the distance.
        assert!(buffer[499] < 0.01);
    }

    #[test]
    fn exponential_across_zero_falls_back_to_linear() {
        let state = SegmentState::new(SegmentShape::Exponential, -1.0, 1.0, 100);
        assert_eq!(state.shape(), SegmentShape::Linear);
        let buffer = render(SegmentShape::Exponential, -1.0, 1.0, &[100]);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn tiny_curvature_is_linear() {
        let state = SegmentState::new(SegmentShape::Curve(0.0005), 0.0, 1.0, 10);
        assert_eq!(state.shape(), SegmentShape::Linear);
        assert_eq!(
            render(SegmentShape::Curve(0.0005), 0.0, 1.0, &[10]),
            render(SegmentShape::Linear, 0.0, 1.0, &[10])
        );
    }

    #[test]
    fn negative_curvature_rises_fast_then_settles() {
        let buffer = render(SegmentShape::Curve(-4.0), 0.0, 1.0, &[100]);
        assert!(buffer[24] > 0.5, "got {}", buffer[24]);
    }

    #[test]
    fn zero_length_segment_jumps_in_one_sample() {
        let mut state = SegmentState::new(SegmentShape::Linear, 0.0, 1.0, 0);
        let mut buffer = vec![0.0; 1];
        state.gen(1, 0, &mut buffer);
        assert_eq!(buffer[0], 1.0);
    }

    #[test]
    fn squared_handles_negative_values() {
        let buffer = render(SegmentShape::Squared, -1.0, 1.0, &[64]);
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!((buffer[63] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sine_is_symmetric_around_the_midpoint() {
        let buffer = render(SegmentShape::Sine, 0.0, 1.0, &[100]);
        assert!((buffer[49] - 0.5).abs() < 1e-4, "midpoint {}", buffer[49]);
    }

    #[test]
    fn writes_at_the_requested_offset() {
        let mut buffer = vec![-1.0; 8];
        let mut state = SegmentState::new(SegmentShape::Linear, 0.0, 1.0, 4);
        state.gen(4, 2, &mut buffer);
        assert_eq!(buffer, vec![-1.0, -1.0, 0.25, 0.5, 0.75, 1.0, -1.0, -1.0]);
    }

    #[test]
    fn unknown_curve_names_are_reported() {
        assert_eq!("exp".parse::<CurveShape>(), Ok(CurveShape::Exponential));
        assert_eq!(
            "wobbly".parse::<CurveShape>(),
            Err(GraphError::UnknownCurve("wobbly".into()))
        );
    }
}
