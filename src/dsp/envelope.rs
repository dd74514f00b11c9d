use serde::{Deserialize, Serialize};

use crate::{
    dsp::segment::{CurveShape, SegmentShape},
    error::GraphError,
};

/*
Breakpoint Envelopes
====================

An envelope is a list of levels joined by timed segments:

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
         L0  L1   L2  (hold)   L3
           t0   t1           t2

  levels   [L0, L1, L2, L3]      L values, at least two
  times    [t0, t1, t2]          L - 1 durations in seconds, never negative
  curves   [c0, c1, c2]          L - 1 segment shapes
  sustain  2                     optional index into levels

When playback reaches the sustain level it holds there for as long as the gate
stays open. Closing the gate jumps to the segment that leaves the sustain
level, starting from whatever value the envelope has at that moment, so a
release during the attack ramps down from the partial level without a click.

Shorthands
----------

Most patches don't spell out breakpoints. The shorthands expand like this:

  adsr    [start, peak, sustain, start]     times [a, d, r]      sustain 2
  dadsr   [start, start, peak, sustain, start]  [delay, a, d, r]  sustain 3
  asr     [start, sustain, start]           times [a, r]         sustain 1
  tri     [0, level, 0]                     times [d/2, d/2]     no sustain
  sin     as tri, sine-shaped segments
  linear  [start, end]                      times [duration]     no sustain

A single curve (name or curvature number) applies to every segment; a list
gives one curve per segment.
*/

/// Shape of one envelope segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Shape(CurveShape),
    /// Numeric curvature, generated with the `curve` segment shape.
    Curvature(f64),
}

impl Curve {
    pub fn segment_shape(self) -> SegmentShape {
        match self {
            Curve::Shape(shape) => shape.into(),
            Curve::Curvature(c) => SegmentShape::Curve(c),
        }
    }
}

impl Default for Curve {
    fn default() -> Self {
        Curve::Shape(CurveShape::Linear)
    }
}

/// Expanded, validated envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub levels: Vec<f64>,
    pub times: Vec<f64>,
    pub curves: Vec<Curve>,
    pub sustain_point: Option<usize>,
}

impl Envelope {
    pub fn new(
        levels: Vec<f64>,
        times: Vec<f64>,
        curves: Vec<Curve>,
        sustain_point: Option<usize>,
    ) -> Result<Self, GraphError> {
        let envelope = Self {
            levels,
            times,
            curves,
            sustain_point,
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Build with one curve shared by every segment.
    pub fn with_curve(
        levels: Vec<f64>,
        times: Vec<f64>,
        curve: Curve,
        sustain_point: Option<usize>,
    ) -> Result<Self, GraphError> {
        let curves = vec![curve; levels.len().saturating_sub(1)];
        Self::new(levels, times, curves, sustain_point)
    }

    pub fn adsr(
        attack: f64,
        decay: f64,
        sustain: f64,
        release: f64,
        peak: f64,
        start: f64,
    ) -> Result<Self, GraphError> {
        Self::with_curve(
            vec![start, peak, sustain, start],
            vec![attack, decay, release],
            Curve::default(),
            Some(2),
        )
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let invalid = |reason: String| Err(GraphError::InvalidEnvelope(reason));

        if self.levels.len() < 2 {
            return invalid(format!(
                "needs at least two levels, got {}",
                self.levels.len()
            ));
        }
        let segments = self.levels.len() - 1;
        if self.times.len() != segments {
            return invalid(format!(
                "{} levels need {segments} times, got {}",
                self.levels.len(),
                self.times.len()
            ));
        }
        if self.curves.len() != segments {
            return invalid(format!(
                "{} levels need {segments} curves, got {}",
                self.levels.len(),
                self.curves.len()
            ));
        }
        if let Some(point) = self.sustain_point {
            if point >= self.levels.len() {
                return invalid(format!(
                    "sustain point {point} is past the last level ({})",
                    self.levels.len() - 1
                ));
            }
        }
        if let Some(level) = self.levels.iter().find(|l| !l.is_finite()) {
            return invalid(format!("level {level} is not a finite number"));
        }
        if let Some(time) = self.times.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return invalid(format!("time {time} must be finite and non-negative"));
        }
        if let Some(Curve::Curvature(c)) = self
            .curves
            .iter()
            .find(|c| matches!(c, Curve::Curvature(v) if !v.is_finite()))
        {
            return invalid(format!("curvature {c} is not a finite number"));
        }
        Ok(())
    }

    /// Number of timed segments.
    pub fn num_segments(&self) -> usize {
        self.times.len()
    }
}

/// A curve as written in a definition: a shape name or a curvature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveValue {
    Curvature(f64),
    Name(String),
}

impl CurveValue {
    fn resolve(&self) -> Result<Curve, GraphError> {
        match self {
            CurveValue::Curvature(c) => Ok(Curve::Curvature(*c)),
            CurveValue::Name(name) => name.parse().map(Curve::Shape),
        }
    }
}

/// One curve for all segments, or one per segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveDef {
    One(CurveValue),
    PerSegment(Vec<CurveValue>),
}

impl CurveDef {
    fn named(name: &str) -> Self {
        CurveDef::One(CurveValue::Name(name.to_string()))
    }

    fn resolve(&self, segments: usize) -> Result<Vec<Curve>, GraphError> {
        match self {
            CurveDef::One(value) => Ok(vec![value.resolve()?; segments]),
            CurveDef::PerSegment(values) => values.iter().map(CurveValue::resolve).collect(),
        }
    }
}

fn resolve_curves(curve: &Option<CurveDef>, segments: usize) -> Result<Vec<Curve>, GraphError> {
    match curve {
        Some(def) => def.resolve(segments),
        None => Ok(vec![Curve::default(); segments]),
    }
}

fn default_attack() -> f64 {
    0.01
}
fn default_decay() -> f64 {
    0.1
}
fn default_sustain() -> f64 {
    0.5
}
fn default_release() -> f64 {
    1.0
}
fn default_level() -> f64 {
    1.0
}
fn default_duration() -> f64 {
    1.0
}

/// Named envelope shorthands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EnvelopeShorthand {
    Adsr {
        #[serde(default = "default_attack")]
        attack: f64,
        #[serde(default = "default_decay")]
        decay: f64,
        #[serde(default = "default_sustain")]
        sustain: f64,
        #[serde(default = "default_release")]
        release: f64,
        #[serde(default = "default_level")]
        peak: f64,
        #[serde(default)]
        start: f64,
        #[serde(default)]
        curve: Option<CurveDef>,
    },
    Dadsr {
        #[serde(default)]
        delay: f64,
        #[serde(default = "default_attack")]
        attack: f64,
        #[serde(default = "default_decay")]
        decay: f64,
        #[serde(default = "default_sustain")]
        sustain: f64,
        #[serde(default = "default_release")]
        release: f64,
        #[serde(default = "default_level")]
        peak: f64,
        #[serde(default)]
        start: f64,
        #[serde(default)]
        curve: Option<CurveDef>,
    },
    Asr {
        #[serde(default = "default_attack")]
        attack: f64,
        #[serde(default = "default_level")]
        sustain: f64,
        #[serde(default = "default_release")]
        release: f64,
        #[serde(default)]
        start: f64,
        #[serde(default)]
        curve: Option<CurveDef>,
    },
    Tri {
        #[serde(default = "default_duration")]
        duration: f64,
        #[serde(default = "default_level")]
        level: f64,
    },
    Sin {
        #[serde(default = "default_duration")]
        duration: f64,
        #[serde(default = "default_level")]
        level: f64,
    },
    Linear {
        #[serde(default)]
        start: f64,
        #[serde(default = "default_level")]
        end: f64,
        #[serde(default = "default_duration")]
        duration: f64,
    },
}

/// Raw breakpoints, as written in a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointDef {
    pub levels: Vec<f64>,
    pub times: Vec<f64>,
    #[serde(default)]
    pub curve: Option<CurveDef>,
    #[serde(default)]
    pub sustain_point: Option<usize>,
}

/// Declarative envelope: a shorthand or raw breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeDef {
    Shorthand(EnvelopeShorthand),
    Breakpoints(BreakpointDef),
}

impl Default for EnvelopeDef {
    fn default() -> Self {
        EnvelopeDef::Shorthand(EnvelopeShorthand::Adsr {
            attack: default_attack(),
            decay: default_decay(),
            sustain: default_sustain(),
            release: default_release(),
            peak: default_level(),
            start: 0.0,
            curve: None,
        })
    }
}

impl EnvelopeDef {
    /// Expand into levels/times/curves and validate the result.
    pub fn expand(&self) -> Result<Envelope, GraphError> {
        match self {
            EnvelopeDef::Breakpoints(def) => {
                let segments = def.levels.len().saturating_sub(1);
                Envelope::new(
                    def.levels.clone(),
                    def.times.clone(),
                    resolve_curves(&def.curve, segments)?,
                    def.sustain_point,
                )
            }
            EnvelopeDef::Shorthand(shorthand) => shorthand.expand(),
        }
    }
}

impl EnvelopeShorthand {
    pub fn expand(&self) -> Result<Envelope, GraphError> {
        match self {
            EnvelopeShorthand::Adsr {
                attack,
                decay,
                sustain,
                release,
                peak,
                start,
                curve,
            } => Envelope::new(
                vec![*start, *peak, *sustain, *start],
                vec![*attack, *decay, *release],
                resolve_curves(curve, 3)?,
                Some(2),
            ),
            EnvelopeShorthand::Dadsr {
                delay,
                attack,
                decay,
                sustain,
                release,
                peak,
                start,
                curve,
            } => Envelope::new(
                vec![*start, *start, *peak, *sustain, *start],
                vec![*delay, *attack, *decay, *release],
                resolve_curves(curve, 4)?,
                Some(3),
            ),
            EnvelopeShorthand::Asr {
                attack,
                sustain,
                release,
                start,
                curve,
            } => Envelope::new(
                vec![*start, *sustain, *start],
                vec![*attack, *release],
                resolve_curves(curve, 2)?,
                Some(1),
            ),
            EnvelopeShorthand::Tri { duration, level } => Envelope::new(
                vec![0.0, *level, 0.0],
                vec![duration * 0.5, duration * 0.5],
                resolve_curves(&None, 2)?,
                None,
            ),
            EnvelopeShorthand::Sin { duration, level } => Envelope::new(
                vec![0.0, *level, 0.0],
                vec![duration * 0.5, duration * 0.5],
                resolve_curves(&Some(CurveDef::named("sine")), 2)?,
                None,
            ),
            EnvelopeShorthand::Linear {
                start,
                end,
                duration,
            } => Envelope::new(
                vec![*start, *end],
                vec![*duration],
                resolve_curves(&None, 1)?,
                None,
            ),
        }
    }
}
