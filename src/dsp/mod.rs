//! Low-level DSP primitives used by the unit generators.
//!
//! These components are allocation-free once constructed, making them safe to
//! drive from inside the audio callback. They stay focused on the signal math
//! so the unit generators can layer rates, inputs and gating on top.

/// Breakpoint envelopes and their declarative shorthands.
pub mod envelope;
/// Resumable ramps between two values (linear, exponential, curves).
pub mod segment;

pub use envelope::{Curve, Envelope, EnvelopeDef};
pub use segment::{CurveShape, SegmentShape, SegmentState};
