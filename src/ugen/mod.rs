//! Unit generators: the nodes a graph is made of.
//!
//! A unit generator owns whatever state its algorithm needs (phase, segment
//! registers, random generator) and fills one output buffer per block. It
//! never owns its inputs. The graph hands it an [`Inputs`] view each block,
//! through which it reads the already-generated buffers of its upstream nodes.

/// Envelope generator driven by a gate signal.
pub mod env_gen;
/// Single-segment ramps (`line`, `xLine`).
pub mod line;
/// Scale/offset post-processing applied after every node.
pub mod mul_add;
/// Graph-owned node wrapper and the input view.
pub mod node;
/// White noise source.
pub mod noise;
/// Phase-accumulating oscillators.
pub mod osc;
/// Output nodes (mono and multi-channel).
pub mod out;
/// Mixes a sequence of inputs.
pub mod sum;
/// Scalar constant node.
pub mod value;

pub use mul_add::MulAdd;
pub use node::{Binding, Inputs, Node, Signal};

pub type Sample = f32;

/// How a named input is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// One upstream node; literals become implicit value nodes.
    Signal,
    /// An ordered list of upstream nodes.
    Sequence,
    /// A plain number stored on the node itself.
    Param,
}

/// What happens when a definition leaves an input out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputDefault {
    Value(f64),
    Optional,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSpec {
    pub name: &'static str,
    pub kind: InputKind,
    pub default: InputDefault,
}

impl InputSpec {
    pub const fn signal(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: InputKind::Signal,
            default: InputDefault::Value(default),
        }
    }

    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            kind: InputKind::Signal,
            default: InputDefault::Required,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            kind: InputKind::Signal,
            default: InputDefault::Optional,
        }
    }

    pub const fn sequence(name: &'static str) -> Self {
        Self {
            name,
            kind: InputKind::Sequence,
            default: InputDefault::Required,
        }
    }

    pub const fn param(name: &'static str, default: f64) -> Self {
        Self {
            name,
            kind: InputKind::Param,
            default: InputDefault::Value(default),
        }
    }
}

/// Appended to every kind that supports scale/offset.
pub const MUL_ADD_INPUTS: [InputSpec; 2] = [InputSpec::optional("mul"), InputSpec::optional("add")];

/// The contract every unit generator implements.
///
/// Nodes are generated once per block in dependency order, so every input
/// buffer is already up to date when `generate` runs.
pub trait UGen: Send {
    /// Compute `n` values into `out[..n]`.
    ///
    /// `n` is the block length for audio-rate nodes and 1 otherwise. Must not
    /// allocate, block, or fail; state in `self` must stay consistent no matter
    /// how the stream is chunked.
    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>);

    /// Re-derive anything cached per input (strides, latched values).
    ///
    /// Called once after construction with `None`, and again with the input's
    /// name whenever that input is rebound.
    fn on_input_changed(&mut self, _inputs: &Inputs<'_>, _name: Option<&str>) {}

    /// Read a literal-only input.
    fn param(&self, _name: &str) -> Option<f64> {
        None
    }

    /// Write a literal-only input. Returns false if there is no such param.
    fn set_param(&mut self, _name: &str, _value: f64) -> bool {
        false
    }

    /// Output buffer length given the length the node's rate asks for.
    fn buffer_len(&self, rate_len: usize) -> usize {
        rate_len
    }
}

