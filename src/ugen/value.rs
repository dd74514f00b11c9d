use crate::{
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, UGenKind},
    ugen::{InputSpec, Inputs, Sample, UGen},
};

/// Emits one scalar. Literals in a definition become constant-rate value
/// nodes, so this is the most common node in any graph.
pub struct Value {
    value: f64,
}

impl Value {
    pub const NAME: &'static str = "value";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[InputSpec::param("value", 0.0)],
        mul_add: false,
        default_rate: Rate::Constant,
        rates: &[Rate::Audio, Rate::Control, Rate::Constant],
        output: false,
        construct: Self::construct,
    };

    pub fn new(value: f64) -> Self {
        Self { value }
    }

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Self::new(ctx.param("value"))))
    }
}

impl UGen for Value {
    fn generate(&mut self, n: usize, out: &mut [Sample], _inputs: &Inputs<'_>) {
        out[..n].fill(self.value as Sample);
    }

    fn param(&self, name: &str) -> Option<f64> {
        (name == "value").then_some(self.value)
    }

    fn set_param(&mut self, name: &str, value: f64) -> bool {
        if name != "value" {
            return false;
        }
        self.value = value;
        true
    }
}
