use crate::{
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, UGenKind},
    ugen::{InputSpec, Inputs, Sample, UGen},
};

const SOURCES: usize = 0;

/// Adds every signal bound to `sources`. Each source is read at its own
/// stride, so audio and control branches mix freely.
pub struct Sum;

impl Sum {
    pub const NAME: &'static str = "sum";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[InputSpec::sequence("sources")],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: &[Rate::Audio, Rate::Control],
        output: false,
        construct: Self::construct,
    };

    fn construct(_ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Sum))
    }
}

impl UGen for Sum {
    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        let out = &mut out[..n];
        out.fill(0.0);
        for source in inputs.sequence(SOURCES) {
            for (i, sample) in out.iter_mut().enumerate() {
                *sample += source.at(i);
            }
        }
    }
}
