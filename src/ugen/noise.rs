use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, UGenKind},
    ugen::{Inputs, Sample, UGen},
};

/// Uniform white noise in [-1, 1).
///
/// The generator is seeded once at construction; pass a `seed` option for a
/// repeatable stream.
pub struct WhiteNoise {
    rng: StdRng,
}

impl WhiteNoise {
    pub const NAME: &'static str = "whiteNoise";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: &[Rate::Audio, Rate::Control],
        output: false,
        construct: Self::construct,
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        let rng = match ctx.option::<u64>("seed")? {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Box::new(Self { rng }))
    }
}

impl UGen for WhiteNoise {
    fn generate(&mut self, n: usize, out: &mut [Sample], _inputs: &Inputs<'_>) {
        for sample in out[..n].iter_mut() {
            *sample = self.rng.gen_range(-1.0..1.0);
        }
    }
}
