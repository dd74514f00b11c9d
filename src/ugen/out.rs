use crate::{
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, UGenKind},
    ugen::{InputSpec, Inputs, Sample, UGen},
};

/*
Output Nodes
============

An output node terminates a graph: its buffer is what the audio driver copies
to the device. A top-level definition that is not already an output gets one
wrapped around it, picked by the configured channel count:

  channels == 1   out        mono, sources summed
  channels  > 1   multiOut   one block per channel, laid out planar

Planar layout for 2 channels and a block of 4:

  buffer  [ L0 L1 L2 L3 | R0 R1 R2 R3 ]
           channel 0      channel 1

Sources map onto channels like this:

  fewer sources than channels   sources repeat: channel c plays source c % len
  more sources than channels    source i is mixed into channel i % channels

so a single source is duplicated to every channel, and five sources on a
stereo output alternate L, R, L, R, L.
*/

const SOURCES: usize = 0;

const OUT_INPUTS: &[InputSpec] = &[InputSpec::sequence("sources")];

/// Mono output: the sum of every source.
pub struct Out;

impl Out {
    pub const NAME: &'static str = "out";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: OUT_INPUTS,
        mul_add: false,
        default_rate: Rate::Audio,
        rates: &[Rate::Audio],
        output: true,
        construct: Self::construct,
    };

    fn construct(_ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Out))
    }
}

impl UGen for Out {
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

/// Multi-channel output with a planar buffer.
pub struct MultiOut {
    channels: usize,
    block_size: usize,
}

impl MultiOut {
    pub const NAME: &'static str = "multiOut";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: OUT_INPUTS,
        mul_add: false,
        default_rate: Rate::Audio,
        rates: &[Rate::Audio],
        output: true,
        construct: Self::construct,
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        Ok(Box::new(Self {
            channels: ctx.config.channels,
            block_size: ctx.config.block_size,
        }))
    }
}

impl UGen for MultiOut {
    fn buffer_len(&self, rate_len: usize) -> usize {
        rate_len * self.channels
    }

    fn generate(&mut self, n: usize, out: &mut [Sample], inputs: &Inputs<'_>) {
        let sources = inputs.sequence_len(SOURCES);
        let channels = self.channels;
        let feeds = |index: usize, channel: usize| {
            if sources < channels {
                index == channel % sources
            } else {
                index % channels == channel
            }
        };

        for (channel, block) in out.chunks_exact_mut(self.block_size).enumerate() {
            let block = &mut block[..n];
            block.fill(0.0);

            let routed = inputs
                .sequence(SOURCES)
                .enumerate()
                .filter(|(index, _)| feeds(*index, channel));
            for (_, source) in routed {
                for (i, sample) in block.iter_mut().enumerate() {
                    *sample += source.at(i);
                }
            }
        }
    }
}
