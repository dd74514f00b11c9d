use crate::{
    dsp::{
        envelope::CurveValue,
        segment::{SegmentShape, SegmentState},
        CurveShape,
    },
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, UGenKind},
    ugen::{InputSpec, Inputs, Sample, UGen},
};

const START: usize = 0;
const END: usize = 1;
const DURATION: usize = 2;

/// One segment from `start` to `end` over `duration` seconds, then holds
/// `end` forever.
///
/// Inputs are sampled when bound; rebinding any of them restarts the ramp
/// from the new start. `line` is linear unless a `curve` option names another
/// shape (or gives a curvature); `xLine` is exponential.
pub struct Line {
    shape: SegmentShape,
    sample_rate: f64,
    segment: SegmentState,
    remaining: usize,
}

/// Exponential flavour of [`Line`].
pub struct XLine;

impl Line {
    pub const NAME: &'static str = "line";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[
            InputSpec::signal("start", 0.0),
            InputSpec::signal("end", 1.0),
            InputSpec::signal("duration", 1.0),
        ],
        mul_add: true,
        default_rate: Rate::Audio,
        rates: &[Rate::Audio, Rate::Control],
        output: false,
        construct: Self::construct,
    };

    pub fn new(shape: SegmentShape, sample_rate: f64) -> Self {
        Self {
            shape,
            sample_rate,
            segment: SegmentState::default(),
            remaining: 0,
        }
    }

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        let shape = curve_option(ctx, CurveShape::Linear)?;
        Ok(Box::new(Self::new(shape, ctx.sample_rate())))
    }

    /// Restart the ramp from the currently bound inputs.
    fn restart(&mut self, inputs: &Inputs<'_>) {
        let read = |index| inputs.signal(index).map_or(0.0, |s| s.first() as f64);
        let (start, end) = (read(START), read(END));
        let samples = (read(DURATION).max(0.0) * self.sample_rate).round() as usize;

        self.segment = SegmentState::new(self.shape, start, end, samples);
        self.remaining = samples.max(1);
    }
}

impl XLine {
    pub const NAME: &'static str = "xLine";

    pub const KIND: UGenKind = UGenKind {
        name: Self::NAME,
        inputs: &[
            InputSpec::signal("start", 1.0),
            InputSpec::signal("end", 2.0),
            InputSpec::signal("duration", 1.0),
        ],
        construct: Self::construct,
        ..Line::KIND
    };

    fn construct(ctx: &BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError> {
        let shape = curve_option(ctx, CurveShape::Exponential)?;
        Ok(Box::new(Line::new(shape, ctx.sample_rate())))
    }
}

fn curve_option(ctx: &BuildContext<'_>, default: CurveShape) -> Result<SegmentShape, GraphError> {
    match ctx.option::<CurveValue>("curve")? {
        None => Ok(default.into()),
        Some(CurveValue::Curvature(c)) => Ok(SegmentShape::Curve(c)),
        Some(CurveValue::Name(name)) => {
            let shape: CurveShape = name.parse()?;
            Ok(shape.into())
        }
    }
}

impl UGen for Line {
    fn on_input_changed(&mut self, inputs: &Inputs<'_>, _name: Option<&str>) {
        self.restart(inputs);
    }

    fn generate(&mut self, n: usize, out: &mut [Sample], _inputs: &Inputs<'_>) {
        let ramp = n.min(self.remaining);
        self.segment.gen(ramp, 0, out);
        self.remaining -= ramp;

        if self.remaining == 0 && ramp < n {
            if self.segment.shape() != SegmentShape::Constant {
                let end = self.segment.destination;
                self.segment = SegmentState::holding(end);
            }
            self.segment.gen(n - ramp, ramp, out);
        }
    }
}
