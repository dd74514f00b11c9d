use std::slice;

use crate::{
    graph::{NodeId, Slot},
    rate::Rate,
    registry::UGenKind,
    ugen::{MulAdd, Sample, UGen},
};

/// Upstream node(s) bound to one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Signal(NodeId),
    Sequence(Vec<NodeId>),
}

impl Binding {
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Binding::Signal(id) => slice::from_ref(id),
            Binding::Sequence(ids) => ids,
        }
    }
}

/// A bound input's output buffer, tagged with the rate it was generated at.
#[derive(Debug, Clone, Copy)]
pub struct Signal<'a> {
    pub rate: Rate,
    pub buffer: &'a [Sample],
}

impl<'a> Signal<'a> {
    /// Value for output sample `i`, honouring the input's stride.
    #[inline]
    pub fn at(&self, i: usize) -> Sample {
        self.buffer[i * self.rate.stride()]
    }

    /// The one value a per-block reader uses, whatever the input's rate.
    #[inline]
    pub fn first(&self) -> Sample {
        self.buffer[0]
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.rate.stride()
    }
}

/// Read-only view of a node's bound inputs during generation.
pub struct Inputs<'a> {
    slots: &'a [Slot],
    bindings: &'a [Option<Binding>],
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(slots: &'a [Slot], bindings: &'a [Option<Binding>]) -> Self {
        Self { slots, bindings }
    }

    fn resolve(&self, id: NodeId) -> Option<Signal<'a>> {
        let slots: &'a [Slot] = self.slots;
        slots.get(id.index()).and_then(|slot| slot.get(id)).map(|node| Signal {
            rate: node.rate,
            buffer: &node.buffer,
        })
    }

    fn binding(&self, index: usize) -> Option<&'a Binding> {
        let bindings: &'a [Option<Binding>] = self.bindings;
        bindings.get(index).and_then(Option::as_ref)
    }

    /// The input at `index`. For sequence inputs this is the first element.
    pub fn signal(&self, index: usize) -> Option<Signal<'a>> {
        self.binding(index)
            .and_then(|binding| binding.ids().first())
            .and_then(|id| self.resolve(*id))
    }

    pub fn rate(&self, index: usize) -> Option<Rate> {
        self.signal(index).map(|signal| signal.rate)
    }

    /// Stride for the input at `index`; unbound inputs read as stride 0.
    pub fn stride(&self, index: usize) -> usize {
        self.rate(index).map_or(0, Rate::stride)
    }

    /// Every node bound to a sequence input, in order.
    pub fn sequence<'s>(&'s self, index: usize) -> impl Iterator<Item = Signal<'a>> + 's {
        let ids: &'a [NodeId] = match self.binding(index) {
            Some(binding) => binding.ids(),
            None => &[],
        };
        ids.iter().filter_map(move |id| self.resolve(*id))
    }

    pub fn sequence_len(&self, index: usize) -> usize {
        self.binding(index).map_or(0, |binding| binding.ids().len())
    }
}

/// A live node: one unit generator plus everything the graph tracks for it.
///
/// The node exclusively owns its output buffer and its unit generator state.
/// Its bindings are plain ids; the graph owns every node's lifetime.
pub struct Node {
    pub(crate) kind: UGenKind,
    pub(crate) id: Option<String>,
    pub(crate) rate: Rate,
    pub(crate) bindings: Vec<Option<Binding>>,
    pub(crate) ugen: Box<dyn UGen>,
    pub(crate) buffer: Vec<Sample>,
    pub(crate) mul_add: MulAdd,
}

impl Node {
    pub(crate) fn new(
        kind: UGenKind,
        id: Option<String>,
        rate: Rate,
        bindings: Vec<Option<Binding>>,
        ugen: Box<dyn UGen>,
        buffer_len: usize,
    ) -> Self {
        Self {
            kind,
            id,
            rate,
            bindings,
            ugen,
            buffer: vec![0.0; buffer_len],
            mul_add: MulAdd::None,
        }
    }

    /// Type identifier this node was built from.
    pub fn kind(&self) -> &'static str {
        self.kind.name
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// The node's most recently generated output.
    pub fn buffer(&self) -> &[Sample] {
        &self.buffer
    }

    /// Scale/offset routine currently selected for this node.
    pub fn mul_add(&self) -> MulAdd {
        self.mul_add
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.ugen.param(name)
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.kind
            .input_index(name)
            .and_then(|index| self.bindings.get(index))
            .and_then(Option::as_ref)
    }

    pub(crate) fn upstream(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.bindings
            .iter()
            .flatten()
            .flat_map(Binding::ids)
            .copied()
    }

    pub(crate) fn is_value(&self) -> bool {
        self.kind.name == crate::ugen::value::Value::NAME
    }

    /// Re-run the unit generator's per-input caching and re-select the
    /// scale/offset routine.
    pub(crate) fn input_changed(&mut self, slots: &[Slot], name: Option<&str>) {
        let inputs = Inputs::new(slots, &self.bindings);
        self.ugen.on_input_changed(&inputs, name);

        let mul = self.kind.mul_index().and_then(|index| inputs.rate(index));
        let add = self.kind.add_index().and_then(|index| inputs.rate(index));
        self.mul_add = MulAdd::select(mul, add);
    }

    /// Generate one block. `n` is the audio block length requested by the
    /// graph; control and constant nodes compute a single value.
    pub(crate) fn generate(&mut self, n: usize, slots: &[Slot]) {
        let count = self.rate.samples_per_block(n);
        let inputs = Inputs::new(slots, &self.bindings);
        self.ugen.generate(count, &mut self.buffer, &inputs);

        if self.mul_add != MulAdd::None {
            let mul = self
                .kind
                .mul_index()
                .and_then(|index| inputs.signal(index))
                .map(|signal| signal.buffer);
            let add = self
                .kind
                .add_index()
                .and_then(|index| inputs.signal(index))
                .map(|signal| signal.buffer);
            self.mul_add.apply(&mut self.buffer[..count], mul, add);
        }
    }
}
