//! Live unit generator graphs.
//!
//! A [`Graph`] owns every node built from one definition. Nodes live in an
//! arena of slots addressed by [`NodeId`]; bindings between nodes are plain
//! ids, so the graph alone decides when a node is dropped.

mod build;
mod order;
mod path;

use std::{collections::HashMap, fmt, slice};

use crate::{
    config::EngineConfig,
    rate::Rate,
    registry::Registry,
    ugen::{Binding, Node, Sample},
};

pub use path::InputValue;

/*
Block Processing
================

The graph is evaluated one block at a time, driven from outside:

    graph.generate(n)
      ├─ apply queued value changes (lock-free handles)
      ├─ for each node in the schedule, inputs first:
      │    take the node out of its slot
      │    node.generate(n, &slots)      reads upstream buffers through the slots
      │    put the node back
      └─ return the output node's buffer

Taking the node out of its slot is what lets it write its own buffer while
reading everyone else's: the node is a local value for the duration of the
call and the arena is only borrowed immutably. Nothing is allocated.

The schedule holds audio- and control-rate nodes in dependency order.
Constant-rate nodes are not in it. They compute their single value when they
are built and again when their value is set, and never otherwise.

Control Path
============

Everything else (building, get/set, rebinding, handles) is the control path.
It may allocate, recompute the schedule and release nodes, and it must be
serialized with generate by the caller. Lock-free value handles (feature
`rtrb`) are the one way to change a graph from another thread; their
commands are applied at the start of the next block.
*/

/// Address of a node in its graph's arena.
///
/// The generation changes every time a slot is reused, so an id kept past
/// its node's release never aliases a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    const PLACEHOLDER: NodeId = NodeId {
        index: u32::MAX,
        generation: 0,
    };

    fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
        }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// One arena cell.
#[derive(Default)]
pub(crate) struct Slot {
    generation: u32,
    node: Option<Node>,
}

impl Slot {
    /// The node in this slot, if it is the one `id` refers to.
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        if self.generation == id.generation {
            self.node.as_ref()
        } else {
            None
        }
    }
}

/// Every live node built from one definition, plus its name table and
/// designated output.
pub struct Graph {
    config: EngineConfig,
    registry: Registry,
    slots: Vec<Slot>,
    free: Vec<usize>,
    /// Non-constant nodes, inputs first.
    schedule: Vec<NodeId>,
    named: HashMap<String, NodeId>,
    /// Every (node, input index) reading each node, rebuilt with the schedule.
    consumers: HashMap<NodeId, Vec<(NodeId, usize)>>,
    output: NodeId,
    #[cfg(feature = "rtrb")]
    pub(crate) queues: Vec<rtrb::Consumer<crate::handle::ValueCommand>>,
}

impl Graph {
    fn empty(config: EngineConfig, registry: Registry) -> Self {
        Self {
            config,
            registry,
            slots: Vec::new(),
            free: Vec::new(),
            schedule: Vec::new(),
            named: HashMap::new(),
            consumers: HashMap::new(),
            output: NodeId::PLACEHOLDER,
            #[cfg(feature = "rtrb")]
            queues: Vec::new(),
        }
    }

    /// Run one block and return the output buffer.
    ///
    /// `n` is clamped to the configured block size. A multi-channel output
    /// returns its whole planar buffer; use [`Graph::channel`] for one
    /// channel.
    pub fn generate(&mut self, n: usize) -> &[Sample] {
        let n = n.min(self.config.block_size);

        #[cfg(feature = "rtrb")]
        self.drain_queues();

        for position in 0..self.schedule.len() {
            let id = self.schedule[position];
            self.with_node(id, |node, slots| node.generate(n, slots));
        }

        self.output()
    }

    /// The output node's most recent block.
    pub fn output(&self) -> &[Sample] {
        match self.node(self.output) {
            Some(node) => node.buffer(),
            None => &[],
        }
    }

    pub fn output_id(&self) -> NodeId {
        self.output
    }

    /// Type identifier of the output node (`out` or `multiOut` for wrapped
    /// definitions).
    pub fn output_kind(&self) -> &'static str {
        self.node(self.output).map_or("", Node::kind)
    }

    /// Channels in the output buffer.
    pub fn channels(&self) -> usize {
        (self.output().len() / self.config.block_size).max(1)
    }

    /// One channel of the output buffer.
    pub fn channel(&self, channel: usize) -> Option<&[Sample]> {
        self.output().chunks_exact(self.config.block_size).nth(channel)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(|slot| slot.get(id))
    }

    /// Look up a node registered under `name`.
    pub fn named(&self, name: &str) -> Option<NodeId> {
        self.named.get(name).copied()
    }

    /// Output buffer of the node registered under `name`.
    pub fn named_buffer(&self, name: &str) -> Option<&[Sample]> {
        self.named(name)
            .and_then(|id| self.node(id))
            .map(Node::buffer)
    }

    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    /// Ids of every live node, in arena order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|_| NodeId::new(index, slot.generation))
        })
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation == id.generation {
            slot.node.as_mut()
        } else {
            None
        }
    }

    fn binding_at(&self, node: NodeId, index: usize) -> Option<&Binding> {
        self.node(node)?.bindings.get(index)?.as_ref()
    }

    /// Run `f` with the node moved out of the arena, so it can read every
    /// other node while mutating itself.
    fn with_node<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Node, &[Slot]) -> R) -> Option<R> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let mut node = slot.node.take()?;
        let result = f(&mut node, &self.slots);
        self.slots[id.index()].node = Some(node);
        Some(result)
    }

    fn insert(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(self.slots.len() - 1, 0)
            }
        }
    }

    fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(node)
    }

    /// Re-run input caching for `node` after the binding at `index` changed,
    /// and recompute its value if it is constant-rate.
    fn refresh(&mut self, node: NodeId, index: Option<usize>) {
        let block_size = self.config.block_size;
        self.with_node(node, |node, slots| {
            let name = index.and_then(|index| node.kind.spec(index)).map(|spec| spec.name);
            node.input_changed(slots, name);
            if node.rate() == Rate::Constant {
                node.generate(block_size, slots);
            }
        });
    }

    /// Tell every node reading `id` that its input changed, after `id` was
    /// updated in place. Uses the cached consumer lists, so nothing allocates.
    /// Constant readers were regenerated by their refresh, so their own
    /// readers hear about it too.
    fn notify_consumers(&mut self, id: NodeId) {
        let count = self.consumers.get(&id).map_or(0, Vec::len);
        for position in 0..count {
            let reader = self
                .consumers
                .get(&id)
                .and_then(|readers| readers.get(position))
                .copied();
            if let Some((consumer, index)) = reader {
                self.refresh(consumer, Some(index));
                if self.node(consumer).is_some_and(|node| node.rate() == Rate::Constant) {
                    self.notify_consumers(consumer);
                }
            }
        }
    }

    fn describe(&self, id: NodeId) -> String {
        match self.node(id) {
            Some(node) => match node.id() {
                Some(name) => format!("{} `{name}`", node.kind()),
                None => format!("{} {id}", node.kind()),
            },
            None => id.to_string(),
        }
    }
}

impl Binding {
    fn ids_mut(&mut self) -> &mut [NodeId] {
        match self {
            Binding::Signal(id) => slice::from_mut(id),
            Binding::Sequence(ids) => ids,
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("config", &self.config)
            .field("nodes", &self.node_count())
            .field("scheduled", &self.schedule.len())
            .field("output", &self.output)
            .field("named", &self.named)
            .finish()
    }
}
