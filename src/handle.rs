//! Lock-free handles for changing value nodes from another thread.

use rtrb::{Producer, RingBuffer};

use crate::{
    error::GraphError,
    graph::{Graph, NodeId},
};

/*
Value Handles
=============

A handle owns the producer end of a small ring buffer; the graph owns the
consumer end. Sets are queued and applied at the start of the next
generate, before any node runs, so a block never sees half an update.

  control thread                 audio thread
  ──────────────                 ────────────
  handle.set(0.3) ──push──▶ [ring] ──pop──▶ graph.generate(n)
                                              value node updated
                                              (constant nodes recompute)

A full queue drops the set and returns false. Handles for a node that was
later released are harmless: the stale id matches no slot.
*/

const VALUE_QUEUE_SIZE: usize = 64;

pub(crate) enum ValueCommand {
    Set { node: NodeId, value: f64 },
}

/// Sets one value node from any thread.
pub struct ValueHandle {
    tx: Producer<ValueCommand>,
    node: NodeId,
}

impl ValueHandle {
    /// Queue a new value. Returns false if the queue is full.
    pub fn set(&mut self, value: f64) -> bool {
        self.tx
            .push(ValueCommand::Set {
                node: self.node,
                value,
            })
            .is_ok()
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl Graph {
    /// A handle to the value node `path` points at.
    pub fn value_handle(&mut self, path: &str) -> Result<ValueHandle, GraphError> {
        let node = self.value_node(path)?;
        let (tx, rx) = RingBuffer::<ValueCommand>::new(VALUE_QUEUE_SIZE);

        self.queues.retain(|queue| !queue.is_abandoned() || !queue.is_empty());
        self.queues.push(rx);
        log::debug!("value handle for `{path}` ({node})");
        Ok(ValueHandle { tx, node })
    }

    pub(crate) fn drain_queues(&mut self) {
        for index in 0..self.queues.len() {
            while let Ok(ValueCommand::Set { node, value }) = self.queues[index].pop() {
                if !self.set_value_at(node, value) {
                    log::trace!("dropped set for released node {node}");
                }
            }
        }
    }
}
