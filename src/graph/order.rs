use std::collections::{HashMap, HashSet};

use petgraph::{algo::toposort, graph::DiGraph};

use super::{Graph, NodeId};
use crate::{error::GraphError, rate::Rate};

/// Part of the graph to ignore while walking it, to find out what a rebind
/// would orphan before the rebind happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Cut {
    /// The binding at `index` of `node` (one element of it, for sequences).
    Edge {
        node: NodeId,
        index: usize,
        position: Option<usize>,
    },
    /// A whole node and everything behind it.
    Node(NodeId),
}

impl Cut {
    fn severs(self, node: NodeId, index: usize, position: usize) -> bool {
        match self {
            Cut::Edge {
                node: n,
                index: i,
                position: p,
            } => n == node && i == index && p.map_or(true, |p| p == position),
            Cut::Node(_) => false,
        }
    }
}

impl Graph {
    /// Every node the output can reach, skipping whatever `cut` removes.
    pub(super) fn reachable(&self, cut: Option<Cut>) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![self.output];

        while let Some(id) = stack.pop() {
            if cut == Some(Cut::Node(id)) || !seen.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else {
                continue;
            };
            for (index, binding) in node.bindings.iter().enumerate() {
                let Some(binding) = binding else {
                    continue;
                };
                for (position, upstream) in binding.ids().iter().enumerate() {
                    if !cut.is_some_and(|cut| cut.severs(id, index, position)) {
                        stack.push(*upstream);
                    }
                }
            }
        }
        seen
    }

    /// Recompute the schedule: every reachable non-constant node, inputs
    /// before the nodes that read them.
    pub(super) fn reorder(&mut self) -> Result<(), GraphError> {
        let live = self.reachable(None);

        let mut deps = DiGraph::<NodeId, ()>::new();
        let mut index = HashMap::with_capacity(live.len());
        for &id in &live {
            index.insert(id, deps.add_node(id));
        }
        for &id in &live {
            let (Some(node), Some(&to)) = (self.node(id), index.get(&id)) else {
                continue;
            };
            for upstream in node.upstream() {
                if let Some(&from) = index.get(&upstream) {
                    deps.add_edge(from, to, ());
                }
            }
        }

        let mut consumers = std::mem::take(&mut self.consumers);
        consumers.clear();
        for &id in &live {
            let Some(node) = self.node(id) else {
                continue;
            };
            for (index, binding) in node.bindings.iter().enumerate() {
                let Some(binding) = binding else {
                    continue;
                };
                for &upstream in binding.ids() {
                    let readers = consumers.entry(upstream).or_default();
                    if !readers.contains(&(id, index)) {
                        readers.push((id, index));
                    }
                }
            }
        }
        self.consumers = consumers;

        let order = toposort(&deps, None)
            .map_err(|cycle| GraphError::Cycle(self.describe(deps[cycle.node_id()])))?;

        self.schedule = order
            .into_iter()
            .map(|ix| deps[ix])
            .filter(|id| self.node(*id).is_some_and(|node| node.rate() != Rate::Constant))
            .collect();

        log::debug!(
            "scheduled {} of {} reachable nodes",
            self.schedule.len(),
            live.len()
        );
        Ok(())
    }

    /// Take every name registered to a node `cut` would orphan out of the
    /// name table, so a replacement subtree can reuse them.
    pub(super) fn stash_names(&mut self, cut: Cut) -> Vec<(String, NodeId)> {
        let live = self.reachable(Some(cut));
        let stashed: Vec<_> = self
            .named
            .iter()
            .filter(|(_, id)| !live.contains(*id))
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        for (name, _) in &stashed {
            self.named.remove(name);
        }
        stashed
    }

    /// Put stashed names back for nodes that are still alive.
    pub(super) fn restore_names(&mut self, stashed: Vec<(String, NodeId)>) {
        for (name, id) in stashed {
            if self.node(id).is_some() && !self.named.contains_key(&name) {
                self.named.insert(name, id);
            }
        }
    }

    /// Drop every node the output can no longer reach and unregister its id.
    pub(super) fn release_unreachable(&mut self) -> usize {
        let live = self.reachable(None);
        let dead: Vec<NodeId> = self.node_ids().filter(|id| !live.contains(id)).collect();

        for &id in &dead {
            let Some(node) = self.remove(id) else {
                continue;
            };
            if let Some(name) = node.id() {
                if self.named.get(name) == Some(&id) {
                    self.named.remove(name);
                }
            }
        }
        if !dead.is_empty() {
            log::debug!("released {} unreachable nodes", dead.len());
        }
        dead.len()
    }
}
