use super::{order::Cut, Graph, NodeId};
use crate::{
    def::{InputDef, UGenDef},
    error::GraphError,
    ugen::{value::Value, Binding, InputKind, Node},
};

/*
Paths
=====

A path starts at a registered id and walks input names from there:

  "lead"                    the node registered as `lead`
  "lead.freq"               lead's `freq` input
  "lead.freq.end"           the `end` input of whatever drives lead's freq
  "mix.sources.1"           the second element of a sequence input

get reads the target; set rebinds it:

  target            value      effect
  ---------------   --------   ------------------------------------------------
  value node        number     value updated in place (constant nodes recompute)
  param input       number     param updated in place
  any other input   number     new constant value node bound to the input
  any input         def        subtree built and bound to the input
  bare id           def        node replaced; everything that read it now
                               reads the replacement

Whatever a rebind orphans is released and its ids are unregistered, so a
replacement subtree may reuse them. If building the replacement fails the
graph is left exactly as it was.
*/

/// What a path currently reads as.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// A param, or an input bound to a value node.
    Scalar(f64),
    Node(NodeId),
    Sequence(Vec<NodeId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Node(NodeId),
    Input {
        node: NodeId,
        index: usize,
    },
    Element {
        node: NodeId,
        index: usize,
        position: usize,
    },
}

impl Graph {
    fn resolve(&self, path: &str) -> Result<Target, GraphError> {
        let not_found = || GraphError::PathNotFound(path.to_string());

        let mut parts = path.split('.');
        let head = parts.next().ok_or_else(not_found)?;
        let mut target = Target::Node(self.named(head).ok_or_else(not_found)?);

        for part in parts {
            if let Target::Input { node, index } = target {
                if let Some(Binding::Sequence(ids)) = self.binding_at(node, index) {
                    let position = part
                        .parse::<usize>()
                        .ok()
                        .filter(|position| *position < ids.len())
                        .ok_or_else(not_found)?;
                    target = Target::Element {
                        node,
                        index,
                        position,
                    };
                    continue;
                }
            }

            let upstream = self.target_node(target).ok_or_else(not_found)?;
            let index = self
                .node(upstream)
                .and_then(|node| node.kind.input_index(part))
                .ok_or_else(not_found)?;
            target = Target::Input {
                node: upstream,
                index,
            };
        }
        Ok(target)
    }

    /// The single node a target points at, if it points at one.
    fn target_node(&self, target: Target) -> Option<NodeId> {
        match target {
            Target::Node(id) => Some(id),
            Target::Input { node, index } => match self.binding_at(node, index)? {
                Binding::Signal(id) => Some(*id),
                Binding::Sequence(_) => None,
            },
            Target::Element {
                node,
                index,
                position,
            } => self.binding_at(node, index)?.ids().get(position).copied(),
        }
    }

    fn param_name(&self, target: Target) -> Option<&'static str> {
        let Target::Input { node, index } = target else {
            return None;
        };
        let spec = self.node(node)?.kind.spec(index)?;
        (spec.kind == InputKind::Param).then_some(spec.name)
    }

    fn is_value(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_value)
    }

    fn read(&self, id: NodeId) -> InputValue {
        match self.node(id) {
            Some(node) if node.is_value() => node
                .param("value")
                .map_or(InputValue::Node(id), InputValue::Scalar),
            _ => InputValue::Node(id),
        }
    }

    /// Read what `path` points at.
    ///
    /// Value nodes and params read as [`InputValue::Scalar`]. An unbound
    /// optional input reads as `None`.
    pub fn get(&self, path: &str) -> Result<Option<InputValue>, GraphError> {
        let target = self.resolve(path)?;

        if let Some(name) = self.param_name(target) {
            let Target::Input { node, .. } = target else {
                return Ok(None);
            };
            return Ok(self.node(node).and_then(|n| n.param(name)).map(InputValue::Scalar));
        }
        if let Target::Input { node, index } = target {
            if let Some(Binding::Sequence(ids)) = self.binding_at(node, index) {
                return Ok(Some(InputValue::Sequence(ids.clone())));
            }
        }
        Ok(self.target_node(target).map(|id| self.read(id)))
    }

    /// Rebind `path` to a number or a definition.
    pub fn set(&mut self, path: &str, value: impl Into<InputDef>) -> Result<(), GraphError> {
        let target = self.resolve(path)?;
        log::debug!("set `{path}`");

        match value.into() {
            InputDef::Literal(value) => self.set_scalar(path, target, value),
            def => self.rebind(path, target, &def),
        }
    }

    /// Like [`Graph::set`], except that `None` leaves the graph untouched.
    pub fn set_option(&mut self, path: &str, value: Option<InputDef>) -> Result<(), GraphError> {
        match value {
            Some(value) => self.set(path, value),
            None => Ok(()),
        }
    }

    /// Update the value node `path` points at, in place.
    pub fn set_value(&mut self, path: &str, value: f64) -> Result<(), GraphError> {
        let id = self.value_node(path)?;
        self.set_value_at(id, value);
        Ok(())
    }

    /// The value node `path` points at (directly, through an input, or
    /// through its own `value` param).
    pub(crate) fn value_node(&self, path: &str) -> Result<NodeId, GraphError> {
        let target = self.resolve(path)?;
        let id = match (self.param_name(target), target) {
            (Some(_), Target::Input { node, .. }) => Some(node),
            _ => self.target_node(target),
        };
        id.filter(|id| self.is_value(*id))
            .ok_or_else(|| GraphError::NotAValue(path.to_string()))
    }

    pub(crate) fn set_value_at(&mut self, id: NodeId, value: f64) -> bool {
        let updated = self
            .node_mut(id)
            .is_some_and(|node| node.ugen.set_param("value", value));
        if updated {
            self.refresh(id, None);
            self.notify_consumers(id);
        }
        updated
    }

    fn set_scalar(&mut self, path: &str, target: Target, value: f64) -> Result<(), GraphError> {
        if let (Some(name), Target::Input { node, .. }) = (self.param_name(target), target) {
            if self.node_mut(node).is_some_and(|n| n.ugen.set_param(name, value)) {
                self.refresh(node, None);
                self.notify_consumers(node);
            }
            return Ok(());
        }

        match self.target_node(target) {
            Some(id) if self.is_value(id) => {
                self.set_value_at(id, value);
                Ok(())
            }
            _ => self.rebind(path, target, &InputDef::Literal(value)),
        }
    }

    fn rebind(&mut self, path: &str, target: Target, input: &InputDef) -> Result<(), GraphError> {
        match target {
            Target::Node(id) => self.replace_node(path, id, input),
            Target::Input { node, index } => self.replace_input(path, node, index, None, input),
            Target::Element {
                node,
                index,
                position,
            } => self.replace_input(path, node, index, Some(position), input),
        }
    }

    /// Build `input` and bind it at `index` of `node` (or at one `position`
    /// of a sequence input), releasing whatever it displaces.
    fn replace_input(
        &mut self,
        path: &str,
        node: NodeId,
        index: usize,
        position: Option<usize>,
        input: &InputDef,
    ) -> Result<(), GraphError> {
        let not_found = || GraphError::PathNotFound(path.to_string());
        let kind = self.node(node).ok_or_else(not_found)?.kind;
        let spec = kind.spec(index).ok_or_else(not_found)?;
        if spec.kind == InputKind::Param {
            return Err(GraphError::InputMismatch {
                kind: kind.name.to_string(),
                input: spec.name.to_string(),
                expected: "a number",
            });
        }
        let mut siblings = match self.binding_at(node, index) {
            Some(binding) => binding.ids().to_vec(),
            None => Vec::new(),
        };

        let stashed = self.stash_names(Cut::Edge {
            node,
            index,
            position,
        });
        let built = match position {
            None => self.build_input(kind.name, spec, input),
            Some(position) => self.build_element(kind.name, spec, input).map(|id| {
                siblings[position] = id;
                Binding::Sequence(siblings)
            }),
        };
        let binding = match built {
            Ok(binding) => binding,
            Err(err) => {
                self.release_unreachable();
                self.restore_names(stashed);
                return Err(err);
            }
        };

        if let Some(slot) = self.node_mut(node).and_then(|n| n.bindings.get_mut(index)) {
            *slot = Some(binding);
        }
        self.release_unreachable();
        self.restore_names(stashed);
        self.reorder()?;
        self.refresh(node, Some(index));
        Ok(())
    }

    /// Replace the node `id` with one built from `input`, relinking every
    /// node that read it.
    fn replace_node(&mut self, path: &str, id: NodeId, input: &InputDef) -> Result<(), GraphError> {
        let old_name = self.node(id).and_then(|node| node.id.clone());

        let stashed = self.stash_names(Cut::Node(id));
        let built = match input {
            InputDef::Literal(value) => {
                self.build_node(&UGenDef::new(Value::NAME).input("value", *value))
            }
            InputDef::Def(def) => self.build_node(def),
            InputDef::Seq(_) => Err(GraphError::InputMismatch {
                kind: self.node(id).map_or("", Node::kind).to_string(),
                input: path.to_string(),
                expected: "a number or a single definition",
            }),
        };
        let replacement = match built {
            Ok(replacement) => replacement,
            Err(err) => {
                self.release_unreachable();
                self.restore_names(stashed);
                return Err(err);
            }
        };

        // An anonymous replacement keeps the name it was addressed by.
        if let Some(name) = old_name {
            if !self.named.contains_key(&name) {
                if let Some(node) = self.node_mut(replacement).filter(|node| node.id.is_none()) {
                    node.id = Some(name.clone());
                    self.named.insert(name, replacement);
                }
            }
        }

        let mut consumers = Vec::new();
        for consumer in self.node_ids().collect::<Vec<_>>() {
            let Some(node) = self.node_mut(consumer) else {
                continue;
            };
            for (index, binding) in node.bindings.iter_mut().enumerate() {
                let Some(binding) = binding else {
                    continue;
                };
                let mut relinked = false;
                for upstream in binding.ids_mut().iter_mut().filter(|upstream| **upstream == id) {
                    *upstream = replacement;
                    relinked = true;
                }
                if relinked {
                    consumers.push((consumer, index));
                }
            }
        }
        if self.output == id {
            self.output = self.ensure_output(replacement)?;
        }

        self.release_unreachable();
        self.restore_names(stashed);
        self.reorder()?;
        for (consumer, index) in consumers {
            self.refresh(consumer, Some(index));
        }
        Ok(())
    }
}
