use serde_json::{Map, Value as Json};

use super::{Graph, NodeId};
use crate::{
    config::EngineConfig,
    def::{InputDef, UGenDef},
    error::GraphError,
    rate::Rate,
    registry::{BuildContext, Registry, UGenKind},
    ugen::{
        out::{MultiOut, Out},
        value::Value,
        Binding, InputDefault, InputKind, InputSpec, Node,
    },
};

/*
Building
========

Definitions are built depth-first. Every input of a definition is built
before the node itself, so by the time a unit generator's constructor and its
first on_input_changed run, every upstream buffer already exists and every
constant upstream already holds its value.

  literal          → implicit constant-rate `value` node
  nested def       → built recursively
  [def, def, ...]  → each element built in order (sequence inputs)
  missing input    → its declared default as a value node, left unbound if
                     optional, or MissingInput if required

Param inputs (the value node's own `value`) are never nodes: the literal is
handed to the constructor directly.

A top-level definition that is not an output kind is wrapped in `out` for a
mono configuration or `multiOut` otherwise.
*/

fn mismatch(kind: &str, input: &str, expected: &'static str) -> GraphError {
    GraphError::InputMismatch {
        kind: kind.to_string(),
        input: input.to_string(),
        expected,
    }
}

impl Graph {
    /// Build a graph from `def` with the built-in unit generators.
    pub fn build(def: &UGenDef, config: EngineConfig) -> Result<Self, GraphError> {
        Self::build_with(def, config, Registry::default())
    }

    /// Build a graph from `def`, resolving type identifiers in `registry`.
    pub fn build_with(
        def: &UGenDef,
        config: EngineConfig,
        registry: Registry,
    ) -> Result<Self, GraphError> {
        config.validate()?;

        let mut graph = Self::empty(config, registry);
        let root = graph.build_node(def)?;
        graph.output = graph.ensure_output(root)?;
        graph.reorder()?;

        log::debug!(
            "built graph: {} nodes, {} scheduled, output {}",
            graph.node_count(),
            graph.schedule.len(),
            graph.describe(graph.output)
        );
        Ok(graph)
    }

    pub(super) fn build_node(&mut self, def: &UGenDef) -> Result<NodeId, GraphError> {
        if def.kind.is_empty() {
            return Err(GraphError::MissingType);
        }
        let kind = *self.registry.get(&def.kind)?;

        let rate = def.parsed_rate()?.unwrap_or(kind.default_rate);
        if !kind.rates.contains(&rate) {
            return Err(GraphError::UnsupportedRate {
                kind: kind.name.to_string(),
                rate,
            });
        }
        if let Some(input) = def.inputs.keys().find(|name| kind.input_index(name).is_none()) {
            return Err(GraphError::UnknownInput {
                kind: kind.name.to_string(),
                input: input.clone(),
            });
        }
        if let Some(id) = def.id.as_ref().filter(|id| self.named.contains_key(*id)) {
            return Err(GraphError::DuplicateId(id.clone()));
        }

        let mut bindings = vec![None; kind.input_count()];
        let mut params = Vec::new();
        for (index, spec) in kind.specs().enumerate() {
            match (spec.kind, def.inputs.get(spec.name)) {
                (InputKind::Param, Some(InputDef::Literal(value))) => {
                    params.push((spec.name, *value));
                }
                (InputKind::Param, Some(_)) => {
                    return Err(mismatch(kind.name, spec.name, "a number"));
                }
                (InputKind::Param, None) => {}
                (_, Some(input)) => {
                    bindings[index] = Some(self.build_input(kind.name, spec, input)?);
                }
                (_, None) => {
                    bindings[index] = self.default_binding(kind.name, spec)?;
                }
            }
        }

        self.instantiate(kind, rate, def.id.clone(), &def.options, bindings, &params)
    }

    pub(super) fn build_input(
        &mut self,
        kind: &str,
        spec: InputSpec,
        input: &InputDef,
    ) -> Result<Binding, GraphError> {
        match (spec.kind, input) {
            (InputKind::Signal, InputDef::Literal(value)) => {
                Ok(Binding::Signal(self.build_value(*value)?))
            }
            (InputKind::Signal, InputDef::Def(def)) => Ok(Binding::Signal(self.build_node(def)?)),
            (InputKind::Signal, InputDef::Seq(_)) => {
                Err(mismatch(kind, spec.name, "a number or a single definition"))
            }
            (InputKind::Sequence, InputDef::Seq(defs)) => defs
                .iter()
                .map(|def| self.build_node(def))
                .collect::<Result<Vec<_>, _>>()
                .map(Binding::Sequence),
            (InputKind::Sequence, _) => Ok(Binding::Sequence(vec![
                self.build_element(kind, spec, input)?
            ])),
            (InputKind::Param, _) => Err(mismatch(kind, spec.name, "a number")),
        }
    }

    /// Build one node for a signal input or one element of a sequence.
    pub(super) fn build_element(
        &mut self,
        kind: &str,
        spec: InputSpec,
        input: &InputDef,
    ) -> Result<NodeId, GraphError> {
        match input {
            InputDef::Literal(value) => self.build_value(*value),
            InputDef::Def(def) => self.build_node(def),
            InputDef::Seq(_) => Err(mismatch(kind, spec.name, "a single definition")),
        }
    }

    pub(super) fn build_value(&mut self, value: f64) -> Result<NodeId, GraphError> {
        self.build_node(&UGenDef::new(Value::NAME).input("value", value))
    }

    fn default_binding(
        &mut self,
        kind: &str,
        spec: InputSpec,
    ) -> Result<Option<Binding>, GraphError> {
        match spec.default {
            InputDefault::Value(value) => {
                let id = self.build_value(value)?;
                Ok(Some(match spec.kind {
                    InputKind::Sequence => Binding::Sequence(vec![id]),
                    InputKind::Signal | InputKind::Param => Binding::Signal(id),
                }))
            }
            InputDefault::Optional => Ok(None),
            InputDefault::Required => Err(GraphError::MissingInput {
                kind: kind.to_string(),
                input: spec.name.to_string(),
            }),
        }
    }

    /// Construct the unit generator, allocate its buffer and link it in.
    fn instantiate(
        &mut self,
        kind: UGenKind,
        rate: Rate,
        id: Option<String>,
        options: &Map<String, Json>,
        bindings: Vec<Option<Binding>>,
        params: &[(&'static str, f64)],
    ) -> Result<NodeId, GraphError> {
        if let Some(name) = id.as_ref().filter(|name| self.named.contains_key(*name)) {
            return Err(GraphError::DuplicateId(name.clone()));
        }

        let ctx = BuildContext {
            kind: kind.name,
            config: &self.config,
            rate,
            options,
            params,
            specs: kind.inputs,
        };
        let ugen = (kind.construct)(&ctx)?;
        let buffer_len = ugen.buffer_len(rate.buffer_len(&self.config));

        let node = Node::new(kind, id.clone(), rate, bindings, ugen, buffer_len);
        let node_id = self.insert(node);
        self.refresh(node_id, None);

        if let Some(name) = id {
            self.named.insert(name, node_id);
        }
        log::debug!("built {} at {rate} rate", self.describe(node_id));
        Ok(node_id)
    }

    /// `root` itself if it is an output kind, else a new output wrapping it.
    pub(super) fn ensure_output(&mut self, root: NodeId) -> Result<NodeId, GraphError> {
        if self.node(root).is_some_and(|node| node.kind.output) {
            return Ok(root);
        }

        let name = if self.config.channels > 1 {
            MultiOut::NAME
        } else {
            Out::NAME
        };
        let kind = *self.registry.get(name)?;
        let sources = kind
            .input_index("sources")
            .ok_or_else(|| GraphError::UnknownInput {
                kind: kind.name.to_string(),
                input: "sources".into(),
            })?;

        let mut bindings = vec![None; kind.input_count()];
        bindings[sources] = Some(Binding::Sequence(vec![root]));
        self.instantiate(kind, kind.default_rate, None, &Map::new(), bindings, &[])
    }
}
