use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    config::EngineConfig,
    error::GraphError,
    rate::Rate,
    ugen::{
        env_gen::EnvGen,
        line::{Line, XLine},
        noise::WhiteNoise,
        osc::{Impulse, LfPulse, LfSaw, SinOsc},
        out::{MultiOut, Out},
        sum::Sum,
        value::Value as ValueUGen,
        InputSpec, UGen, MUL_ADD_INPUTS,
    },
};

/// Builds the unit generator for one node.
pub type Constructor = fn(&BuildContext<'_>) -> Result<Box<dyn UGen>, GraphError>;

/// Everything the registry knows about one type identifier.
#[derive(Clone, Copy)]
pub struct UGenKind {
    pub name: &'static str,
    /// Kind-specific inputs, in slot order. `mul`/`add` follow when enabled.
    pub inputs: &'static [InputSpec],
    pub mul_add: bool,
    pub default_rate: Rate,
    pub rates: &'static [Rate],
    /// Output kinds terminate a graph; anything else gets wrapped.
    pub output: bool,
    pub construct: Constructor,
}

impl UGenKind {
    /// Total input slots, including `mul`/`add`.
    pub fn input_count(&self) -> usize {
        self.inputs.len() + if self.mul_add { MUL_ADD_INPUTS.len() } else { 0 }
    }

    pub fn spec(&self, index: usize) -> Option<InputSpec> {
        match index.checked_sub(self.inputs.len()) {
            None => Some(self.inputs[index]),
            Some(extra) if self.mul_add => MUL_ADD_INPUTS.get(extra).copied(),
            Some(_) => None,
        }
    }

    pub fn specs(&self) -> impl Iterator<Item = InputSpec> + '_ {
        (0..self.input_count()).filter_map(|index| self.spec(index))
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.specs().position(|spec| spec.name == name)
    }

    pub fn mul_index(&self) -> Option<usize> {
        self.mul_add.then_some(self.inputs.len())
    }

    pub fn add_index(&self) -> Option<usize> {
        self.mul_add.then_some(self.inputs.len() + 1)
    }
}

impl std::fmt::Debug for UGenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UGenKind")
            .field("name", &self.name)
            .field("default_rate", &self.default_rate)
            .field("output", &self.output)
            .finish()
    }
}

/// What a constructor gets to look at.
pub struct BuildContext<'a> {
    pub kind: &'static str,
    pub config: &'a EngineConfig,
    pub rate: Rate,
    pub options: &'a Map<String, Value>,
    pub(crate) params: &'a [(&'static str, f64)],
    pub(crate) specs: &'static [InputSpec],
}

impl<'a> BuildContext<'a> {
    /// Clock the node runs at.
    pub fn sample_rate(&self) -> f64 {
        self.rate.sample_rate(self.config)
    }

    /// A literal-only input: the definition's value, else the declared default.
    pub fn param(&self, name: &str) -> f64 {
        self.params
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, value)| *value)
            .or_else(|| {
                self.specs.iter().find(|spec| spec.name == name).and_then(|spec| {
                    match spec.default {
                        crate::ugen::InputDefault::Value(value) => Some(value),
                        _ => None,
                    }
                })
            })
            .unwrap_or(0.0)
    }

    /// Deserialize an option, if present.
    pub fn option<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, GraphError> {
        self.options
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|err| GraphError::InvalidOption {
                    kind: self.kind.to_string(),
                    option: name.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()
    }

    pub fn invalid_option(&self, name: &str, reason: impl Into<String>) -> GraphError {
        GraphError::InvalidOption {
            kind: self.kind.to_string(),
            option: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Maps type identifiers to constructors.
///
/// `Registry::default()` knows every built-in kind; custom kinds can be added
/// with [`Registry::register`] before building a graph.
pub struct Registry {
    kinds: HashMap<&'static str, UGenKind>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Add or replace a kind. Returns the registry for chaining.
    pub fn register(&mut self, kind: UGenKind) -> &mut Self {
        if self.kinds.insert(kind.name, kind).is_some() {
            log::debug!("replaced registered kind `{}`", kind.name);
        }
        self
    }

    pub fn get(&self, name: &str) -> Result<&UGenKind, GraphError> {
        self.kinds
            .get(name)
            .ok_or_else(|| GraphError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ValueUGen::KIND)
            .register(Sum::KIND)
            .register(SinOsc::KIND)
            .register(LfSaw::KIND)
            .register(LfPulse::KIND)
            .register(Impulse::KIND)
            .register(WhiteNoise::KIND)
            .register(Line::KIND)
            .register(XLine::KIND)
            .register(EnvGen::KIND)
            .register(Out::KIND)
            .register(MultiOut::KIND);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = Registry::default();
        for name in ["value", "sinOsc", "envGen", "out", "multiOut", "line", "xLine"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.names().count(), 12);
        assert_eq!(Registry::empty().names().count(), 0);
    }

    #[test]
    fn unknown_types_are_construction_errors() {
        let registry = Registry::default();
        assert_eq!(
            registry.get("moogFilter").unwrap_err(),
            GraphError::UnknownType("moogFilter".into())
        );
    }

    #[test]
    fn mul_and_add_follow_the_kind_inputs() {
        let kind = SinOsc::KIND;
        assert_eq!(kind.input_index("freq"), Some(0));
        assert_eq!(kind.mul_index(), kind.input_index("mul"));
        assert_eq!(kind.add_index(), kind.input_index("add"));
        assert_eq!(kind.input_count(), kind.inputs.len() + 2);
        assert_eq!(Out::KIND.input_index("mul"), None);
    }
}
