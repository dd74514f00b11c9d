use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::GraphError, rate::Rate};

/*
Graph Definitions
=================

A graph is described as a tree of plain data, usually JSON:

    {
      "type": "sinOsc",
      "id": "carrier",
      "rate": "audio",
      "inputs": {
        "freq": { "type": "line", "inputs": { "start": 220, "end": 440 } },
        "mul":  0.25
      },
      "options": {}
    }

  type      which unit generator to build (required)
  rate      audio | control | constant, defaults per kind
  id        name used to find the node later with get/set
  inputs    name -> number | nested definition | [definitions]
  options   free-form settings a kind reads at construction

A definition is immutable once handed to the builder. Changing a running graph
goes through Graph::set, which builds new nodes from new definitions.
*/

/// Declarative description of one node and its upstream tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UGenDef {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, InputDef>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

/// What an input is bound to in a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputDef {
    Literal(f64),
    Def(Box<UGenDef>),
    Seq(Vec<UGenDef>),
}

impl UGenDef {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, GraphError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate.as_str().to_string());
        self
    }

    pub fn input(mut self, name: impl Into<String>, value: impl Into<InputDef>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Parsed rate, if the definition names one.
    pub fn parsed_rate(&self) -> Result<Option<Rate>, GraphError> {
        self.rate.as_deref().map(str::parse).transpose()
    }
}

impl From<f64> for InputDef {
    fn from(value: f64) -> Self {
        InputDef::Literal(value)
    }
}

impl From<UGenDef> for InputDef {
    fn from(def: UGenDef) -> Self {
        InputDef::Def(Box::new(def))
    }
}

impl From<Vec<UGenDef>> for InputDef {
    fn from(defs: Vec<UGenDef>) -> Self {
        InputDef::Seq(defs)
    }
}
