//! Offline rendering: run a graph block by block into per-channel buffers.

use std::{fmt, str::FromStr};

use color_eyre::eyre::{eyre, Report};
use saavy_ugen::{EngineConfig, Graph, GraphError, InputDef, UGenDef};

/// A `path=value` rebind from the command line. The value is JSON: a number
/// or a definition.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub path: String,
    pub value: InputDef,
}

impl FromStr for Assignment {
    type Err = Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, value) = s
            .split_once('=')
            .ok_or_else(|| eyre!("expected PATH=VALUE, got `{s}`"))?;
        let value = serde_json::from_str(value.trim())
            .map_err(|err| eyre!("`{value}` is not a number or a definition: {err}"))?;
        Ok(Self {
            path: path.trim().to_string(),
            value,
        })
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=", self.path)?;
        match serde_json::to_string(&self.value) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("?"),
        }
    }
}

pub struct Renderer {
    graph: Graph,
}

impl Renderer {
    pub fn new(def: &UGenDef, config: EngineConfig) -> Result<Self, GraphError> {
        Ok(Self {
            graph: Graph::build(def, config)?,
        })
    }

    pub fn apply(&mut self, assignment: &Assignment) -> Result<(), GraphError> {
        self.graph.set(&assignment.path, assignment.value.clone())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Render `seconds` of audio, one `Vec` per output channel.
    pub fn render(&mut self, seconds: f64) -> Vec<Vec<f32>> {
        let config = *self.graph.config();
        let total = (seconds.max(0.0) * config.sample_rate as f64).round() as usize;
        let channels = self.graph.channels();
        let mut out = vec![Vec::with_capacity(total); channels];

        let mut rendered = 0;
        while rendered < total {
            let n = (total - rendered).min(config.block_size);
            self.graph.generate(n);
            for (channel, samples) in out.iter_mut().enumerate() {
                if let Some(block) = self.graph.channel(channel) {
                    samples.extend_from_slice(&block[..n]);
                }
            }
            rendered += n;
        }
        out
    }
}
