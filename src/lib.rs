pub mod config; // Sample rate, control period, channel count
pub mod def; // Declarative graph definitions
pub mod dsp; // Segment generators and envelopes
pub mod error;
pub mod graph; // Live unit generator graphs
#[cfg(feature = "rtrb")]
pub mod handle; // Lock-free value updates between blocks
pub mod rate;
pub mod registry; // Type identifier -> constructor lookup
pub mod ugen; // Unit generator contract and built-in kinds

pub use config::EngineConfig;
pub use def::{InputDef, UGenDef};
pub use error::GraphError;
pub use graph::{Graph, InputValue, NodeId};
#[cfg(feature = "rtrb")]
pub use handle::ValueHandle;
pub use rate::Rate;

pub const MAX_BLOCK_SIZE: usize = 2048;
