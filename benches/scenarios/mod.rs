//! Real-world scenario benchmarks.
//!
//! These build complete graphs from JSON definitions, the way an application
//! would, and time whole blocks through `Graph::generate`.

mod graph;
mod rebind;

pub use graph::bench_graphs;
pub use rebind::bench_rebind;
