//! Benchmarks for low-level generation primitives.

mod mul_add;
mod segment;

pub use mul_add::bench_mul_add;
pub use segment::bench_segment;
