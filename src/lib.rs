//! Multi-level set-associative cache behavior simulator.
//!
//! Models an instruction cache, a data cache and a shared L2 behind them,
//! tracking hits, misses and timing penalties for a stream of memory
//! accesses. The L2 can optionally enforce inclusion of both first-level
//! caches.

pub mod cache;
pub mod geometry;
pub mod hierarchy;
pub mod trace;
