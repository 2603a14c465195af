//! Lightweight in-process metrics (dependency-free).
//!
//! Counters for bus traffic, drops, and pipeline failures. Hosting processes
//! expose `NodeMetrics::render()` on whatever endpoint they already serve.

pub mod metrics;

pub use metrics::NodeMetrics;
