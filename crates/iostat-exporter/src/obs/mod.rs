//! In-process metrics about the exporter itself.
//!
//! Stored as atomics and rendered after the iostat gauges by the `/metrics`
//! handler, so a stale table can be told apart from a failing sampler.

pub mod metrics;

pub use metrics::ExporterMetrics;
