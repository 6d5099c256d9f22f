//! iostat-exporter library entry.
//!
//! This crate wires the sampler, parser, metric store, scheduler, and scrape
//! endpoint into a Prometheus exporter for `iostat -x`. It is intended to be
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod obs;
pub mod ops;
pub mod reload;
pub mod router;
pub mod sampler;
pub mod scheduler;
pub mod store;
