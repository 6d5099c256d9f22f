//! iostat core: the metric catalogue, per-device samples, and the text parser.
//!
//! This crate knows how to turn the tabular output of `iostat -x` into typed
//! samples. It carries no runtime or transport dependencies so the parser can
//! be exercised on canned text without spawning anything.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! A malformed row surfaces as `IostatError::Parse` for that row only.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;
pub mod parser;

/// Shared result type.
pub use error::{ErrorKind, IostatError, Result};
pub use metric::{Metric, Sample};
pub use parser::Parser;
