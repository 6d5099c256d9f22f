//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over the configured level. In the foreground logs go to
//! stderr; otherwise they are appended to the configured log file.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use iostat_core::error::{IostatError, Result};

use crate::config::LogSection;

pub fn init(log: &LogSection, foreground: bool) -> Result<()> {
    let level = log.level()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));
    let builder = fmt().with_env_filter(filter);

    let installed = match (&log.file, foreground) {
        (Some(path), false) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    IostatError::Config(format!("cannot open log file {}: {e}", path.display()))
                })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        _ => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| IostatError::Internal(format!("logging init failed: {e}")))
}
