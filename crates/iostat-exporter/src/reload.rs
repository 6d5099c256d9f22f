//! SIGHUP reload backed by the config file and command-line overrides.
//!
//! Interval, sampler and parser settings are swapped in place. The listen
//! address, logging and process identity are fixed at startup; changes to
//! them are reported and otherwise ignored until the next restart.

use async_trait::async_trait;

use iostat_core::error::Result;

use crate::config::{ConfigSource, ExporterConfig};
use crate::scheduler::{Reload, TickSettings};

pub struct ConfigReloader {
    source: ConfigSource,
    active: ExporterConfig,
}

impl ConfigReloader {
    pub fn new(source: ConfigSource, active: ExporterConfig) -> Self {
        Self { source, active }
    }

    pub fn active(&self) -> &ExporterConfig {
        &self.active
    }
}

#[async_trait]
impl Reload for ConfigReloader {
    async fn reload(&mut self) -> Result<TickSettings> {
        let next = self.source.load_async().await?;
        let settings = TickSettings::from_config(&next)?;

        if next.exporter.listen != self.active.exporter.listen {
            tracing::warn!(
                current = %self.active.exporter.listen,
                requested = %next.exporter.listen,
                "listen address changes need a restart"
            );
        }
        if next.log != self.active.log {
            tracing::warn!("log settings change needs a restart");
        }
        if next.process != self.active.process {
            tracing::warn!("process identity change needs a restart");
        }

        self.active.exporter.interval_secs = next.exporter.interval_secs;
        self.active.sampler = next.sampler;
        self.active.parser = next.parser;
        Ok(settings)
    }
}
