//! The sampling loop.
//!
//! States: `Running` (waiting for the next tick), `Sampling` (one
//! sample-parse-record cycle), `Terminating`, `Stopped`. A cycle that has
//! started always runs to completion, so once termination is requested at
//! most one more cycle runs. The current state is published on a watch
//! channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use iostat_core::error::{ErrorKind, Result};
use iostat_core::Parser;

use crate::config::ExporterConfig;
use crate::lifecycle::Lifecycle;
use crate::obs::ExporterMetrics;
use crate::sampler::{CommandSampler, Sampler};
use crate::store::MetricStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Sampling,
    Terminating,
    Stopped,
}

/// Everything a reload is allowed to replace.
#[derive(Clone)]
pub struct TickSettings {
    pub interval: Duration,
    pub sampler: Arc<dyn Sampler>,
    pub parser: Parser,
}

impl TickSettings {
    pub fn from_config(cfg: &ExporterConfig) -> Result<Self> {
        Ok(Self {
            interval: cfg.exporter.interval(),
            sampler: Arc::new(CommandSampler::from_config(cfg)),
            parser: cfg.parser.build()?,
        })
    }
}

/// Produces fresh settings when a reload is requested.
#[async_trait]
pub trait Reload: Send + Sync {
    async fn reload(&mut self) -> Result<TickSettings>;
}

/// Outcome of one sampling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub samples: usize,
    pub rejected: usize,
    pub failure: Option<ErrorKind>,
}

pub struct Scheduler {
    settings: TickSettings,
    store: Arc<MetricStore>,
    metrics: Arc<ExporterMetrics>,
    lifecycle: Lifecycle,
    reloader: Option<Box<dyn Reload>>,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        settings: TickSettings,
        store: Arc<MetricStore>,
        metrics: Arc<ExporterMetrics>,
        lifecycle: Lifecycle,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Running);
        Self {
            settings,
            store,
            metrics,
            lifecycle,
            reloader: None,
            state,
        }
    }

    pub fn with_reloader(mut self, reloader: impl Reload + 'static) -> Self {
        self.reloader = Some(Box::new(reloader));
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Run until termination is requested.
    pub async fn run(mut self) {
        tracing::info!(
            interval_secs = self.settings.interval.as_secs(),
            device_prefix = self.settings.parser.device_prefix(),
            "service running"
        );
        let mut ticker = new_ticker(self.settings.interval);

        loop {
            self.set_state(SchedulerState::Running);
            if self.lifecycle.is_terminating() {
                break;
            }

            let woken = tokio::select! {
                _ = ticker.tick() => false,
                _ = self.lifecycle.woken() => true,
            };
            if woken {
                if self.lifecycle.is_terminating() {
                    break;
                }
                if self.lifecycle.take_reload() && self.reload().await {
                    ticker = new_ticker(self.settings.interval);
                }
                continue;
            }

            self.set_state(SchedulerState::Sampling);
            self.tick().await;

            if self.lifecycle.is_terminating() {
                break;
            }
        }

        self.set_state(SchedulerState::Terminating);
        self.metrics.set_terminating();
        tracing::info!("shutting down due to user request");
        self.set_state(SchedulerState::Stopped);
    }

    /// One sample-parse-record cycle.
    pub async fn tick(&self) -> TickReport {
        self.metrics.ticks.inc(&[]);

        let started = Instant::now();
        let result = self.settings.sampler.sample().await;
        self.metrics.sample_duration.observe(&[], started.elapsed());

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                let kind = e.kind();
                self.metrics.sample_failures.inc(&[("reason", kind.as_str())]);
                tracing::warn!(error = %e, reason = kind.as_str(), "sampling failed, keeping previous values");
                return TickReport {
                    failure: Some(kind),
                    ..TickReport::default()
                };
            }
        };

        let mut report = TickReport::default();
        for row in self.settings.parser.parse(&raw) {
            match row {
                Ok(sample) => {
                    self.store.record(&sample);
                    report.samples += 1;
                }
                Err(e) => {
                    self.metrics.rows_rejected.inc(&[]);
                    report.rejected += 1;
                    tracing::warn!(error = %e, "rejected device row");
                }
            }
        }

        if report.samples == 0 {
            tracing::debug!(
                device_prefix = self.settings.parser.device_prefix(),
                "no device rows in sampler output"
            );
        } else {
            tracing::debug!(samples = report.samples, rejected = report.rejected, "tick complete");
        }
        report
    }

    /// Returns true when the tick interval changed.
    async fn reload(&mut self) -> bool {
        let Some(reloader) = self.reloader.as_mut() else {
            tracing::info!("reload requested but no configuration source is attached");
            return false;
        };

        match reloader.reload().await {
            Ok(next) => {
                self.metrics.reloads.inc(&[("result", "ok")]);
                let changed = next.interval != self.settings.interval;
                tracing::info!(
                    interval_secs = next.interval.as_secs(),
                    device_prefix = next.parser.device_prefix(),
                    "configuration reloaded"
                );
                self.settings = next;
                changed
            }
            Err(e) => {
                self.metrics.reloads.inc(&[("result", "error")]);
                tracing::error!(error = %e, "reload failed, keeping previous settings");
                false
            }
        }
    }

    fn set_state(&self, next: SchedulerState) {
        self.state.send_replace(next);
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut t = interval_at(Instant::now() + period, period);
    t.set_missed_tick_behavior(MissedTickBehavior::Delay);
    t
}
