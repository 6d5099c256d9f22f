//! Sampling loop behaviour: cycles, termination, stale values, reload.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use iostat_core::error::{IostatError, Result};
use iostat_core::{Metric, Parser};
use iostat_exporter::lifecycle::Lifecycle;
use iostat_exporter::obs::ExporterMetrics;
use iostat_exporter::scheduler::{Reload, Scheduler, SchedulerState, TickSettings};
use iostat_exporter::store::MetricStore;

use canned_sampler::CannedSampler;

const END_TO_END: &str = "Device r/s w/s kr/s kw/s ms/r ms/w ms/o ms/t qlen %b\n\
ada0 10.0 5.0 100.0 50.0 1.0 2.0 0.5 0.5 1.0 20.0\n";

struct Harness {
    store: Arc<MetricStore>,
    metrics: Arc<ExporterMetrics>,
    lifecycle: Lifecycle,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(MetricStore::new()),
            metrics: Arc::new(ExporterMetrics::new()),
            lifecycle: Lifecycle::new(),
        }
    }

    fn scheduler(&self, sampler: Arc<CannedSampler>, interval: Duration) -> Scheduler {
        let settings = TickSettings {
            interval,
            sampler,
            parser: Parser::default(),
        };
        Scheduler::new(
            settings,
            Arc::clone(&self.store),
            Arc::clone(&self.metrics),
            self.lifecycle.clone(),
        )
    }
}

#[tokio::test]
async fn end_to_end_tick_fills_every_metric() {
    let h = Harness::new();
    let sched = h.scheduler(Arc::new(CannedSampler::repeating(END_TO_END)), Duration::from_secs(30));

    let report = sched.tick().await;
    assert_eq!(report.samples, 1);
    assert_eq!(report.rejected, 0);
    assert!(report.failure.is_none());

    let expected = [10.0, 5.0, 100.0, 50.0, 1.0, 2.0, 0.5, 0.5, 1.0, 20.0];
    for (metric, want) in Metric::ALL.into_iter().zip(expected) {
        assert_eq!(h.store.get(metric, "ada0"), Some(want), "{}", metric.name());
    }
}

#[tokio::test]
async fn identical_input_is_idempotent() {
    let h = Harness::new();
    let sched = h.scheduler(Arc::new(CannedSampler::repeating(END_TO_END)), Duration::from_secs(30));

    sched.tick().await;
    let first = h.store.snapshot();
    sched.tick().await;
    assert_eq!(h.store.snapshot(), first);
    assert_eq!(h.metrics.ticks.get(&[]), 2);
}

#[tokio::test]
async fn later_row_for_the_same_device_wins() {
    let h = Harness::new();
    let raw = "ada0 1 1 1 1 1 1 1 1 1 1\nada0 2 3 4 5 6 7 8 9 10 11\n";
    let sched = h.scheduler(Arc::new(CannedSampler::repeating(raw)), Duration::from_secs(30));

    let report = sched.tick().await;
    assert_eq!(report.samples, 2);

    let snap = h.store.snapshot();
    assert_eq!(snap.device_count(), 1);
    for (metric, want) in Metric::ALL.iter().zip(2..=11) {
        assert_eq!(h.store.get(*metric, "ada0"), Some(f64::from(want)), "{metric:?}");
    }
}

#[tokio::test]
async fn bad_rows_and_wrong_shapes_leave_other_cells_alone() {
    let h = Harness::new();
    let sampler = CannedSampler::repeating("")
        .then(Ok("ada0 1 1 1 1 1 1 1 1 1 1\nada1 1 1 1 1 1 1 1 1 1 1\n".into()))
        .then(Ok("ada0 2 2 2 2 2 2 2 2 2\nada1 x 2 2 2 2 2 2 2 2 2\nada2 3 3 3 3 3 3 3 3 3 3\n".into()));
    let sched = h.scheduler(Arc::new(sampler), Duration::from_secs(30));

    sched.tick().await;
    let report = sched.tick().await;
    assert_eq!(report.samples, 1);
    assert_eq!(report.rejected, 1);

    // 10-field row ignored, bad row rejected, both keep the first cycle's values
    assert_eq!(h.store.get(Metric::Rs, "ada0"), Some(1.0));
    assert_eq!(h.store.get(Metric::Busy, "ada1"), Some(1.0));
    assert_eq!(h.store.get(Metric::Rs, "ada2"), Some(3.0));
    assert_eq!(h.metrics.rows_rejected.get(&[]), 1);
}

#[tokio::test]
async fn sampler_failure_keeps_stale_values() {
    let h = Harness::new();
    let sampler = CannedSampler::repeating(END_TO_END)
        .then(Ok(END_TO_END.into()))
        .then(Err(IostatError::SamplerTimeout(Duration::from_secs(10))))
        .then(Err(IostatError::ExitStatus {
            code: Some(1),
            stderr: "iostat: kvm_read".into(),
        }));
    let sched = h.scheduler(Arc::new(sampler), Duration::from_secs(30));

    sched.tick().await;
    let before = h.store.snapshot();

    let report = sched.tick().await;
    assert_eq!(report.failure.map(|k| k.as_str()), Some("timeout"));
    let report = sched.tick().await;
    assert_eq!(report.failure.map(|k| k.as_str()), Some("exit_status"));

    assert_eq!(h.store.snapshot(), before);
    assert_eq!(h.metrics.sample_failures.get(&[("reason", "timeout")]), 1);
    assert_eq!(h.metrics.sample_failures.get(&[("reason", "exit_status")]), 1);
    assert_eq!(h.metrics.sample_duration.count(&[]), 3);
}

#[tokio::test(start_paused = true)]
async fn terminate_before_start_runs_no_cycle() {
    let h = Harness::new();
    let sampler = Arc::new(CannedSampler::repeating(END_TO_END));
    let sched = h.scheduler(Arc::clone(&sampler), Duration::from_secs(30));
    let state = sched.subscribe();

    h.lifecycle.request_terminate();
    sched.run().await;

    assert_eq!(sampler.calls(), 0);
    assert_eq!(*state.borrow(), SchedulerState::Stopped);
    assert!(h.metrics.is_terminating());
}

#[tokio::test(start_paused = true)]
async fn terminate_mid_cycle_finishes_that_cycle_only() {
    let h = Harness::new();
    let lifecycle = h.lifecycle.clone();
    let sampler = Arc::new(CannedSampler::repeating(END_TO_END).on_call(move |n| {
        if n == 2 {
            lifecycle.request_terminate();
        }
    }));
    let sched = h.scheduler(Arc::clone(&sampler), Duration::from_secs(30));
    let state = sched.subscribe();

    sched.run().await;

    // the cycle during which terminate arrived still recorded its rows
    assert_eq!(sampler.calls(), 2);
    assert_eq!(h.store.get(Metric::Busy, "ada0"), Some(20.0));
    assert_eq!(*state.borrow(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn terminate_while_waiting_stops_without_sampling() {
    let h = Harness::new();
    let sampler = Arc::new(CannedSampler::repeating(END_TO_END));
    let sched = h.scheduler(Arc::clone(&sampler), Duration::from_secs(30));
    let mut state = sched.subscribe();
    let task = tokio::spawn(sched.run());

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert_eq!(sampler.calls(), 1);
    assert_eq!(*state.borrow_and_update(), SchedulerState::Running);

    h.lifecycle.request_terminate();
    task.await.unwrap();

    assert_eq!(sampler.calls(), 1);
    assert_eq!(*state.borrow(), SchedulerState::Stopped);
}

struct StaticReload {
    next: Option<Result<TickSettings>>,
}

#[async_trait]
impl Reload for StaticReload {
    async fn reload(&mut self) -> Result<TickSettings> {
        self.next
            .take()
            .unwrap_or_else(|| Err(IostatError::Config("already reloaded".into())))
    }
}

#[tokio::test(start_paused = true)]
async fn reload_swaps_parser_and_interval() {
    let h = Harness::new();
    let old = Arc::new(CannedSampler::repeating(END_TO_END));
    let new = Arc::new(CannedSampler::repeating("da7 1 2 3 4 5 6 7 8 9 10\n"));
    let next = TickSettings {
        interval: Duration::from_secs(5),
        sampler: new.clone(),
        parser: Parser::new("da", Metric::ALL.to_vec()).unwrap(),
    };
    let sched = h
        .scheduler(Arc::clone(&old), Duration::from_secs(30))
        .with_reloader(StaticReload {
            next: Some(Ok(next)),
        });
    let task = tokio::spawn(sched.run());

    h.lifecycle.request_reload();
    tokio::time::sleep(Duration::from_secs(12)).await;
    h.lifecycle.request_terminate();
    task.await.unwrap();

    assert_eq!(old.calls(), 0);
    assert_eq!(new.calls(), 2);
    assert_eq!(h.store.get(Metric::Rs, "da7"), Some(1.0));
    assert_eq!(h.metrics.reloads.get(&[("result", "ok")]), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_reload_keeps_previous_settings() {
    let h = Harness::new();
    let sampler = Arc::new(CannedSampler::repeating(END_TO_END));
    let sched = h
        .scheduler(Arc::clone(&sampler), Duration::from_secs(30))
        .with_reloader(StaticReload {
            next: Some(Err(IostatError::Config("invalid yaml".into()))),
        });
    let task = tokio::spawn(sched.run());

    h.lifecycle.request_reload();
    tokio::time::sleep(Duration::from_secs(31)).await;
    h.lifecycle.request_terminate();
    task.await.unwrap();

    assert_eq!(sampler.calls(), 1);
    assert_eq!(h.store.get(Metric::Rs, "ada0"), Some(10.0));
    assert_eq!(h.metrics.reloads.get(&[("result", "error")]), 1);
}
