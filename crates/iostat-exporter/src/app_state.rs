//! Shared state handed to the scrape handlers.

use std::sync::Arc;

use crate::lifecycle::Lifecycle;
use crate::obs::ExporterMetrics;
use crate::store::MetricStore;

#[derive(Clone)]
pub struct AppState {
    store: Arc<MetricStore>,
    metrics: Arc<ExporterMetrics>,
    lifecycle: Lifecycle,
}

impl AppState {
    pub fn new(store: Arc<MetricStore>, metrics: Arc<ExporterMetrics>, lifecycle: Lifecycle) -> Self {
        Self {
            store,
            metrics,
            lifecycle,
        }
    }

    pub fn store(&self) -> Arc<MetricStore> {
        Arc::clone(&self.store)
    }

    pub fn metrics(&self) -> Arc<ExporterMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_terminating(&self) -> bool {
        self.lifecycle.is_terminating()
    }

    /// Full scrape body: iostat gauges first, then exporter metrics.
    pub fn render_metrics(&self) -> String {
        let snapshot = self.store.snapshot();
        let mut out = String::new();
        snapshot.render(&mut out);
        self.metrics.render(snapshot.device_count(), &mut out);
        out
    }
}
