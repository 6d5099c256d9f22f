//! Latest-value table for the iostat gauges.
//!
//! One `RwLock` guards the whole table: the scheduler is the only writer and
//! writes a sample's ten cells under a single guard, so a scrape always sees
//! whole rows. Cells are never removed; a device that stops reporting keeps
//! its last value.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{PoisonError, RwLock};

use iostat_core::{Metric, Sample};

use crate::obs::metrics::escape_label;

type Table = BTreeMap<Metric, BTreeMap<String, f64>>;

#[derive(Default)]
pub struct MetricStore {
    table: RwLock<Table>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point update of one cell.
    pub fn set(&self, metric: Metric, device: &str, value: f64) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        insert(&mut table, metric, device, value);
    }

    /// Write all ten cells of a sample at once.
    pub fn record(&self, sample: &Sample) {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        for (metric, value) in sample.values() {
            insert(&mut table, metric, &sample.device, value);
        }
    }

    pub fn get(&self, metric: Metric, device: &str) -> Option<f64> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.get(&metric).and_then(|m| m.get(device)).copied()
    }

    /// Owned copy of the whole table.
    pub fn snapshot(&self) -> Snapshot {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Snapshot {
            table: table.clone(),
        }
    }
}

fn insert(table: &mut Table, metric: Metric, device: &str, value: f64) {
    let devices = table.entry(metric).or_default();
    match devices.get_mut(device) {
        Some(cell) => *cell = value,
        None => {
            devices.insert(device.to_string(), value);
        }
    }
}

/// Point-in-time copy of the store, sorted by metric then device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    table: Table,
}

impl Snapshot {
    pub fn get(&self, metric: Metric, device: &str) -> Option<f64> {
        self.table.get(&metric).and_then(|m| m.get(device)).copied()
    }

    /// Distinct devices seen for any metric.
    pub fn device_count(&self) -> usize {
        let mut devices: Vec<&str> = self
            .table
            .values()
            .flat_map(|m| m.keys().map(String::as_str))
            .collect();
        devices.sort_unstable();
        devices.dedup();
        devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.values().all(BTreeMap::is_empty)
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        for metric in Metric::ALL {
            let name = metric.name();
            let _ = writeln!(out, "# HELP {} {}", name, metric.help());
            let _ = writeln!(out, "# TYPE {} gauge", name);
            let Some(devices) = self.table.get(&metric) else {
                continue;
            };
            for (device, value) in devices {
                let _ = writeln!(out, "{}{{device=\"{}\"}} {:?}", name, escape_label(device), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_writes_every_metric() {
        let store = MetricStore::new();
        store.record(&Sample::from_values("ada0", [1., 2., 3., 4., 5., 6., 7., 8., 9., 10.]));
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            assert_eq!(store.get(metric, "ada0"), Some((i + 1) as f64));
        }
        assert_eq!(store.get(Metric::Rs, "ada1"), None);
    }

    #[test]
    fn stale_devices_are_kept() {
        let store = MetricStore::new();
        store.set(Metric::Busy, "ada0", 20.0);
        store.set(Metric::Busy, "ada1", 5.0);
        store.set(Metric::Busy, "ada1", 6.0);
        let snap = store.snapshot();
        assert_eq!(snap.get(Metric::Busy, "ada0"), Some(20.0));
        assert_eq!(snap.get(Metric::Busy, "ada1"), Some(6.0));
        assert_eq!(snap.device_count(), 2);
    }

    #[test]
    fn render_emits_help_type_and_escaped_labels() {
        let store = MetricStore::new();
        store.set(Metric::Qlen, "we\"ird", 0.5);
        let mut out = String::new();
        store.snapshot().render(&mut out);
        assert!(out.contains("# HELP iostat_qlen Queue length\n"));
        assert!(out.contains("# TYPE iostat_rs gauge\n"));
        assert!(out.contains("iostat_qlen{device=\"we\\\"ird\"} 0.5\n"));
    }

    #[test]
    fn empty_snapshot_still_declares_metrics() {
        let snap = MetricStore::new().snapshot();
        assert!(snap.is_empty());
        let mut out = String::new();
        snap.render(&mut out);
        assert_eq!(out.lines().count(), 2 * Metric::COUNT);
    }
}
