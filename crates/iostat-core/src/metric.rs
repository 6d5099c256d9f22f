//! Metric catalogue and the per-device sample row.

use serde::Deserialize;

/// One of the ten per-device measurements reported by `iostat -x`.
///
/// The declaration order is the catalogue order: it matches the default
/// column layout and the order metrics are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Rs,
    Ws,
    Krs,
    Kws,
    Msr,
    Msw,
    Mso,
    Mst,
    Qlen,
    Busy,
}

impl Metric {
    /// Number of metrics in the catalogue.
    pub const COUNT: usize = 10;

    /// All metrics in catalogue order.
    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::Rs,
        Metric::Ws,
        Metric::Krs,
        Metric::Kws,
        Metric::Msr,
        Metric::Msw,
        Metric::Mso,
        Metric::Mst,
        Metric::Qlen,
        Metric::Busy,
    ];

    /// Exposition name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Rs => "iostat_rs",
            Metric::Ws => "iostat_ws",
            Metric::Krs => "iostat_krs",
            Metric::Kws => "iostat_kws",
            Metric::Msr => "iostat_msr",
            Metric::Msw => "iostat_msw",
            Metric::Mso => "iostat_mso",
            Metric::Mst => "iostat_mst",
            Metric::Qlen => "iostat_qlen",
            Metric::Busy => "iostat_busy",
        }
    }

    /// Help text rendered next to the metric.
    pub fn help(self) -> &'static str {
        match self {
            Metric::Rs => "Reads per second",
            Metric::Ws => "Writes per second",
            Metric::Krs => "Kilobytes read per second",
            Metric::Kws => "Kilobytes written per second",
            Metric::Msr => "Milliseconds per read",
            Metric::Msw => "Milliseconds per write",
            Metric::Mso => "Milliseconds per operation",
            Metric::Mst => "Milliseconds per transaction",
            Metric::Qlen => "Queue length",
            Metric::Busy => "Busy percent",
        }
    }

    /// Column key as written in configuration (`rs`, `qlen`, ...).
    pub fn key(self) -> &'static str {
        // the exposition name is always `iostat_<key>`
        &self.name()["iostat_".len()..]
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// One parsed measurement row for a single device.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub device: String,
    pub reads_per_sec: f64,
    pub writes_per_sec: f64,
    pub kb_read_per_sec: f64,
    pub kb_written_per_sec: f64,
    pub ms_per_read: f64,
    pub ms_per_write: f64,
    pub ms_per_op: f64,
    pub ms_per_transaction: f64,
    pub queue_length: f64,
    pub busy_percent: f64,
}

impl Sample {
    /// Build a sample from values given in catalogue order.
    pub fn from_values(device: impl Into<String>, v: [f64; Metric::COUNT]) -> Self {
        Self {
            device: device.into(),
            reads_per_sec: v[Metric::Rs.index()],
            writes_per_sec: v[Metric::Ws.index()],
            kb_read_per_sec: v[Metric::Krs.index()],
            kb_written_per_sec: v[Metric::Kws.index()],
            ms_per_read: v[Metric::Msr.index()],
            ms_per_write: v[Metric::Msw.index()],
            ms_per_op: v[Metric::Mso.index()],
            ms_per_transaction: v[Metric::Mst.index()],
            queue_length: v[Metric::Qlen.index()],
            busy_percent: v[Metric::Busy.index()],
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rs => self.reads_per_sec,
            Metric::Ws => self.writes_per_sec,
            Metric::Krs => self.kb_read_per_sec,
            Metric::Kws => self.kb_written_per_sec,
            Metric::Msr => self.ms_per_read,
            Metric::Msw => self.ms_per_write,
            Metric::Mso => self.ms_per_op,
            Metric::Mst => self.ms_per_transaction,
            Metric::Qlen => self.queue_length,
            Metric::Busy => self.busy_percent,
        }
    }

    /// `(metric, value)` pairs in catalogue order.
    pub fn values(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL.into_iter().map(move |m| (m, self.value(m)))
    }
}
