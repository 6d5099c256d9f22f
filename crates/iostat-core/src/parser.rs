//! `iostat -x` text parsing (panic-free).
//!
//! Parsing rules:
//! - Only lines starting with the device prefix are candidates; everything
//!   else (headers, blank lines, other device classes) is noise.
//! - A candidate with the wrong number of fields is skipped, not reported.
//! - A candidate with the right shape but a bad value fails for that row only.

use std::collections::BTreeSet;

use crate::error::{IostatError, Result};
use crate::metric::{Metric, Sample};

/// Device prefix used by FreeBSD's ATA direct-access driver.
pub const DEFAULT_DEVICE_PREFIX: &str = "ada";

/// Turns raw tool output into samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Parser {
    device_prefix: String,
    columns: Vec<Metric>,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            device_prefix: DEFAULT_DEVICE_PREFIX.to_string(),
            columns: Metric::ALL.to_vec(),
        }
    }
}

impl Parser {
    /// Build a parser for a device prefix and a column schema.
    ///
    /// `columns` lists the metric carried by each numeric column, left to
    /// right; it must name every metric exactly once.
    pub fn new(device_prefix: impl Into<String>, columns: Vec<Metric>) -> Result<Self> {
        let device_prefix = device_prefix.into();
        if device_prefix.trim().is_empty() {
            return Err(IostatError::Config("device prefix must not be empty".into()));
        }
        if device_prefix.chars().any(char::is_whitespace) {
            return Err(IostatError::Config(
                "device prefix must not contain whitespace".into(),
            ));
        }

        let distinct: BTreeSet<Metric> = columns.iter().copied().collect();
        if columns.len() != Metric::COUNT || distinct.len() != Metric::COUNT {
            return Err(IostatError::Config(format!(
                "columns must list each of the {} metrics exactly once",
                Metric::COUNT
            )));
        }

        Ok(Self {
            device_prefix,
            columns,
        })
    }

    pub fn device_prefix(&self) -> &str {
        &self.device_prefix
    }

    pub fn columns(&self) -> &[Metric] {
        &self.columns
    }

    /// Device name plus one field per column.
    pub fn expected_fields(&self) -> usize {
        1 + self.columns.len()
    }

    /// Parse a whole tool run. Items come out in source line order; rows that
    /// are not data rows produce no item at all.
    pub fn parse<'a>(&'a self, raw: &'a str) -> impl Iterator<Item = Result<Sample>> + 'a {
        raw.lines()
            .enumerate()
            .filter_map(move |(idx, line)| self.parse_line(idx + 1, line))
    }

    /// Parse one line. `None` means the line is not a data row.
    pub fn parse_line(&self, line_no: usize, line: &str) -> Option<Result<Sample>> {
        let line = line.trim();
        if !line.starts_with(self.device_prefix.as_str()) {
            return None;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != self.expected_fields() {
            tracing::trace!(
                line = line_no,
                fields = fields.len(),
                expected = self.expected_fields(),
                "skipping row with unexpected field count"
            );
            return None;
        }

        let (device, rest) = fields.split_first()?;
        let mut values = [0.0; Metric::COUNT];
        for (metric, raw) in self.columns.iter().zip(rest) {
            match parse_value(raw) {
                Ok(v) => values[metric.index()] = v,
                Err(reason) => {
                    return Some(Err(IostatError::Parse {
                        line: line_no,
                        reason: format!("{device} {} column {raw:?}: {reason}", metric.key()),
                    }))
                }
            }
        }

        Some(Ok(Sample::from_values(*device, values)))
    }
}

fn parse_value(raw: &str) -> std::result::Result<f64, &'static str> {
    let v: f64 = raw.parse().map_err(|_| "not a number")?;
    if !v.is_finite() {
        return Err("not finite");
    }
    if v < 0.0 {
        return Err("negative");
    }
    Ok(v)
}
