//! Usage and cost summaries over execution statistics.

use std::fmt;

use serde::Serialize;

use crate::types::ExecutionStatistics;

const BYTES_PER_TB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

/// Athena list price per TB scanned.
pub const DOLLARS_PER_TB: f64 = 5.0;

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human readable size with 1024-based units, e.g. `1.50 GB`.
///
/// Zero renders as `n/a`; plain byte counts carry no decimals.
pub fn bytes_to_size(bytes: i64) -> String {
    if bytes <= 0 {
        return "n/a".to_string();
    }
    let mut exponent = 0;
    let mut remaining = bytes;
    while remaining >= 1024 && exponent < SIZE_UNITS.len() - 1 {
        remaining /= 1024;
        exponent += 1;
    }
    if exponent == 0 {
        return format!("{} {}", bytes, SIZE_UNITS[0]);
    }
    let scaled = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{:.2} {}", scaled, SIZE_UNITS[exponent])
}

pub fn bytes_to_tb(bytes: i64) -> f64 {
    if bytes > 0 {
        bytes as f64 / BYTES_PER_TB
    } else {
        0.0
    }
}

/// List-price cost in USD of scanning `tb` terabytes.
pub fn tb_to_dollars(tb: f64) -> f64 {
    tb * DOLLARS_PER_TB
}

/// Dollar amount for `tb` terabytes scanned: two decimals above one dollar,
/// eight below so small queries do not all show as `$ 0.00`.
pub fn format_cost(tb: f64) -> String {
    let dollars = tb_to_dollars(tb);
    if dollars > 1.0 {
        format!("$ {:.2}", dollars)
    } else {
        format!("$ {:.8}", dollars)
    }
}

/// Whole minutes in `ms`, after rounding to the nearest second.
pub fn millis_to_minutes(ms: i64) -> i64 {
    let seconds = (ms.max(0) + 500) / 1000;
    seconds / 60
}

/// Totals over a set of executions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub executions: usize,
    pub data_scanned_bytes: i64,
    pub engine_execution_time_ms: i64,
}

impl UsageSummary {
    pub fn from_statistics(stats: &[ExecutionStatistics]) -> Self {
        Self {
            executions: stats.len(),
            data_scanned_bytes: stats.iter().map(|s| s.data_scanned_bytes.max(0)).sum(),
            engine_execution_time_ms: stats
                .iter()
                .map(|s| s.engine_execution_time_ms.max(0))
                .sum(),
        }
    }

    pub fn data_scanned(&self) -> String {
        bytes_to_size(self.data_scanned_bytes)
    }

    pub fn total_cost(&self) -> String {
        format_cost(bytes_to_tb(self.data_scanned_bytes))
    }

    pub fn total_minutes(&self) -> i64 {
        millis_to_minutes(self.engine_execution_time_ms)
    }
}

impl fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} executions | {} scanned | {} min | {}",
            self.executions,
            self.data_scanned(),
            self.total_minutes(),
            self.total_cost(),
        )
    }
}
