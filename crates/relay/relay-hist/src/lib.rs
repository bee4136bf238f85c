//! Nanosecond latency recording and periodic percentile snapshots.
//!
//! The recorder accumulates clamped samples between snapshot boundaries.
//! `record_with_expected_interval` applies coordinated-omission correction:
//! a sample far above the expected publish interval back-fills the latencies
//! the stalled sender would otherwise have hidden.

mod clock;

pub use clock::{now_ns, unix_millis};

use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub stddev: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub p9999: u64,
    pub count: usize,
}

fn percentile_sorted(sorted: &[u64], pct: f64) -> u64 {
    let len = sorted.len();
    if len == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0 * len as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(len - 1);
    sorted[idx]
}

fn compute_stats(samples: &mut [u64]) -> Stats {
    if samples.is_empty() {
        return Stats::default();
    }
    samples.sort_unstable();

    let count = samples.len();
    let sum: u64 = samples.iter().sum();
    let mean = sum as f64 / count as f64;

    let variance = samples
        .iter()
        .map(|&x| {
            let diff = x as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;

    Stats {
        min: samples[0],
        max: samples[count - 1],
        mean,
        stddev: variance.sqrt(),
        p50: percentile_sorted(samples, 50.0),
        p90: percentile_sorted(samples, 90.0),
        p99: percentile_sorted(samples, 99.0),
        p999: percentile_sorted(samples, 99.9),
        p9999: percentile_sorted(samples, 99.99),
        count,
    }
}

/// A drained snapshot of one recording window.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub stats: Stats,
}

impl Distribution {
    /// Render the percentile table.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        let s = &self.stats;
        writeln!(w, "unit: nanoseconds, samples: {}", s.count)?;
        writeln!(w, "{:>10} {:>14}", "percentile", "value")?;
        for (label, value) in [
            ("min", s.min),
            ("p50", s.p50),
            ("p90", s.p90),
            ("p99", s.p99),
            ("p99.9", s.p999),
            ("p99.99", s.p9999),
            ("max", s.max),
        ] {
            writeln!(w, "{label:>10} {value:>14}")?;
        }
        writeln!(w, "{:>10} {:>14.1}", "mean", s.mean)?;
        writeln!(w, "{:>10} {:>14.1}", "stddev", s.stddev)?;
        Ok(())
    }

    /// Persist one snapshot artifact: `{dir}/{prefix}-{unix_millis}.hgram`.
    pub fn write_file(&self, dir: &Path, prefix: &str) -> io::Result<PathBuf> {
        let path = dir.join(format!("{prefix}-{}.hgram", unix_millis()));
        let mut file = std::fs::File::create(&path)?;
        self.write_to(&mut file)?;
        Ok(path)
    }
}

/// Accumulates round-trip samples between snapshot boundaries.
pub struct LatencyRecorder {
    samples: Vec<u64>,
    max_value_ns: u64,
}

impl LatencyRecorder {
    /// `max_value_ns` clamps every recorded sample, mirroring the harness's
    /// RTT ceiling.
    pub fn new(max_value_ns: u64) -> Self {
        Self {
            samples: Vec::with_capacity(1 << 16),
            max_value_ns,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Record one clamped sample.
    #[inline]
    pub fn record(&mut self, value_ns: u64) {
        self.samples.push(value_ns.min(self.max_value_ns));
    }

    /// Record a sample, back-filling the values a paced sender would have
    /// observed had it not been stalled behind this one.
    #[inline]
    pub fn record_with_expected_interval(&mut self, value_ns: u64, interval_ns: u64) {
        let value = value_ns.min(self.max_value_ns);
        self.samples.push(value);
        if interval_ns == 0 {
            return;
        }
        let mut missing = value.saturating_sub(interval_ns);
        while missing >= interval_ns {
            self.samples.push(missing);
            missing -= interval_ns;
        }
    }

    /// Drain the current window into a percentile distribution and start a
    /// fresh one.
    pub fn snapshot_and_reset(&mut self) -> Distribution {
        let stats = compute_stats(&mut self.samples);
        self.samples.clear();
        Distribution { stats }
    }
}
