//! Per-run analytics: row totals, counters by rejection reason, elapsed time.

use crate::error::RejectionKind;
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;
use strum::IntoEnumIterator;

/// Aggregate counters and timing for one import run.
///
/// Created with all counters at zero, mutated by the single-threaded
/// ingest pass, folded with the save-phase failure sum after the worker
/// join, and read once at the end of the run. The save workers never touch
/// it; they report their own counts and the run driver combines them, so
/// no synchronization is needed.
///
/// Invariant once the run completes: `accepted + rejected == total_rows`,
/// and the per-kind counts sum to `rejected`.
#[derive(Debug)]
pub struct RunAnalytics {
    total_rows: u64,
    accepted: u64,
    rejected: u64,
    elapsed: Duration,
    rejections: HashMap<RejectionKind, u64>,
}

impl RunAnalytics {
    /// Creates a fresh analytics record with every counter at zero.
    pub fn new() -> Self {
        let mut rejections = HashMap::new();
        for kind in RejectionKind::iter() {
            rejections.insert(kind, 0);
        }

        RunAnalytics {
            total_rows: 0,
            accepted: 0,
            rejected: 0,
            elapsed: Duration::ZERO,
            rejections,
        }
    }

    /// Counts one data row, regardless of its eventual outcome.
    pub fn record_row(&mut self) {
        self.total_rows += 1;
    }

    /// Counts one accepted row.
    pub fn record_accepted(&mut self) {
        self.accepted += 1;
    }

    /// Counts one rejected row under the given kind.
    pub fn record_rejection(&mut self, kind: RejectionKind) {
        self.rejected += 1;
        *self.rejections.entry(kind).or_insert(0) += 1;
    }

    /// Folds the save-phase failure sum into the counters.
    ///
    /// Each failure demotes one previously accepted record, so `failures`
    /// must not exceed the accepted count. Called exactly once, after all
    /// save workers have joined.
    pub fn record_save_failures(&mut self, failures: u64) {
        if failures == 0 {
            return;
        }

        *self
            .rejections
            .entry(RejectionKind::DatabaseSave)
            .or_insert(0) += failures;
        self.accepted -= failures;
        self.rejected += failures;
    }

    /// Sets the wall-clock duration of the run.
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// Number of data rows seen (the header is never counted).
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Number of records that were validated and persisted.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Number of rows dropped, including save-phase failures.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Wall-clock duration from run start to completion of the save join.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Count for a single rejection kind.
    pub fn rejection_count(&self, kind: RejectionKind) -> u64 {
        self.rejections.get(&kind).copied().unwrap_or(0)
    }

    /// Sum of all per-kind rejection counts.
    pub fn total_rejections(&self) -> u64 {
        RejectionKind::iter().map(|k| self.rejection_count(k)).sum()
    }

    /// Writes the run summary.
    ///
    /// Every rejection kind is listed in enum order, zeros included, so
    /// the output shape is deterministic.
    pub fn write_summary<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writeln!(writer, "rows processed: {}", self.total_rows)?;
        writeln!(writer, "accepted:       {}", self.accepted)?;
        writeln!(writer, "rejected:       {}", self.rejected)?;
        writeln!(writer, "elapsed:        {:.3}s", self.elapsed.as_secs_f64())?;
        writeln!(writer)?;
        writeln!(writer, "rejections by reason:")?;
        for kind in RejectionKind::iter() {
            writeln!(
                writer,
                "  {:<25} {}",
                format!("{}:", kind),
                self.rejection_count(kind)
            )?;
        }
        Ok(())
    }
}

impl Default for RunAnalytics {
    fn default() -> Self {
        Self::new()
    }
}
