//! Core ingest pipeline.
//!
//! Streams CSV rows in a single pass, validates each one against the
//! duplicate tracker, and collects the accepted records for the save
//! phase. Rejected rows are logged at warn level and counted; they never
//! abort the run.

use crate::analytics::RunAnalytics;
use crate::dedup::AddressSet;
use crate::error::RejectionKind;
use crate::record::{GeoRecord, RawRecord};
use crate::saver::ParallelSaver;
use crate::store::RecordStore;
use csv::ReaderBuilder;
use log::{debug, warn};
use std::io::Read;
use std::time::Instant;

/// The CSV ingest pipeline.
///
/// Holds the duplicate tracker, the accepted batch, and the run counters.
/// Rows are processed strictly in input order; the first occurrence of an
/// address wins and later copies are rejected.
pub struct IngestPipeline {
    /// Addresses seen so far, including ones on rows rejected later.
    seen: AddressSet,

    /// Records that passed every validation step, in input order.
    accepted: Vec<GeoRecord>,

    /// Run counters, updated as each row is decided.
    analytics: RunAnalytics,
}

impl IngestPipeline {
    /// Creates a new empty pipeline.
    pub fn new() -> Self {
        IngestPipeline {
            seen: AddressSet::new(),
            accepted: Vec::new(),
            analytics: RunAnalytics::new(),
        }
    }

    /// Processes rows from a CSV reader in streaming fashion.
    ///
    /// Records are read one at a time to keep memory proportional to the
    /// accepted batch. Malformed rows are logged at warn level, counted,
    /// and skipped. A hard I/O failure mid-stream counts one more bad row
    /// and ends the pass; everything read before it still stands.
    pub fn process_csv<R: Read>(&mut self, reader: R) {
        let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);

        for (row_idx, result) in csv_reader.records().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row
            self.analytics.record_row();

            match result {
                Ok(record) => match RawRecord::from_csv(&record) {
                    Some(raw) => match raw.validate(&mut self.seen) {
                        Ok(geo) if geo.has_sufficient_data() => {
                            debug!("Row {}: accepted record for {}", row_num, geo.address);
                            self.analytics.record_accepted();
                            self.accepted.push(geo);
                        }
                        Ok(_) => {
                            warn!("Row {}: {}", row_num, RejectionKind::InsufficientData);
                            self.analytics
                                .record_rejection(RejectionKind::InsufficientData);
                        }
                        Err(kind) => {
                            warn!("Row {}: {}", row_num, kind);
                            self.analytics.record_rejection(kind);
                        }
                    },
                    None => {
                        warn!("Row {}: too few fields", row_num);
                        self.analytics.record_rejection(RejectionKind::InvalidRow);
                    }
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    self.analytics.record_rejection(RejectionKind::InvalidRow);
                    if e.is_io_error() {
                        break;
                    }
                }
            }
        }
    }

    /// Records accepted so far, in input order.
    pub fn accepted_records(&self) -> &[GeoRecord] {
        &self.accepted
    }

    /// Run counters accumulated so far.
    pub fn analytics(&self) -> &RunAnalytics {
        &self.analytics
    }

    /// Consumes the pipeline, yielding the accepted batch and counters.
    pub fn into_parts(self) -> (Vec<GeoRecord>, RunAnalytics) {
        (self.accepted, self.analytics)
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a complete import: one ingest pass, the concurrent save phase, and
/// the final accounting fold.
///
/// The elapsed time covers everything from the first row read to the last
/// worker join. Save failures demote their records from accepted to
/// rejected, so the returned counters always balance.
pub fn run_import<R: Read, S: RecordStore>(reader: R, store: &S, workers: usize) -> RunAnalytics {
    let started = Instant::now();

    let mut pipeline = IngestPipeline::new();
    pipeline.process_csv(reader);
    let (records, mut analytics) = pipeline.into_parts();

    let failures = ParallelSaver::new(workers).save_all(&records, store);
    analytics.record_save_failures(failures);
    analytics.set_elapsed(started.elapsed());

    debug!(
        "Import finished: {} rows, {} accepted, {} rejected",
        analytics.total_rows(),
        analytics.accepted(),
        analytics.rejected()
    );
    analytics
}
