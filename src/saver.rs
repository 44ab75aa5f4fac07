//! Concurrent persistence of accepted records.
//!
//! The batch is split into contiguous chunks, one scoped worker thread per
//! chunk. Workers never abort on a bad record; each one counts its own
//! failures and the counts are summed after the join, so the caller sees a
//! single failure total for the batch.

use crate::record::GeoRecord;
use crate::store::RecordStore;
use log::{debug, warn};
use std::ops::Range;
use std::thread;

/// Splits `total` items into at most `workers` contiguous index ranges.
///
/// Never produces an empty range: the worker count is clamped to `total`
/// (and floored at one), each range gets `total / workers` items, and the
/// last range absorbs the division remainder. An empty batch yields no
/// ranges at all.
pub fn partition(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }

    let workers = workers.min(total).max(1);
    let chunk = total / workers;
    let mut ranges = Vec::with_capacity(workers);
    for i in 0..workers {
        let start = i * chunk;
        let end = if i == workers - 1 { total } else { start + chunk };
        ranges.push(start..end);
    }
    ranges
}

/// Persists record batches through a shared store with a bounded pool of
/// scoped worker threads.
pub struct ParallelSaver {
    workers: usize,
}

impl ParallelSaver {
    /// Creates a saver that uses at most `workers` threads per batch.
    pub fn new(workers: usize) -> Self {
        ParallelSaver {
            workers: workers.max(1),
        }
    }

    /// Saves every record in the batch, blocking until all workers finish.
    ///
    /// Returns the number of records that could not be persisted. A worker
    /// that panics leaves its whole chunk unsaved, so that chunk is counted
    /// as failed rather than lost from the accounting.
    pub fn save_all<S: RecordStore>(&self, records: &[GeoRecord], store: &S) -> u64 {
        if records.is_empty() {
            return 0;
        }

        let ranges = partition(records.len(), self.workers);
        debug!(
            "Saving {} records across {} workers",
            records.len(),
            ranges.len()
        );

        thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .into_iter()
                .map(|range| {
                    let chunk = &records[range.clone()];
                    (range, scope.spawn(move || save_chunk(chunk, store)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(range, handle)| match handle.join() {
                    Ok(failures) => failures,
                    Err(_) => {
                        warn!(
                            "Save worker for records {}..{} panicked; chunk counted as failed",
                            range.start, range.end
                        );
                        range.len() as u64
                    }
                })
                .sum()
        })
    }
}

/// Saves one contiguous chunk, returning its failure count.
fn save_chunk<S: RecordStore>(records: &[GeoRecord], store: &S) -> u64 {
    let mut failures = 0;
    for record in records {
        let blob = match record.to_blob() {
            Ok(blob) => blob,
            Err(err) => {
                warn!("Failed to encode record for {}: {}", record.address, err);
                failures += 1;
                continue;
            }
        };

        if let Err(err) = store.set(&record.key(), &blob) {
            warn!("Failed to save record for {}: {}", record.address, err);
            failures += 1;
        }
    }
    failures
}
