use std::collections::HashMap;

use crossbeam_channel::{Receiver, never, select};
use indicatif::{ProgressBar, ProgressStyle};
use log::error;

use crate::hasher::{FileRecord, HashFailure};
use crate::pool::AdmissionGate;
use crate::utils::format_size;

/// All hashed files, keyed by digest. Member order within a group is arrival
/// order: index 0 is whichever copy finished hashing first, and the action
/// handlers treat it as the original.
pub type FileMap = HashMap<String, Vec<FileRecord>>;

/// Running totals kept by the aggregator. Progress reporting, not
/// correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub discovered: u64,
    pub hashed: u64,
    pub failed: u64,
    pub total_bytes: u64,
}

/// Drains both result channels into the digest-keyed map.
///
/// The two channels close independently and in no particular order, so this
/// selects over both and keeps draining whichever is still open after the
/// other disconnects; a disconnected receiver is swapped for [`never`] so the
/// select stops polling it. Returns only once both channels are closed,
/// which, given how the senders are owned, means every dispatched task has
/// delivered its one message.
///
/// This is the only writer of the map, so the grouping needs no locking.
pub fn drain_results(
    records: Receiver<FileRecord>,
    failures: Receiver<HashFailure>,
    discovered: u64,
    gate: &AdmissionGate,
) -> (FileMap, ScanSummary) {
    let mut file_map: FileMap = HashMap::new();
    let mut summary = ScanSummary {
        discovered,
        ..Default::default()
    };

    let pb = ProgressBar::new(discovered);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg} ETA: {eta}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut records = records;
    let mut failures = failures;
    let mut records_open = true;
    let mut failures_open = true;

    while records_open || failures_open {
        select! {
            recv(records) -> msg => match msg {
                Ok(record) => {
                    summary.hashed += 1;
                    summary.total_bytes += record.size;
                    file_map.entry(record.digest.clone()).or_default().push(record);
                    update_progress(&pb, &summary, gate);
                }
                Err(_) => {
                    // A closed stream is the expected terminal signal, not an
                    // error. Stop polling it and keep draining the other.
                    records_open = false;
                    records = never();
                }
            },
            recv(failures) -> msg => match msg {
                Ok(failure) => {
                    summary.failed += 1;
                    pb.suspend(|| {
                        error!(
                            "Failed to process '{}': {:#}",
                            failure.path.display(),
                            failure.error
                        );
                    });
                    update_progress(&pb, &summary, gate);
                }
                Err(_) => {
                    failures_open = false;
                    failures = never();
                }
            },
        }
    }

    pb.finish_and_clear();
    (file_map, summary)
}

fn update_progress(pb: &ProgressBar, summary: &ScanSummary, gate: &AdmissionGate) {
    pb.set_position(summary.hashed + summary.failed);
    pb.set_message(format!(
        "Files scanned: {}/{} | Total size: {} | Workers: {}/{}",
        summary.hashed + summary.failed,
        summary.discovered,
        format_size(summary.total_bytes),
        gate.in_flight(),
        gate.capacity(),
    ));
}
