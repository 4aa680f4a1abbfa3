use std::path::Path;

use anyhow::{Context, Result};
use crossbeam_channel::{Sender, bounded};
use indicatif::HumanCount;
use log::{debug, info};
use walkdir::WalkDir;

use crate::aggregator::{self, FileMap, ScanSummary};
use crate::hasher::{self, FileRecord, HashFailure};
use crate::pool::AdmissionGate;

/// Slack in the result channels so finished workers rarely wait on the
/// aggregator. Small on purpose: the aggregator, not the channels, is where
/// results are meant to accumulate.
const RESULT_BUFFER: usize = 256;

/// Walks `root` and spawns one hashing task per regular file.
///
/// Dispatch never blocks on the admission gate; the gate is acquired inside
/// each task, so the task queue grows with the file count while hashing
/// itself stays capped. Returns the number of files dispatched.
///
/// Any enumeration error aborts the scan. Errors opening or reading an
/// individual file do not; they come back through the failure channel.
pub fn dispatch_hash_tasks(
    root: &Path,
    gate: &AdmissionGate,
    records: &Sender<FileRecord>,
    failures: &Sender<HashFailure>,
) -> Result<u64> {
    let mut discovered = 0u64;

    for entry in WalkDir::new(root) {
        let entry =
            entry.with_context(|| format!("Failed to walk directory: '{}'", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        debug!("Dispatching hash task for '{}'", path.display());

        let gate = gate.clone();
        let records = records.clone();
        let failures = failures.clone();
        rayon::spawn(move || {
            // Hold the slot only while hashing. A send that has to wait for
            // the aggregator must not keep other workers out of the gate.
            let outcome = {
                let _slot = gate.acquire();
                hasher::hash_file(&path)
            };
            // Exactly one message per task. The send only fails if the
            // aggregator is already gone, and then there is nobody left to
            // tell.
            match outcome {
                Ok(record) => {
                    let _ = records.send(record);
                }
                Err(error) => {
                    let _ = failures.send(HashFailure { path, error });
                }
            }
        });
        discovered += 1;
    }

    Ok(discovered)
}

/// Full scan of `root`: dispatch every file, then drain results into the
/// digest-keyed map.
pub fn scan(root: &Path, gate: &AdmissionGate) -> Result<(FileMap, ScanSummary)> {
    info!("Scanning {}", root.display());

    let (records_tx, records_rx) = bounded(RESULT_BUFFER);
    let (failures_tx, failures_rx) = bounded(RESULT_BUFFER);

    let discovered = dispatch_hash_tasks(root, gate, &records_tx, &failures_tx)?;
    info!("Discovered {} files", HumanCount(discovered));

    // The dispatcher's clones close with these drops. Every in-flight task
    // still holds its own clones, so both channels disconnect exactly when
    // the last task finishes. That disconnect is the end-of-stream signal
    // the aggregator waits for.
    drop(records_tx);
    drop(failures_tx);

    Ok(aggregator::drain_results(
        records_rx,
        failures_rx,
        discovered,
        gate,
    ))
}
