pub mod actions;
pub mod aggregator;
pub mod cli;
pub mod duplicates;
pub mod hasher;
pub mod pool;
pub mod scanner;
pub mod utils;

pub use aggregator::{FileMap, ScanSummary};
pub use cli::Cli;
pub use hasher::{FileRecord, HashFailure, hash_file};
pub use pool::{AdmissionGate, SlotPermit};
pub use scanner::scan;
pub use utils::{format_size, normalize_path};
