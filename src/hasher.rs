use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

/// One successfully hashed file.
///
/// Produced exactly once by a hashing task, then owned by the aggregator.
/// The digest is the file's identity for grouping: equal digests are treated
/// as byte-identical content.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// BLAKE3 content digest, lowercase hex (64 chars).
    pub digest: String,
    pub size: u64,
}

/// A hashing attempt that could not produce a record.
#[derive(Debug)]
pub struct HashFailure {
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Streams the file through BLAKE3 and returns its record.
///
/// The size is the number of bytes actually streamed, so it always matches
/// the hashed content. The handle is closed on every exit path.
pub fn hash_file(path: &Path) -> Result<FileRecord> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("Failed to open file: '{}'", path.display()))?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read file: '{}'", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(FileRecord {
        path: path.to_path_buf(),
        digest: hasher.finalize().to_hex().to_string(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hashes_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello dupesweep").unwrap();

        let record = hash_file(&path).unwrap();
        assert_eq!(record.path, path);
        assert_eq!(record.size, 15);
        assert_eq!(
            record.digest,
            blake3::hash(b"hello dupesweep").to_hex().to_string()
        );
    }

    #[test]
    fn identical_content_same_digest_different_content_differs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();
        fs::write(&c, b"other bytes").unwrap();

        let ra = hash_file(&a).unwrap();
        let rb = hash_file(&b).unwrap();
        let rc = hash_file(&c).unwrap();
        assert_eq!(ra.digest, rb.digest);
        assert_ne!(ra.digest, rc.digest);
    }

    #[test]
    fn streams_past_a_single_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let mut file = fs::File::create(&path).unwrap();
        let chunk = [0xabu8; 8192];
        for _ in 0..3 {
            file.write_all(&chunk).unwrap();
        }
        file.write_all(&[0xcd]).unwrap();
        drop(file);

        let record = hash_file(&path).unwrap();
        assert_eq!(record.size, 3 * 8192 + 1);

        let mut reference = blake3::Hasher::new();
        for _ in 0..3 {
            reference.update(&chunk);
        }
        reference.update(&[0xcd]);
        assert_eq!(record.digest, reference.finalize().to_hex().to_string());
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = hash_file(Path::new("/no/such/file-dupesweep")).unwrap_err();
        assert!(err.to_string().contains("/no/such/file-dupesweep"));
    }

    #[test]
    fn empty_file_hashes_to_empty_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let record = hash_file(&path).unwrap();
        assert_eq!(record.size, 0);
        assert_eq!(record.digest, blake3::hash(b"").to_hex().to_string());
    }
}
