//! Content digests for change detection.
//!
//! Resources are compared by the SHA-256 of their bytes. Two variants with
//! the same digest are treated as identical; no diff is ever computed.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// SHA-256 of a byte slice, as 64 lowercase hex characters.
#[must_use]
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of a file's contents, streamed.
///
/// # Errors
///
/// Returns [`Error::Backend`] if the file cannot be opened or read.
pub fn file_digest(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| Error::backend(path.display(), e.to_string()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = reader
            .read(&mut buf)
            .map_err(|e| Error::backend(path.display(), e.to_string()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_digest_deterministic() {
        let a = content_digest(b"hello");
        assert_eq!(a, content_digest(b"hello"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_digest(b"hello!"));
    }

    #[test]
    fn test_file_digest_matches_content_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"some content").unwrap();
        assert_eq!(file_digest(&path).unwrap(), content_digest(b"some content"));
    }

    #[test]
    fn test_file_digest_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_digest(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.error_code().as_str(), "BACKEND_ERROR");
    }
}
