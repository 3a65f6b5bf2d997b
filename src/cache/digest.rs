//! Content digests used as cache key material
//!
//! SHA-256 over the full file content, streamed in 1 MiB chunks so peak
//! memory stays bounded for large lossless files.

use crate::error::{AudioprintError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Hex-encoded content digest plus the byte size observed while hashing
#[derive(Debug, Clone)]
pub struct ContentDigest {
    pub hex: String,
    pub size_bytes: u64,
}

/// Compute the SHA-256 digest of a file's full byte content
///
/// Identical bytes always yield identical digests; any read failure is a
/// file-level error, not a fatal pipeline abort.
pub fn content_digest(path: &Path) -> Result<ContentDigest> {
    let mut file = File::open(path).map_err(|e| AudioprintError::read_error(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1024 * 1024];
    let mut size_bytes = 0u64;

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| AudioprintError::read_error(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size_bytes += bytes_read as u64;
    }

    Ok(ContentDigest {
        hex: format!("{:x}", hasher.finalize()),
        size_bytes,
    })
}
