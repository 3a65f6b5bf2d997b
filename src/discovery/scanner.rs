//! File discovery and scanning
//!
//! Produces the numbered candidate list the rest of the pipeline operates
//! on. Numbering follows lexicographic full-path order so re-runs over an
//! unchanged directory reproduce identical numbering.

use crate::error::{AudioprintError, Result};
use crate::types::AudioFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Discovered audio file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// 1-based position in enumeration order
    pub file_number: usize,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

/// Scan a path (file or directory) for audio files
///
/// A single supported file yields one candidate numbered 1. A directory is
/// walked recursively; unsupported files are silently excluded. An empty
/// result is valid, not an error.
pub fn scan(input: &Path) -> Result<Vec<DiscoveredFile>> {
    if !input.exists() {
        return Err(AudioprintError::FileNotFound(input.to_path_buf()));
    }

    let mut candidates = Vec::new();

    if input.is_file() {
        // Single file mode
        match try_discover_file(input) {
            Some(candidate) => candidates.push(candidate),
            None => {
                return Err(AudioprintError::UnsupportedFormat {
                    path: input.to_path_buf(),
                    format: input
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or("unknown")
                        .to_string(),
                });
            }
        }
    } else if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() {
                if let Some(candidate) = try_discover_file(path) {
                    debug!("Discovered: {}", candidate.path.display());
                    candidates.push(candidate);
                }
            }
        }
        // Deterministic numbering: lexicographic full-path order
        candidates.sort_by(|a, b| a.path.cmp(&b.path));
    }

    for (index, candidate) in candidates.iter_mut().enumerate() {
        candidate.file_number = index + 1;
    }

    info!("Discovered {} audio files", candidates.len());

    if candidates.is_empty() {
        warn!("No supported audio files found in {}", input.display());
    }

    Ok(candidates)
}

/// Try to create a DiscoveredFile if the path is a supported audio format
fn try_discover_file(path: &Path) -> Option<DiscoveredFile> {
    let ext = path.extension()?.to_str()?;
    let format = AudioFormat::from_extension(ext)?;

    let metadata = std::fs::metadata(path).ok()?;
    let size_bytes = metadata.len();

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        file_number: 0, // assigned after sorting
        format,
        size_bytes,
    })
}
