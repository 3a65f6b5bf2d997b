//! Core data types for audioprint
//!
//! These types represent the domain model and flow through the pipeline.

use serde::{Deserialize, Serialize};

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats supported by audioprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Wav,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "flac" => Some(AudioFormat::Flac),
            "wav" => Some(AudioFormat::Wav),
            _ => None,
        }
    }

    /// Whether this format preserves exact original sample data
    pub fn is_lossless(self) -> bool {
        matches!(self, AudioFormat::Flac | AudioFormat::Wav)
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}

// =============================================================================
// Record metadata
// =============================================================================

/// Tag and technical metadata read from an audio container
///
/// Every field is individually optional: an untagged file is not an error.
#[derive(Debug, Clone, Default)]
pub struct TagData {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub genre: Option<String>,
    pub isrc: Option<String>,
    pub duration_in_ms: Option<u64>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<String>,
}

/// Per-file identity and metadata as it appears in the output document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub filename: String,
    /// 1-based position in enumeration order
    pub file_number: usize,
    pub file_size_in_mb: f64,
    pub lossless: bool,
    /// Hex-encoded content digest, the cache-lookup key; absent only when
    /// the file could not be read at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Pipeline build identifier, invalidates stale cache entries
    pub build_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_in_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<String>,
}

impl RecordMetadata {
    /// Build the identity portion of a record (always available once the
    /// file has been enumerated and hashed)
    pub fn new(
        filename: impl Into<String>,
        file_number: usize,
        size_bytes: u64,
        lossless: bool,
        sha256: Option<String>,
        build_id: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            file_number,
            file_size_in_mb: round2(size_bytes as f64 / (1024.0 * 1024.0)),
            lossless,
            sha256,
            build_id: build_id.into(),
            title: None,
            artist: None,
            album: None,
            year: None,
            genre: None,
            isrc: None,
            duration_in_ms: None,
            bitrate: None,
            sample_rate: None,
            channels: None,
        }
    }

    /// Merge tag and technical fields into the metadata
    pub fn with_tags(mut self, tags: TagData) -> Self {
        self.title = tags.title;
        self.artist = tags.artist;
        self.album = tags.album;
        self.year = tags.year;
        self.genre = tags.genre;
        self.isrc = tags.isrc;
        self.duration_in_ms = tags.duration_in_ms;
        self.bitrate = tags.bitrate;
        self.sample_rate = tags.sample_rate;
        self.channels = tags.channels;
        self
    }
}

/// Round to two decimal places for the `file_size_in_mb` field
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// =============================================================================
// Feature vectors
// =============================================================================

/// Numeric feature vectors for one file
///
/// `mfcc` is the required core of the fingerprint; the remaining features are
/// best-effort and omitted when the signal cannot support them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    pub mfcc: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectral_contrast: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chroma: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
}

// =============================================================================
// Feature record (the unit of output)
// =============================================================================

/// One file's complete output: metadata plus either features or an error.
///
/// Exactly one of `features`/`error` is present; the assembler enforces this
/// before serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub metadata: RecordMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FeatureRecord {
    pub fn success(metadata: RecordMetadata, features: FeatureSet) -> Self {
        Self {
            metadata,
            features: Some(features),
            error: None,
        }
    }

    pub fn failure(metadata: RecordMetadata, error: impl Into<String>) -> Self {
        Self {
            metadata,
            features: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.features.is_some()
    }
}

/// Outcome of one file's state machine, sent to the assembler
#[derive(Debug)]
pub struct FileReport {
    pub file_number: usize,
    pub record: FeatureRecord,
    pub cache_hit: bool,
}

// =============================================================================
// Audio buffer
// =============================================================================

/// Decoded audio samples ready for analysis
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
