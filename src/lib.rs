//! audioprint - Batch Acoustic Fingerprint & Metadata Extraction
//!
//! A command-line utility that converts a directory of audio files into
//! machine-readable feature vectors: MFCC, spectral contrast, chroma, and
//! tempo, alongside tag and provenance metadata. Content-addressed caching
//! makes re-runs over an unchanged library pay only hashing cost.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: File scanning and deterministic numbering
//! - `cache`: Content digests and the (digest, build id) result cache
//! - `audio`: Audio decoding using symphonia
//! - `analysis`: Tag reading and spectral feature extraction (with a
//!   swappable backend)
//! - `pipeline`: Parallel processing orchestration
//! - `export`: Ordered assembly, validation, and JSON output
//!
//! # Example
//!
//! ```no_run
//! use audioprint::{config::Settings, pipeline};
//!
//! let settings = Settings {
//!     input: "/music".into(),
//!     ..Settings::default()
//! };
//! let summary = pipeline::run(&settings).expect("Extraction failed");
//! println!("Processed {} files", summary.total_files);
//! ```

pub mod analysis;
pub mod audio;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod types;

// Re-export key types at crate root
pub use error::{AudioprintError, Result};
pub use types::{AudioBuffer, FeatureRecord, FeatureSet, RecordMetadata};
