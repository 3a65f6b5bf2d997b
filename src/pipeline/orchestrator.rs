//! Pipeline orchestration
//!
//! Coordinates file discovery, the per-file state machine
//! (hash → cache lookup → extract → cache write), parallel execution, and
//! ordered result assembly. Workers never share mutable state; completed
//! records flow over a channel to a collector thread which hands the
//! ordered, validated document to the exporter.

use crate::analysis::{self, FeatureExtractor, SpectralExtractor};
use crate::audio;
use crate::cache::{self, ResultCache};
use crate::config::Settings;
use crate::discovery::{self, DiscoveredFile};
use crate::error::{AudioprintError, Result};
use crate::export;
use crate::types::{FeatureRecord, FileReport, RecordMetadata};
use crossbeam_channel::unbounded;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineSummary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub cache_hits: usize,
}

/// Run the full extraction pipeline
pub fn run(settings: &Settings) -> Result<PipelineSummary> {
    use std::time::Instant;

    let pipeline_start = Instant::now();

    configure_thread_pool(settings.threads)?;

    // Phase 1: Discovery
    info!("Scanning for audio files...");
    let files = discovery::scan(&settings.input)?;

    if files.is_empty() {
        // Empty input is a valid outcome: the document is an empty array
        export::write_output(&[], settings.output.as_deref())?;
        return Ok(PipelineSummary {
            total_files: 0,
            successful: 0,
            failed: 0,
            cache_hits: 0,
        });
    }

    info!("Processing {} files", files.len());

    let cache = ResultCache::from_settings(settings)?;
    let extractor: Arc<dyn FeatureExtractor> = Arc::new(SpectralExtractor::new());

    // Phase 2: Parallel extraction, assembled in file-number order
    let extraction_start = Instant::now();
    let (records, summary) = process_files(&files, &cache, extractor, settings)?;
    let extraction_elapsed = extraction_start.elapsed();
    info!(
        "Extraction completed in {:.2}s ({:.1} files/sec)",
        extraction_elapsed.as_secs_f64(),
        files.len() as f64 / extraction_elapsed.as_secs_f64().max(1e-9)
    );

    // Phase 3: Export
    export::write_output(&records, settings.output.as_deref())?;

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(summary)
}

/// Configure the Rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // If the pool is already initialized (e.g., in tests), that's OK
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(AudioprintError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}

/// Process files in parallel and assemble records in file-number order
fn process_files(
    files: &[DiscoveredFile],
    cache: &ResultCache,
    extractor: Arc<dyn FeatureExtractor>,
    settings: &Settings,
) -> Result<(Vec<FeatureRecord>, PipelineSummary)> {
    // Progress tracking
    let progress_bar = if settings.show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    // Counters
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let cache_hits = AtomicUsize::new(0);

    // Completed records stream to the collector as workers finish; the
    // channel is unbounded so no worker ever blocks on a slow consumer.
    let (report_tx, report_rx) = unbounded::<FileReport>();

    let expected = files.len();
    let collector = thread::spawn(move || export::assembler::collect(report_rx, expected));

    files.par_iter().for_each(|file| {
        let report = process_file(file, cache, extractor.as_ref(), &settings.build_id);

        if report.record.is_success() {
            successful.fetch_add(1, Ordering::Relaxed);
        } else {
            failed.fetch_add(1, Ordering::Relaxed);
        }
        if report.cache_hit {
            cache_hits.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(ref pb) = progress_bar {
            pb.inc(1);
            pb.set_message(
                file.path
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string(),
            );
        }

        // Stream records to stdout in verbose mode when no file output is set
        if settings.verbose && settings.output.is_none() {
            if let Ok(json) = serde_json::to_string_pretty(&report.record) {
                println!("{}", json);
            }
        }

        if report_tx.send(report).is_err() {
            // Collector died; the error surfaces on join
            error!("Result collector stopped early");
        }
    });

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Extraction complete");
    }

    // Close the channel so the collector drains and finishes
    drop(report_tx);

    let records = collector
        .join()
        .map_err(|_| AudioprintError::SchemaViolation("result collector panicked".to_string()))??;

    let summary = PipelineSummary {
        total_files: files.len(),
        successful: successful.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        cache_hits: cache_hits.load(Ordering::Relaxed),
    };

    Ok((records, summary))
}

/// Drive one file through its state machine
///
/// Stages: hash → cache lookup → (hit: adopt) | (miss: tags → decode →
/// features → cache write). Every failure converts to an error record at
/// this boundary; nothing propagates across file boundaries.
fn process_file(
    file: &DiscoveredFile,
    cache: &ResultCache,
    extractor: &dyn FeatureExtractor,
    build_id: &str,
) -> FileReport {
    debug!("Processing: {}", file.path.display());

    let filename = file
        .path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let lossless = file.format.is_lossless();

    // Hashing
    let digest = match cache::content_digest(&file.path) {
        Ok(digest) => digest,
        Err(e) => {
            warn!("Failed {}: {}", file.path.display(), e);
            let metadata = RecordMetadata::new(
                filename,
                file.file_number,
                file.size_bytes,
                lossless,
                None,
                build_id,
            );
            return FileReport {
                file_number: file.file_number,
                record: FeatureRecord::failure(metadata, e.to_string()),
                cache_hit: false,
            };
        }
    };

    // Cache lookup: a hit adopts the cached record, refreshed with this
    // run's identity, and skips tag reading and feature extraction entirely
    if let Some(mut record) = cache.lookup(&digest.hex, build_id) {
        debug!("Cache hit for {}", file.path.display());
        record.metadata.file_number = file.file_number;
        record.metadata.filename = filename;
        return FileReport {
            file_number: file.file_number,
            record,
            cache_hit: true,
        };
    }

    let base = RecordMetadata::new(
        filename,
        file.file_number,
        digest.size_bytes,
        lossless,
        Some(digest.hex.clone()),
        build_id,
    );

    // Extracting: container tags and technical properties first
    let metadata = match analysis::metadata::read_tags(&file.path) {
        Ok(tags) => base.with_tags(tags),
        Err(e) => {
            warn!("Failed {}: {}", file.path.display(), e);
            return FileReport {
                file_number: file.file_number,
                record: FeatureRecord::failure(base, e.to_string()),
                cache_hit: false,
            };
        }
    };

    // Decode and run the feature backend
    let buffer = match audio::decode(&file.path) {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!("Failed {}: {}", file.path.display(), e);
            return FileReport {
                file_number: file.file_number,
                record: FeatureRecord::failure(metadata, e.to_string()),
                cache_hit: false,
            };
        }
    };

    let features = match extractor.extract(&buffer) {
        Ok(features) => features,
        Err(e) => {
            // Add file context to extractor errors
            let e = match e {
                AudioprintError::FeatureError { reason, .. } => AudioprintError::FeatureError {
                    path: file.path.clone(),
                    reason,
                },
                other => other,
            };
            warn!("Failed {}: {}", file.path.display(), e);
            return FileReport {
                file_number: file.file_number,
                record: FeatureRecord::failure(metadata, e.to_string()),
                cache_hit: false,
            };
        }
    };

    let record = FeatureRecord::success(metadata, features);

    // Cache write: failures are logged inside the facade and never fail the
    // file; the computed record is returned regardless
    cache.insert(&digest.hex, build_id, &record);

    FileReport {
        file_number: file.file_number,
        record,
        cache_hit: false,
    }
}
