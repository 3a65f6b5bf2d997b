//! Ordered result assembly and schema validation
//!
//! Collects per-file reports as workers finish, buffers them by file
//! number, and releases the document only when every enumerated file has
//! reached a terminal state. Output order is a correctness invariant, not
//! an artifact of arrival order under concurrency.

use crate::error::{AudioprintError, Result};
use crate::types::{FeatureRecord, FileReport};
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;
use tracing::debug;

/// Drain the report channel and assemble the ordered, validated document
///
/// Returns once the sending side closes. Violations of the output schema
/// are internal defects and fail the whole run; they cannot result from any
/// per-file input condition.
pub fn collect(reports: Receiver<FileReport>, expected: usize) -> Result<Vec<FeatureRecord>> {
    let mut by_number: BTreeMap<usize, FeatureRecord> = BTreeMap::new();

    for report in reports {
        debug!(
            "Collected record {} ({})",
            report.file_number,
            if report.record.is_success() { "ok" } else { "error" }
        );
        if by_number.insert(report.file_number, report.record).is_some() {
            return Err(AudioprintError::SchemaViolation(format!(
                "duplicate file number {}",
                report.file_number
            )));
        }
    }

    if by_number.len() != expected {
        return Err(AudioprintError::SchemaViolation(format!(
            "expected {} records, assembled {}",
            expected,
            by_number.len()
        )));
    }

    // With the length verified, contiguity 1..=N reduces to checking the ends
    let first = by_number.keys().next().copied().unwrap_or(0);
    let last = by_number.keys().next_back().copied().unwrap_or(0);
    if expected > 0 && (first != 1 || last != expected) {
        return Err(AudioprintError::SchemaViolation(format!(
            "file numbers must cover 1..={}, got {}..={}",
            expected, first, last
        )));
    }

    let records: Vec<FeatureRecord> = by_number.into_values().collect();
    for record in &records {
        validate_record(record)?;
    }

    Ok(records)
}

/// Enforce the per-record schema: required metadata plus exactly one of
/// `features` (with non-empty mfcc) or `error`
pub fn validate_record(record: &FeatureRecord) -> Result<()> {
    if record.metadata.filename.is_empty() {
        return Err(AudioprintError::SchemaViolation(format!(
            "record {} has no filename",
            record.metadata.file_number
        )));
    }

    match (&record.features, &record.error) {
        (Some(features), None) => {
            if features.mfcc.is_empty() {
                return Err(AudioprintError::SchemaViolation(format!(
                    "record {} has an empty mfcc vector",
                    record.metadata.file_number
                )));
            }
            if record.metadata.sha256.is_none() {
                return Err(AudioprintError::SchemaViolation(format!(
                    "successful record {} has no content digest",
                    record.metadata.file_number
                )));
            }
        }
        (None, Some(error)) => {
            if error.is_empty() {
                return Err(AudioprintError::SchemaViolation(format!(
                    "record {} has an empty error message",
                    record.metadata.file_number
                )));
            }
        }
        _ => {
            return Err(AudioprintError::SchemaViolation(format!(
                "record {} must have exactly one of features/error",
                record.metadata.file_number
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureSet, RecordMetadata};
    use crossbeam_channel::unbounded;

    fn report(file_number: usize) -> FileReport {
        FileReport {
            file_number,
            record: FeatureRecord::success(
                RecordMetadata::new(
                    format!("track{file_number}.mp3"),
                    file_number,
                    100,
                    false,
                    Some(format!("digest{file_number}")),
                    "v1",
                ),
                FeatureSet {
                    mfcc: vec![file_number as f32],
                    spectral_contrast: None,
                    chroma: None,
                    tempo: None,
                },
            ),
            cache_hit: false,
        }
    }

    #[test]
    fn records_are_ordered_regardless_of_arrival() {
        let (tx, rx) = unbounded();
        for n in [3, 1, 4, 2] {
            tx.send(report(n)).unwrap();
        }
        drop(tx);

        let records = collect(rx, 4).unwrap();
        let numbers: Vec<_> = records.iter().map(|r| r.metadata.file_number).collect();
        assert_eq!(numbers, [1, 2, 3, 4]);
    }

    #[test]
    fn missing_record_is_a_schema_violation() {
        let (tx, rx) = unbounded();
        tx.send(report(1)).unwrap();
        tx.send(report(3)).unwrap();
        drop(tx);

        let err = collect(rx, 3).unwrap_err();
        assert!(matches!(err, AudioprintError::SchemaViolation(_)));
    }

    #[test]
    fn gap_in_numbering_is_a_schema_violation() {
        let (tx, rx) = unbounded();
        tx.send(report(2)).unwrap();
        tx.send(report(3)).unwrap();
        drop(tx);

        let err = collect(rx, 2).unwrap_err();
        assert!(matches!(err, AudioprintError::SchemaViolation(_)));
    }

    #[test]
    fn empty_input_assembles_an_empty_document() {
        let (tx, rx) = unbounded::<FileReport>();
        drop(tx);
        assert!(collect(rx, 0).unwrap().is_empty());
    }

    #[test]
    fn error_records_pass_validation() {
        let meta = RecordMetadata::new("bad.flac", 1, 0, true, Some("d".into()), "v1");
        let record = FeatureRecord::failure(meta, "decode failed");
        assert!(validate_record(&record).is_ok());
    }

    #[test]
    fn record_with_both_features_and_error_is_rejected() {
        let meta = RecordMetadata::new("a.mp3", 1, 0, false, Some("d".into()), "v1");
        let mut record = FeatureRecord::success(
            meta,
            FeatureSet {
                mfcc: vec![1.0],
                spectral_contrast: None,
                chroma: None,
                tempo: None,
            },
        );
        record.error = Some("also an error".into());
        assert!(validate_record(&record).is_err());
    }

    #[test]
    fn empty_mfcc_is_rejected() {
        let meta = RecordMetadata::new("a.mp3", 1, 0, false, Some("d".into()), "v1");
        let record = FeatureRecord::success(
            meta,
            FeatureSet {
                mfcc: vec![],
                spectral_contrast: None,
                chroma: None,
                tempo: None,
            },
        );
        assert!(validate_record(&record).is_err());
    }

    #[test]
    fn successful_record_without_digest_is_rejected() {
        let meta = RecordMetadata::new("a.mp3", 1, 0, false, None, "v1");
        let record = FeatureRecord::success(
            meta,
            FeatureSet {
                mfcc: vec![1.0],
                spectral_contrast: None,
                chroma: None,
                tempo: None,
            },
        );
        assert!(validate_record(&record).is_err());
    }
}
