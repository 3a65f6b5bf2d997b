//! JSON serialization of the output document
//!
//! The document is a JSON array with one element per candidate file, in
//! ascending file-number order.

use crate::error::{AudioprintError, Result};
use crate::types::FeatureRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Serialize the assembled document to a file or stdout
pub fn write_output(records: &[FeatureRecord], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => write_json(records, path),
        None => {
            let rendered = render(records)?;
            println!("{}", rendered);
            Ok(())
        }
    }
}

/// Render the document as pretty-printed JSON
pub fn render(records: &[FeatureRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(|e| AudioprintError::OutputError {
        path: "<stdout>".into(),
        reason: e.to_string(),
    })
}

/// Write the document to a file
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
/// This prevents data corruption if the write is interrupted.
pub fn write_json(records: &[FeatureRecord], output_path: &Path) -> Result<()> {
    // Write to temp file in same directory (ensures same filesystem for atomic rename)
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| AudioprintError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| {
            // Clean up temp file on error
            let _ = std::fs::remove_file(&temp_path);
            AudioprintError::OutputError {
                path: output_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

    writer.flush().map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        AudioprintError::output_error(output_path, e)
    })?;

    // Atomic rename: either succeeds completely or fails without modifying target
    std::fs::rename(&temp_path, output_path).map_err(|e| {
        // Clean up temp file on error
        let _ = std::fs::remove_file(&temp_path);
        AudioprintError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!(
        "Wrote {} records to {}",
        records.len(),
        output_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureSet, RecordMetadata};
    use tempfile::TempDir;

    fn records() -> Vec<FeatureRecord> {
        vec![
            FeatureRecord::success(
                RecordMetadata::new("a.mp3", 1, 100, false, Some("d1".into()), "v1"),
                FeatureSet {
                    mfcc: vec![1.0, 2.0],
                    spectral_contrast: None,
                    chroma: None,
                    tempo: Some(128.0),
                },
            ),
            FeatureRecord::failure(
                RecordMetadata::new("b.flac", 2, 0, true, Some("d2".into()), "v1"),
                "decode failed",
            ),
        ]
    }

    #[test]
    fn document_is_a_json_array_in_order() {
        let rendered = render(&records()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        let array = parsed.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["metadata"]["file_number"], 1);
        assert_eq!(array[1]["metadata"]["file_number"], 2);
        assert_eq!(array[0]["features"]["mfcc"][0], 1.0);
        assert!(array[1].get("features").is_none());
        assert_eq!(array[1]["error"], "decode failed");
    }

    #[test]
    fn empty_document_renders_as_empty_array() {
        let rendered = render(&[]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, serde_json::json!([]));
    }

    #[test]
    fn write_json_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("features.json");

        write_json(&records(), &out).unwrap();

        assert!(out.exists());
        assert!(!dir.path().join("features.json.tmp").exists());

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
    }
}
