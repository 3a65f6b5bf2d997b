//! Metadata extraction from audio file tags
//!
//! Uses lofty to read ID3v2 (MP3), Vorbis comments (FLAC), and RIFF INFO
//! (WAV) tags plus the container's technical properties.

use crate::error::{AudioprintError, Result};
use crate::types::TagData;
use lofty::{Accessor, AudioFile, ItemKey, Probe, TaggedFileExt};
use std::path::Path;
use tracing::debug;

/// Extract tag and technical metadata from an audio file
///
/// Absence of any individual tag is not an error, only a missing field. A
/// read failure on the container itself (corrupt file) is a file-level
/// error; the caller still has identity metadata (filename, size, digest)
/// for the failure record.
pub fn read_tags(path: &Path) -> Result<TagData> {
    let tagged_file = Probe::open(path)
        .and_then(|probe| probe.read())
        .map_err(|e| AudioprintError::TagError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let properties = tagged_file.properties();
    let mut data = TagData {
        duration_in_ms: Some(properties.duration().as_millis() as u64),
        bitrate: properties.audio_bitrate(),
        sample_rate: properties.sample_rate(),
        channels: properties.channels().map(channel_layout),
        ..TagData::default()
    };

    match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => {
            data.title = tag.title().map(|s| s.to_string());
            data.artist = tag.artist().map(|s| s.to_string());
            data.album = tag.album().map(|s| s.to_string());
            data.year = tag.year();
            data.genre = tag.genre().map(|s| s.to_string());
            data.isrc = tag.get_string(&ItemKey::Isrc).map(|s| s.to_string());
        }
        None => {
            debug!("No tags found in {}", path.display());
        }
    }

    Ok(data)
}

fn channel_layout(channels: u8) -> String {
    match channels {
        1 => "Mono".to_string(),
        2 => "Stereo".to_string(),
        n => format!("{} channels", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_layout_names() {
        assert_eq!(channel_layout(1), "Mono");
        assert_eq!(channel_layout(2), "Stereo");
        assert_eq!(channel_layout(6), "6 channels");
    }

    #[test]
    fn unreadable_container_is_a_tag_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, b"not an mp3 container").unwrap();

        let err = read_tags(&path).unwrap_err();
        assert!(matches!(err, AudioprintError::TagError { .. }));
        assert!(err.is_recoverable());
    }
}
