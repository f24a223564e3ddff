//! Audio and media file handling.
//!
//! Extension-based media detection, the conversion gate, and the ffmpeg
//! invocations that do the actual work.

mod convert;
mod decode;

pub use convert::convert_to_mp3;
pub use decode::decode_samples;

use crate::error::{Result, SkrivError};
use async_trait::async_trait;
use std::path::Path;

/// Trait for audio format converters.
///
/// The production implementation shells out to ffmpeg; tests substitute
/// mocks to observe when conversion is (and is not) invoked.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `source` into normalized MP3 at `dest`, overwriting it.
    async fn convert(&self, source: &Path, dest: &Path) -> Result<()>;
}

/// Converter backed by the external ffmpeg binary.
pub struct FfmpegConverter;

#[async_trait]
impl Converter for FfmpegConverter {
    async fn convert(&self, source: &Path, dest: &Path) -> Result<()> {
        convert_to_mp3(source, dest).await
    }
}

/// Supported audio file extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "flac", "ogg"];

/// Supported video file extensions (audio will be extracted).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// The normalized audio container all inputs are converted to.
pub const TARGET_EXTENSION: &str = "mp3";

/// Lowercased extension of a path, if any.
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if path is a supported audio file.
pub fn is_audio_file(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if path is a supported video file.
pub fn is_video_file(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if path is a supported media file (audio or video).
pub fn is_media_file(path: &Path) -> bool {
    is_audio_file(path) || is_video_file(path)
}

/// Whether a file must be converted before transcription.
///
/// Only files already in the target container skip conversion.
pub fn needs_conversion(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| ext != TARGET_EXTENSION)
        .unwrap_or(true)
}

/// Validate that an input file exists and is a recognized media type.
pub fn validate_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SkrivError::MediaNotFound(path.display().to_string()));
    }
    if !is_media_file(path) {
        return Err(SkrivError::InvalidInput(format!(
            "Not a recognized audio or video file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Queries the duration of a media file in seconds using ffprobe.
///
/// Returns None when ffprobe can't determine it; the pipeline treats the
/// duration as informational only.
pub async fn probe_duration(path: &Path) -> Result<Option<f64>> {
    let result = tokio::process::Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SkrivError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(SkrivError::Conversion(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Ok(None);
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = match serde_json::from_str(&json_str) {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    Ok(parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("audio.mp3")));
        assert!(is_audio_file(Path::new("audio.WAV")));
        assert!(is_audio_file(Path::new("/path/to/audio.flac")));
        assert!(!is_audio_file(Path::new("video.mp4")));
        assert!(!is_audio_file(Path::new("document.pdf")));
    }

    #[test]
    fn test_is_media_file() {
        assert!(is_media_file(Path::new("video.mp4")));
        assert!(is_media_file(Path::new("clip.webm")));
        assert!(is_media_file(Path::new("audio.m4a")));
        assert!(!is_media_file(Path::new("document.pdf")));
        assert!(!is_media_file(Path::new("noextension")));
    }

    #[test]
    fn test_needs_conversion() {
        assert!(!needs_conversion(Path::new("audio.mp3")));
        assert!(!needs_conversion(Path::new("AUDIO.MP3")));
        assert!(needs_conversion(Path::new("audio.wav")));
        assert!(needs_conversion(Path::new("video.mp4")));
        assert!(needs_conversion(Path::new("noextension")));
    }

    #[test]
    fn test_validate_input_missing() {
        let err = validate_input(Path::new("/nonexistent/file.mp3")).unwrap_err();
        assert!(matches!(err, SkrivError::MediaNotFound(_)));
    }

    #[test]
    fn test_validate_input_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = validate_input(&path).unwrap_err();
        assert!(matches!(err, SkrivError::InvalidInput(_)));
    }
}
