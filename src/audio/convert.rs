//! Audio format normalization via ffmpeg.

use crate::error::{Result, SkrivError};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Converts a media file to normalized MP3 using ffmpeg.
///
/// The output is stereo MP3 at 44.1 kHz and 192 kbit/s; any video stream is
/// dropped and an existing destination is overwritten. Returns the destination
/// path on success.
///
/// A non-zero exit is reported as a [`SkrivError::Conversion`] with ffmpeg's
/// stderr; the caller is expected to remove any partial output and abort.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn convert_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3 at {:?}", source, dest);

    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-acodec").arg("libmp3lame")
        .arg("-ar").arg("44100")
        .arg("-ac").arg("2")
        .arg("-b:a").arg("192k")
        .arg("-f").arg("mp3")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(SkrivError::Conversion(format!(
                "ffmpeg exited with {}: {}",
                out.status,
                err.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SkrivError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(SkrivError::Conversion(format!("ffmpeg error: {e}"))),
    }
}
