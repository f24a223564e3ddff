//! Decoding media files into raw samples for inference.
//!
//! whisper.cpp consumes 16 kHz mono f32 PCM, so any input is first decoded
//! through ffmpeg into a temporary WAV, then read with hound.

use crate::error::{Result, SkrivError};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Sample rate expected by the model.
pub const MODEL_SAMPLE_RATE: u32 = 16_000;

/// Decode a media file into 16 kHz mono f32 samples.
pub async fn decode_samples(source: &Path) -> Result<Vec<f32>> {
    let wav = tempfile::Builder::new()
        .prefix("skriv-decode-")
        .suffix(".wav")
        .tempfile()?;

    decode_to_wav(source, wav.path()).await?;
    let samples = read_wav_samples(wav.path())?;

    debug!(
        "Decoded {} samples ({:.1}s) from {:?}",
        samples.len(),
        samples.len() as f64 / MODEL_SAMPLE_RATE as f64,
        source
    );

    Ok(samples)
}

/// Decode `source` to a 16 kHz mono signed-16-bit WAV at `dest`.
async fn decode_to_wav(source: &Path, dest: &Path) -> Result<()> {
    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-ar").arg(MODEL_SAMPLE_RATE.to_string())
        .arg("-ac").arg("1")
        .arg("-c:a").arg("pcm_s16le")
        .arg("-f").arg("wav")
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
            Err(SkrivError::Transcription(format!(
                "audio decode failed: {}",
                err.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SkrivError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(SkrivError::Transcription(format!("ffmpeg error: {e}"))),
    }
}

/// Read a 16 kHz mono i16 WAV file and scale samples to f32 in [-1, 1].
fn read_wav_samples(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.channels != 1 || spec.sample_rate != MODEL_SAMPLE_RATE {
        return Err(SkrivError::Transcription(format!(
            "unexpected decoded format: {} channel(s) at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let samples: std::result::Result<Vec<f32>, _> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
        .collect();

    Ok(samples?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_read_wav_samples_scales_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        write_test_wav(&path, MODEL_SAMPLE_RATE, 1, &[0, i16::MAX, i16::MIN + 1]);

        let samples = read_wav_samples(&path).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 1.0).abs() < 1e-6);
        assert!((samples[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_read_wav_samples_rejects_wrong_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        write_test_wav(&path, 44_100, 1, &[0; 16]);

        let err = read_wav_samples(&path).unwrap_err();
        assert!(matches!(err, SkrivError::Transcription(_)));
    }

    #[test]
    fn test_read_wav_samples_rejects_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        write_test_wav(&path, MODEL_SAMPLE_RATE, 2, &[0; 16]);

        let err = read_wav_samples(&path).unwrap_err();
        assert!(matches!(err, SkrivError::Transcription(_)));
    }
}
